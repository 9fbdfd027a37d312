//! # parttab Pipeline
//!
//! Probe orchestration: runs the three format decoders against one
//! [`ByteSource`] with a fixed precedence and fallback policy, and
//! aggregates everything recognized into a [`DiskReport`].
//!
//! Per image the pipeline moves through `Start -> MBRProbed ->
//! {GPTProbed, BSDProbed} -> Done`:
//!
//! - The MBR is always probed first; byte 0 of any MBR/GPT disk is a
//!   boot sector, so this is the one mandatory read.
//! - GPT is probed when the MBR carried a protective 0xEE entry, and
//!   defensively when the MBR was absent or malformed.
//! - BSD is probed at the device start unconditionally, plus at the
//!   start of every MBR slice with a BSD type byte.
//!
//! Soft negatives contribute nothing and raise nothing; a disk
//! recognized by none of the three formats yields an empty report.
//!
//! ## Example
//!
//! ```rust
//! use parttab_core::StreamSource;
//! use parttab_pipeline::FormatPipeline;
//! use std::io::Cursor;
//!
//! let mut source = StreamSource::new(Cursor::new(vec![0u8; 4096])).unwrap();
//! let report = FormatPipeline::new().inspect(&mut source, "blank.img").unwrap();
//! assert!(report.is_empty());
//! ```

use parttab_core::{ByteSource, Detection, DiskReport, Error, Result, TableKind, TableReport};
use parttab_tables::{bsd::Disklabel, gpt::Gpt, mbr::MbrTable};
use tracing::{debug, warn};

/// Default logical sector size in bytes
pub const DEFAULT_SECTOR_SIZE: u64 = 512;

/// Runs the format decoders against one source per inspection call
///
/// The pipeline holds no per-image state; one instance may serve any
/// number of images sequentially.
#[derive(Debug, Clone)]
pub struct FormatPipeline {
    sector_size: u64,
}

impl Default for FormatPipeline {
    fn default() -> Self {
        Self {
            sector_size: DEFAULT_SECTOR_SIZE,
        }
    }
}

impl FormatPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the logical sector size (4096 for native 4K devices)
    pub fn with_sector_size(sector_size: u64) -> Self {
        Self { sector_size }
    }

    /// Inspect one image and report every table recognized on it
    ///
    /// # Errors
    ///
    /// Fails only for whole-image conditions: an I/O error from the
    /// source, an image shorter than the mandatory 512-byte boot sector
    /// probe, or a zero sector size. Per-table problems never surface
    /// here.
    pub fn inspect(&self, source: &mut dyn ByteSource, name: &str) -> Result<DiskReport> {
        if self.sector_size == 0 {
            return Err(Error::structural("sector size must be non-zero"));
        }

        let mut report = DiskReport::new(name);

        // Offsets where an embedded disklabel may live; the device start
        // is always a candidate.
        let mut bsd_bases: Vec<u64> = vec![0];
        let mut probe_gpt = false;

        match MbrTable::decode(source)? {
            Detection::Recognized(mbr) => {
                probe_gpt = mbr.has_protective_gpt();
                for slice in mbr.bsd_slices() {
                    let base = slice.start_lba as u64 * self.sector_size;
                    if !bsd_bases.contains(&base) {
                        bsd_bases.push(base);
                    }
                }
                report.tables.push(TableReport {
                    kind: TableKind::Mbr,
                    descriptor: Some(mbr.serial_hex()),
                    records: mbr.records(),
                    warnings: Vec::new(),
                });
            }
            Detection::Absent => {
                debug!(image = name, "no MBR boot signature, probing GPT defensively");
                probe_gpt = true;
            }
            Detection::Malformed(reason) => {
                warn!(image = name, %reason, "malformed MBR dropped, probing GPT defensively");
                probe_gpt = true;
            }
        }

        if probe_gpt {
            match Gpt::decode(source, self.sector_size)? {
                Detection::Recognized(gpt) => {
                    report.tables.push(TableReport {
                        kind: TableKind::Gpt,
                        descriptor: Some(gpt.disk_guid_string()),
                        records: gpt.records(),
                        warnings: gpt.warnings,
                    });
                }
                Detection::Absent => debug!(image = name, "no GPT header"),
                Detection::Malformed(reason) => {
                    warn!(image = name, %reason, "malformed GPT dropped")
                }
            }
        }

        for base in bsd_bases {
            match Disklabel::decode(source, base, self.sector_size)? {
                Detection::Recognized(label) => {
                    report.tables.push(TableReport {
                        kind: TableKind::Bsd,
                        descriptor: None,
                        records: label.records(),
                        warnings: label.warnings,
                    });
                }
                Detection::Absent => debug!(image = name, base, "no BSD disklabel"),
                Detection::Malformed(reason) => {
                    warn!(image = name, base, %reason, "malformed BSD disklabel dropped")
                }
            }
        }

        Ok(report)
    }
}
