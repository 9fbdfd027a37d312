//! BSD DiskLabel decoder
//!
//! The label lives one sector into its container, which is either the
//! whole device or an MBR slice marked with a BSD type byte.
//!
//! # Structure
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic (0x82564557, little-endian)
//! 40      4     Sector size declared by the label
//! 132     4     Magic, second copy
//! 136     2     Label checksum (XOR of 16-bit words)
//! 138     2     Partition (slice) count
//! 148     16*n  Slice table
//! ```
//!
//! The checksum covers the header and the slice table with the checksum
//! field itself zeroed; a mismatch is a soft warning, matching the GPT
//! checksum policy.

pub mod types;

use parttab_core::{ByteSource, Detection, PartitionRecord, Result, TableKind, Warning};
use serde::{Deserialize, Serialize};

/// Label magic, "WEV\x82" on disk
pub const DISKLABEL_MAGIC: u32 = 0x8256_4557;

/// Fixed header size up to the slice table
pub const HEADER_SIZE: usize = 148;

/// Size of one slice descriptor
pub const SLICE_SIZE: usize = 16;

/// Historical maximum slice count (16 or 22 depending on the variant;
/// the larger bound is accepted)
pub const MAX_SLICES: u16 = 22;

/// One occupied disklabel slice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BsdSlice {
    /// 1-based slot position (slot 1 is traditionally partition "a")
    pub index: usize,
    pub fstype: u8,
    /// Start sector, absolute on the device per the format
    pub offset_sectors: u32,
    pub size_sectors: u32,
}

impl BsdSlice {
    /// Human string for the fstype byte
    pub fn type_name(&self) -> &'static str {
        types::fstype_name(self.fstype)
    }
}

/// A decoded BSD disklabel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Disklabel {
    /// Sector size declared by the label
    pub sector_size: u32,
    /// Declared slice count, including empty slots
    pub slice_count: u16,
    /// Occupied slices only, in slot order
    pub slices: Vec<BsdSlice>,
    pub warnings: Vec<Warning>,
}

impl Disklabel {
    /// Decode a disklabel from one sector past `base_offset`
    ///
    /// `base_offset` is 0 for a standalone label, or the byte offset of
    /// an MBR slice for an embedded one. A short image or missing magic
    /// is `Absent`; only an impossible slice count or a slice table
    /// running past the image is `Malformed`.
    pub fn decode(
        source: &mut dyn ByteSource,
        base_offset: u64,
        sector_size: u64,
    ) -> Result<Detection<Disklabel>> {
        let label_offset = base_offset + sector_size;
        let header = match source.read_at(label_offset, HEADER_SIZE) {
            Ok(bytes) => bytes,
            Err(e) if e.is_truncated() => return Ok(Detection::Absent),
            Err(e) => return Err(e),
        };

        let magic1 = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let magic2 = u32::from_le_bytes(header[132..136].try_into().unwrap());
        if magic1 != DISKLABEL_MAGIC || magic2 != DISKLABEL_MAGIC {
            return Ok(Detection::Absent);
        }

        let label_sector_size = u32::from_le_bytes(header[40..44].try_into().unwrap());
        let stored_checksum = u16::from_le_bytes([header[136], header[137]]);
        let slice_count = u16::from_le_bytes([header[138], header[139]]);

        if slice_count > MAX_SLICES {
            return Ok(Detection::Malformed(format!(
                "slice count {} exceeds disklabel maximum {}",
                slice_count, MAX_SLICES
            )));
        }

        let table = match source.read_at(
            label_offset + HEADER_SIZE as u64,
            slice_count as usize * SLICE_SIZE,
        ) {
            Ok(bytes) => bytes,
            Err(e) if e.is_truncated() => {
                return Ok(Detection::Malformed(
                    "slice table extends past end of image".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };

        let mut warnings = Vec::new();
        let computed = label_checksum(&header, &table);
        if computed != stored_checksum {
            warnings.push(Warning::LabelChecksumMismatch {
                stored: stored_checksum,
                computed,
            });
        }

        let mut slices = Vec::new();
        for (slot, chunk) in table.chunks_exact(SLICE_SIZE).enumerate() {
            let size_sectors = u32::from_le_bytes(chunk[0..4].try_into().unwrap());
            let offset_sectors = u32::from_le_bytes(chunk[4..8].try_into().unwrap());
            let fstype = chunk[12];

            // Empty slots carry type 0 or size 0
            if fstype == 0 || size_sectors == 0 {
                continue;
            }

            slices.push(BsdSlice {
                index: slot + 1,
                fstype,
                offset_sectors,
                size_sectors,
            });
        }

        Ok(Detection::Recognized(Disklabel {
            sector_size: label_sector_size,
            slice_count,
            slices,
            warnings,
        }))
    }

    /// Normalized records for the occupied slices
    pub fn records(&self) -> Vec<PartitionRecord> {
        self.slices
            .iter()
            .map(|slice| PartitionRecord {
                source: TableKind::Bsd,
                index: slice.index,
                type_descriptor: slice.type_name().to_string(),
                start: slice.offset_sectors as u64,
                size: slice.size_sectors as u64,
                note: format!("ID=0x{:02X}", slice.fstype),
            })
            .collect()
    }
}

/// 16-bit XOR checksum over header and slice table, with the checksum
/// field (header bytes 136..138) zeroed
fn label_checksum(header: &[u8], table: &[u8]) -> u16 {
    let words = header
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| if i == 68 { 0 } else { u16::from_le_bytes([pair[0], pair[1]]) })
        .chain(
            table
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
        );
    words.fold(0, |acc, word| acc ^ word)
}
