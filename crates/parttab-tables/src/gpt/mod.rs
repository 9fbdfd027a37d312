//! GPT (GUID Partition Table) decoder
//!
//! # Structure
//!
//! ```text
//! LBA 0:      Protective MBR
//! LBA 1:      Primary GPT header
//! LBA 2..:    Partition entry array (typically 128 * 128 bytes)
//! ...
//! Last LBA:   Backup GPT header
//! ```
//!
//! Checksum mismatches are soft: the header's other fields may still be
//! usable for forensic purposes, so decoding continues and the mismatch
//! is attached to the table as a warning. Only structurally impossible
//! declarations (entry size below 128, array past end of image) abort
//! this table's contribution.

pub mod types;

use parttab_core::{ByteSource, Detection, Error, PartitionRecord, Result, TableKind, Warning};
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::{GptEntry, GptHeader};

/// Sanity cap on the declared entry count (the UEFI default is 128)
const MAX_ENTRY_COUNT: u32 = 4096;

/// A decoded GUID Partition Table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gpt {
    pub header: GptHeader,
    /// Occupied entries only, in slot order
    pub entries: Vec<GptEntry>,
    pub warnings: Vec<Warning>,
}

impl Gpt {
    /// Decode the GPT from a source, primary header first
    ///
    /// When the primary header at LBA 1 is unreadable or carries a bad
    /// signature, the last sector of the image is tried as the backup
    /// header before giving up.
    ///
    /// # Errors
    ///
    /// `sector_size` must be non-zero; all LBA arithmetic depends on it.
    pub fn decode(source: &mut dyn ByteSource, sector_size: u64) -> Result<Detection<Gpt>> {
        if sector_size == 0 {
            return Err(Error::structural("sector size must be non-zero"));
        }

        let mut warnings = Vec::new();

        let (raw_header, header) = match read_header(source, sector_size, 1)? {
            Some(found) => found,
            None => {
                let total_sectors = source.size() / sector_size;
                if total_sectors < 2 {
                    return Ok(Detection::Absent);
                }
                let backup_lba = total_sectors - 1;
                match read_header(source, sector_size, backup_lba)? {
                    Some(found) => {
                        debug!(backup_lba, "primary GPT header unusable, using backup");
                        warnings.push(Warning::BackupHeaderUsed { lba: backup_lba });
                        found
                    }
                    None => return Ok(Detection::Absent),
                }
            }
        };

        // Structural sanity before trusting any declared size
        let revision_major = header.revision >> 16;
        if revision_major < 1 {
            return Ok(Detection::Malformed(format!(
                "bad GPT revision: 0x{:08X}",
                header.revision
            )));
        }
        if header.header_size < GptHeader::MIN_HEADER_SIZE
            || header.header_size as usize > raw_header.len()
        {
            return Ok(Detection::Malformed(format!(
                "bad GPT header size: {}",
                header.header_size
            )));
        }
        if header.partition_entry_size < GptEntry::MIN_ENTRY_SIZE as u32
            || header.partition_entry_size % 8 != 0
        {
            return Ok(Detection::Malformed(format!(
                "bad partition entry size: {}",
                header.partition_entry_size
            )));
        }
        if header.partition_entry_count > MAX_ENTRY_COUNT {
            return Ok(Detection::Malformed(format!(
                "partition entry count {} exceeds sanity cap {}",
                header.partition_entry_count, MAX_ENTRY_COUNT
            )));
        }

        let computed = header.compute_header_crc32(&raw_header);
        if computed != header.header_crc32 {
            warnings.push(Warning::HeaderChecksumMismatch {
                stored: header.header_crc32,
                computed,
            });
        }

        // Partition entry array
        let array_offset = match header.partition_entry_lba.checked_mul(sector_size) {
            Some(offset) => offset,
            None => {
                return Ok(Detection::Malformed(
                    "partition entry LBA overflows byte offset".to_string(),
                ))
            }
        };
        let array_len =
            header.partition_entry_count as usize * header.partition_entry_size as usize;
        let array = match source.read_at(array_offset, array_len) {
            Ok(bytes) => bytes,
            Err(e) if e.is_truncated() => {
                return Ok(Detection::Malformed(
                    "partition entry array extends past end of image".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };

        let computed = crc32fast::hash(&array);
        if computed != header.partition_array_crc32 {
            warnings.push(Warning::EntryArrayChecksumMismatch {
                stored: header.partition_array_crc32,
                computed,
            });
        }

        let entry_size = header.partition_entry_size as usize;
        let entries = array
            .chunks_exact(entry_size)
            .enumerate()
            .filter_map(|(slot, chunk)| GptEntry::from_bytes(slot + 1, chunk))
            .collect();

        Ok(Detection::Recognized(Gpt {
            header,
            entries,
            warnings,
        }))
    }

    /// Disk GUID rendered uppercase-hyphenated
    pub fn disk_guid_string(&self) -> String {
        types::guid_string(&self.header.disk_guid)
    }

    /// Normalized records for the occupied entries
    pub fn records(&self) -> Vec<PartitionRecord> {
        self.entries
            .iter()
            .map(|entry| {
                let mut notes = Vec::new();
                if !entry.name.is_empty() {
                    notes.push(entry.name.clone());
                }
                if entry.attributes != 0 {
                    notes.push(format!("flags=0x{:X}", entry.attributes));
                }
                PartitionRecord {
                    source: TableKind::Gpt,
                    index: entry.index,
                    type_descriptor: entry.type_name().to_string(),
                    start: entry.first_lba,
                    size: entry.size_in_sectors(),
                    note: notes.join(" "),
                }
            })
            .collect()
    }
}

/// Read one sector and try to parse it as a GPT header
///
/// `Ok(None)` covers both "sector unreadable because the image is too
/// short" and "signature mismatch"; real I/O failures propagate.
fn read_header(
    source: &mut dyn ByteSource,
    sector_size: u64,
    lba: u64,
) -> Result<Option<(Vec<u8>, GptHeader)>> {
    let bytes = match source.read_at(lba * sector_size, sector_size as usize) {
        Ok(bytes) => bytes,
        Err(e) if e.is_truncated() => return Ok(None),
        Err(e) => return Err(e),
    };
    Ok(GptHeader::from_bytes(&bytes).map(|header| (bytes, header)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parttab_core::StreamSource;
    use std::io::Cursor;
    use uuid::Uuid;

    const SECTOR: usize = 512;

    /// Append a valid primary GPT at LBA 1 of `disk`: header plus a
    /// 4-entry array at LBA 2 with one Linux filesystem entry, both
    /// checksums patched in.
    fn write_test_gpt(disk: &mut [u8]) {
        let h = SECTOR; // header at LBA 1

        disk[h..h + 8].copy_from_slice(b"EFI PART");
        disk[h + 8..h + 12].copy_from_slice(&0x00010000u32.to_le_bytes()); // revision 1.0
        disk[h + 12..h + 16].copy_from_slice(&92u32.to_le_bytes()); // header size
        disk[h + 24..h + 32].copy_from_slice(&1u64.to_le_bytes()); // current LBA
        disk[h + 32..h + 40].copy_from_slice(&20479u64.to_le_bytes()); // backup LBA
        disk[h + 40..h + 48].copy_from_slice(&34u64.to_le_bytes()); // first usable
        disk[h + 48..h + 56].copy_from_slice(&20445u64.to_le_bytes()); // last usable

        let disk_guid = Uuid::parse_str("A924656E-9A06-4F9E-82E2-CFEC246890F6").unwrap();
        disk[h + 56..h + 72].copy_from_slice(&disk_guid.to_bytes_le());

        disk[h + 72..h + 80].copy_from_slice(&2u64.to_le_bytes()); // entry array LBA
        disk[h + 80..h + 84].copy_from_slice(&4u32.to_le_bytes()); // entry count
        disk[h + 84..h + 88].copy_from_slice(&128u32.to_le_bytes()); // entry size

        // Entry 1: Linux filesystem data, LBA 2048..=20445, named "root"
        let e = 2 * SECTOR;
        let type_guid = Uuid::parse_str("0FC63DAF-8483-4772-8E79-3D69D8477DE4").unwrap();
        disk[e..e + 16].copy_from_slice(&type_guid.to_bytes_le());
        let unique = Uuid::parse_str("DEADBEEF-0000-4000-8000-000000000001").unwrap();
        disk[e + 16..e + 32].copy_from_slice(&unique.to_bytes_le());
        disk[e + 32..e + 40].copy_from_slice(&2048u64.to_le_bytes());
        disk[e + 40..e + 48].copy_from_slice(&20445u64.to_le_bytes());
        for (i, unit) in "root".encode_utf16().enumerate() {
            disk[e + 56 + i * 2..e + 58 + i * 2].copy_from_slice(&unit.to_le_bytes());
        }

        // Array CRC over all 4 slots, then header CRC with its field zeroed
        let array_crc = crc32fast::hash(&disk[e..e + 4 * 128]);
        disk[h + 88..h + 92].copy_from_slice(&array_crc.to_le_bytes());

        let mut header_copy = disk[h..h + 92].to_vec();
        header_copy[16..20].fill(0);
        let header_crc = crc32fast::hash(&header_copy);
        disk[h + 16..h + 20].copy_from_slice(&header_crc.to_le_bytes());
    }

    fn create_test_disk() -> Vec<u8> {
        let mut disk = vec![0u8; 4 * SECTOR];
        write_test_gpt(&mut disk);
        disk
    }

    fn decode(disk: Vec<u8>) -> Detection<Gpt> {
        let mut source = StreamSource::new(Cursor::new(disk)).unwrap();
        Gpt::decode(&mut source, SECTOR as u64).unwrap()
    }

    #[test]
    fn test_decode_valid_gpt() {
        let gpt = decode(create_test_disk()).recognized().unwrap();

        assert!(gpt.warnings.is_empty());
        assert_eq!(
            gpt.disk_guid_string(),
            "A924656E-9A06-4F9E-82E2-CFEC246890F6"
        );
        assert_eq!(gpt.header.first_usable_lba, 34);
        assert_eq!(gpt.entries.len(), 1);

        let entry = &gpt.entries[0];
        assert_eq!(entry.index, 1);
        assert_eq!(entry.first_lba, 2048);
        assert_eq!(entry.last_lba, 20445);
        assert_eq!(entry.name, "root");
        assert_eq!(entry.type_name(), "Linux filesystem data");
    }

    #[test]
    fn test_records() {
        let gpt = decode(create_test_disk()).recognized().unwrap();
        let records = gpt.records();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, TableKind::Gpt);
        assert_eq!(records[0].type_descriptor, "Linux filesystem data");
        assert_eq!(records[0].start, 2048);
        assert_eq!(records[0].size, 18398);
        assert_eq!(records[0].note, "root");
    }

    #[test]
    fn test_zero_sector_size_is_error() {
        // No MBR signature means the defensive GPT probe runs even for
        // arbitrary input; a zero sector size must fail cleanly instead
        // of reaching the LBA arithmetic.
        let mut source = StreamSource::new(Cursor::new(vec![0u8; 4 * SECTOR])).unwrap();
        let err = Gpt::decode(&mut source, 0).unwrap_err();
        assert!(matches!(err, Error::Structural(_)));
    }

    #[test]
    fn test_bad_signature_is_absent() {
        let mut disk = create_test_disk();
        disk[SECTOR] = 0xFF;
        assert!(matches!(decode(disk), Detection::Absent));
    }

    #[test]
    fn test_header_corruption_is_warning_not_error() {
        let mut disk = create_test_disk();
        // Flip one bit in first_usable_lba; signature and CRC field intact
        disk[SECTOR + 40] ^= 0x01;

        let gpt = decode(disk).recognized().unwrap();
        assert!(gpt
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::HeaderChecksumMismatch { .. })));
        // Best-effort fields still decoded
        assert_eq!(gpt.entries.len(), 1);
    }

    #[test]
    fn test_array_corruption_is_warning_not_error() {
        let mut disk = create_test_disk();
        disk[2 * SECTOR + 40] ^= 0x01; // first_lba of entry 1

        let gpt = decode(disk).recognized().unwrap();
        assert!(gpt
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::EntryArrayChecksumMismatch { .. })));
    }

    #[test]
    fn test_backup_header_fallback() {
        let disk = create_test_disk();
        let total = disk.len();

        // Move the header to the last sector and wipe the primary.
        let mut moved = disk.clone();
        let last = total - SECTOR;
        moved.copy_within(SECTOR..2 * SECTOR, last);
        moved[SECTOR..2 * SECTOR].fill(0);

        // The relocated header still points at the array at LBA 2.
        let gpt = decode(moved).recognized().unwrap();
        assert!(gpt
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::BackupHeaderUsed { .. })));
        assert_eq!(gpt.entries.len(), 1);
    }

    #[test]
    fn test_undersized_entry_size_is_malformed() {
        let mut disk = create_test_disk();
        disk[SECTOR + 84..SECTOR + 88].copy_from_slice(&64u32.to_le_bytes());

        assert!(matches!(decode(disk), Detection::Malformed(_)));
    }

    #[test]
    fn test_array_past_end_is_malformed() {
        let mut disk = create_test_disk();
        // Declare far more entries than the image can hold
        disk[SECTOR + 80..SECTOR + 84].copy_from_slice(&1024u32.to_le_bytes());

        assert!(matches!(decode(disk), Detection::Malformed(_)));
    }

    #[test]
    fn test_unused_entries_skipped() {
        // Occupy slot 3 only; slots 1, 2, 4 stay all-zero
        let mut disk = vec![0u8; 4 * SECTOR];
        write_test_gpt(&mut disk);
        let e1 = 2 * SECTOR;
        let e3 = e1 + 2 * 128;
        let slot: Vec<u8> = disk[e1..e1 + 128].to_vec();
        disk[e3..e3 + 128].copy_from_slice(&slot);
        disk[e1..e1 + 128].fill(0);

        // Re-patch checksums after moving the entry
        let array_crc = crc32fast::hash(&disk[e1..e1 + 4 * 128]);
        disk[SECTOR + 88..SECTOR + 92].copy_from_slice(&array_crc.to_le_bytes());
        let mut header_copy = disk[SECTOR..SECTOR + 92].to_vec();
        header_copy[16..20].fill(0);
        let header_crc = crc32fast::hash(&header_copy);
        disk[SECTOR + 16..SECTOR + 20].copy_from_slice(&header_crc.to_le_bytes());

        let gpt = decode(disk).recognized().unwrap();
        assert!(gpt.warnings.is_empty());
        assert_eq!(gpt.entries.len(), 1);
        assert_eq!(gpt.entries[0].index, 3);
    }
}
