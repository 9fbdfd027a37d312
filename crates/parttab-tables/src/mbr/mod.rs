//! MBR (Master Boot Record) decoder
//!
//! The MBR occupies the first 512 bytes of the disk and carries up to 4
//! primary partition entries.
//!
//! # Structure
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0x000   440   Bootstrap code
//! 0x1B8   4     Disk serial
//! 0x1BC   2     Reserved
//! 0x1BE   16    Partition entry 1
//! 0x1CE   16    Partition entry 2
//! 0x1DE   16    Partition entry 3
//! 0x1EE   16    Partition entry 4
//! 0x1FE   2     Boot signature (0xAA55)
//! ```

pub mod types;

use parttab_core::{ByteSource, Detection, PartitionRecord, Result, TableKind};
use serde::{Deserialize, Serialize};
use types::ChsAddress;

/// One occupied 16-byte partition slot
///
/// The status byte and both CHS addresses are kept verbatim so that a
/// decoded slot re-encodes to its original 16 bytes exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MbrEntry {
    /// 1-based slot position
    pub index: usize,
    /// Raw status byte; the entry is active when >= 0x80
    pub status: u8,
    pub type_byte: u8,
    #[serde(skip)]
    pub chs_first: ChsAddress,
    #[serde(skip)]
    pub chs_last: ChsAddress,
    pub start_lba: u32,
    pub sector_count: u32,
}

impl MbrEntry {
    /// Size of one partition slot in bytes
    pub const SLOT_SIZE: usize = 16;

    /// Decode one 16-byte slot; `None` when the slot is unused (type 0x00)
    pub fn from_bytes(index: usize, bytes: &[u8]) -> Option<Self> {
        let type_byte = bytes[4];
        if type_byte == 0x00 {
            return None;
        }

        Some(Self {
            index,
            status: bytes[0],
            type_byte,
            chs_first: ChsAddress::from_bytes(&bytes[1..4]),
            chs_last: ChsAddress::from_bytes(&bytes[5..8]),
            start_lba: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            sector_count: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        })
    }

    /// Re-encode to the on-disk 16-byte slot layout
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0] = self.status;
        out[1..4].copy_from_slice(&self.chs_first.to_bytes());
        out[4] = self.type_byte;
        out[5..8].copy_from_slice(&self.chs_last.to_bytes());
        out[8..12].copy_from_slice(&self.start_lba.to_le_bytes());
        out[12..16].copy_from_slice(&self.sector_count.to_le_bytes());
        out
    }

    /// Active (bootable) flag, from the high bit of the status byte
    pub fn active(&self) -> bool {
        self.status >= 0x80
    }

    /// Human string for the type byte
    pub fn type_name(&self) -> &'static str {
        types::type_name(self.type_byte)
    }

    /// True for the 0xEE marker of a protective MBR hiding a GPT
    pub fn is_protective_gpt(&self) -> bool {
        self.type_byte == types::GPT_PROTECTIVE
    }

    /// True for extended partition containers (0x05, 0x0F, ...)
    pub fn is_extended(&self) -> bool {
        types::is_extended(self.type_byte)
    }

    /// True when the entry marks a BSD slice that may carry an embedded
    /// disklabel
    pub fn is_bsd_slice(&self) -> bool {
        types::is_bsd_slice(self.type_byte)
    }

    fn to_record(&self) -> PartitionRecord {
        let note = if self.active() {
            format!("* ID=0x{:02X}", self.type_byte)
        } else {
            format!("ID=0x{:02X}", self.type_byte)
        };
        PartitionRecord {
            source: TableKind::Mbr,
            index: self.index,
            type_descriptor: self.type_name().to_string(),
            start: self.start_lba as u64,
            size: self.sector_count as u64,
            note,
        }
    }
}

/// A decoded Master Boot Record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MbrTable {
    pub disk_serial: [u8; 4],
    /// Occupied slots only, in slot order
    pub entries: Vec<MbrEntry>,
}

impl MbrTable {
    /// The boot signature that must be present at offset 0x1FE
    pub const BOOT_SIGNATURE: u16 = 0xAA55;

    /// Size of the boot sector in bytes (always 512, independent of the
    /// device's logical sector size)
    pub const SECTOR_SIZE: usize = 512;

    /// Offset of the disk serial
    pub const DISK_SERIAL_OFFSET: usize = 0x1B8;

    /// Offset of the first partition slot
    pub const PARTITION_TABLE_OFFSET: usize = 0x1BE;

    /// Offset of the boot signature
    pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

    /// Number of partition slots
    pub const NUM_SLOTS: usize = 4;

    /// Decode the boot sector at offset 0
    ///
    /// The first 512 bytes are the one mandatory probe of the whole
    /// pipeline, so a truncated image surfaces as a hard error here.
    /// A missing boot signature is `Absent`, not an error.
    pub fn decode(source: &mut dyn ByteSource) -> Result<Detection<MbrTable>> {
        let sector = source.read_at(0, Self::SECTOR_SIZE)?;

        let boot_signature = u16::from_le_bytes([
            sector[Self::BOOT_SIGNATURE_OFFSET],
            sector[Self::BOOT_SIGNATURE_OFFSET + 1],
        ]);
        if boot_signature != Self::BOOT_SIGNATURE {
            return Ok(Detection::Absent);
        }

        let mut disk_serial = [0u8; 4];
        disk_serial.copy_from_slice(&sector[Self::DISK_SERIAL_OFFSET..Self::DISK_SERIAL_OFFSET + 4]);

        let mut entries = Vec::new();
        for slot in 0..Self::NUM_SLOTS {
            let offset = Self::PARTITION_TABLE_OFFSET + slot * MbrEntry::SLOT_SIZE;
            if let Some(entry) =
                MbrEntry::from_bytes(slot + 1, &sector[offset..offset + MbrEntry::SLOT_SIZE])
            {
                entries.push(entry);
            }
        }

        Ok(Detection::Recognized(MbrTable {
            disk_serial,
            entries,
        }))
    }

    /// Disk serial rendered as hex, as reference tooling prints it
    pub fn serial_hex(&self) -> String {
        hex::encode(self.disk_serial)
    }

    /// True when any entry carries the 0xEE protective marker; gates the
    /// GPT probe in the pipeline
    pub fn has_protective_gpt(&self) -> bool {
        self.entries.iter().any(|e| e.is_protective_gpt())
    }

    /// Entries whose type byte marks a BSD slice
    pub fn bsd_slices(&self) -> impl Iterator<Item = &MbrEntry> {
        self.entries.iter().filter(|e| e.is_bsd_slice())
    }

    /// Normalized records for the occupied slots
    pub fn records(&self) -> Vec<PartitionRecord> {
        self.entries.iter().map(MbrEntry::to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parttab_core::StreamSource;
    use std::io::Cursor;

    /// Boot sector with one bootable FAT32X partition at LBA 2048
    fn create_test_sector() -> Vec<u8> {
        let mut sector = vec![0u8; 512];

        // Disk serial
        sector[0x1B8..0x1BC].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);

        let e = 0x1BE;
        sector[e] = 0x80; // bootable
        sector[e + 1..e + 4].copy_from_slice(&[0x20, 0x21, 0x00]); // CHS first
        sector[e + 4] = 0x0C; // FAT32X
        sector[e + 5..e + 8].copy_from_slice(&[0xFE, 0xFF, 0xFF]); // CHS last
        sector[e + 8..e + 12].copy_from_slice(&2048u32.to_le_bytes());
        sector[e + 12..e + 16].copy_from_slice(&20480u32.to_le_bytes());

        sector[0x1FE] = 0x55;
        sector[0x1FF] = 0xAA;
        sector
    }

    fn decode(sector: Vec<u8>) -> Detection<MbrTable> {
        let mut source = StreamSource::new(Cursor::new(sector)).unwrap();
        MbrTable::decode(&mut source).unwrap()
    }

    #[test]
    fn test_decode_valid_sector() {
        let table = decode(create_test_sector()).recognized().unwrap();

        assert_eq!(table.serial_hex(), "12345678");
        assert_eq!(table.entries.len(), 1);

        let entry = &table.entries[0];
        assert_eq!(entry.index, 1);
        assert!(entry.active());
        assert_eq!(entry.type_byte, 0x0C);
        assert_eq!(entry.start_lba, 2048);
        assert_eq!(entry.sector_count, 20480);
        assert!(!table.has_protective_gpt());
    }

    #[test]
    fn test_records() {
        let table = decode(create_test_sector()).recognized().unwrap();
        let records = table.records();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, TableKind::Mbr);
        assert_eq!(records[0].index, 1);
        assert_eq!(records[0].type_descriptor, "FAT32X");
        assert_eq!(records[0].start, 2048);
        assert_eq!(records[0].size, 20480);
        assert_eq!(records[0].note, "* ID=0x0C");
    }

    #[test]
    fn test_missing_boot_signature_is_absent() {
        let mut sector = create_test_sector();
        sector[0x1FE] = 0x00;
        assert!(!decode(sector).is_recognized());
    }

    #[test]
    fn test_all_zero_sector_is_absent() {
        assert!(matches!(decode(vec![0u8; 512]), Detection::Absent));
    }

    #[test]
    fn test_truncated_image_is_hard_error() {
        let mut source = StreamSource::new(Cursor::new(vec![0u8; 100])).unwrap();
        let err = MbrTable::decode(&mut source).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn test_empty_slots_excluded() {
        let mut sector = vec![0u8; 512];
        sector[0x1FE] = 0x55;
        sector[0x1FF] = 0xAA;

        let table = decode(sector).recognized().unwrap();
        assert!(table.entries.is_empty());
        assert!(table.records().is_empty());
    }

    #[test]
    fn test_protective_gpt_detection() {
        let mut sector = vec![0u8; 512];
        let e = 0x1BE;
        sector[e + 4] = 0xEE;
        sector[e + 8..e + 12].copy_from_slice(&1u32.to_le_bytes());
        sector[e + 12..e + 16].copy_from_slice(&20479u32.to_le_bytes());
        sector[0x1FE] = 0x55;
        sector[0x1FF] = 0xAA;

        let table = decode(sector).recognized().unwrap();
        assert!(table.has_protective_gpt());

        let records = table.records();
        assert_eq!(records[0].type_descriptor, "EFI GPT protective MBR");
        assert_eq!(records[0].start, 1);
        assert_eq!(records[0].size, 20479);
    }

    #[test]
    fn test_bsd_slice_enumeration() {
        let mut sector = vec![0u8; 512];
        // Slot 1: Linux; slot 3: NetBSD
        let e1 = 0x1BE;
        sector[e1 + 4] = 0x83;
        sector[e1 + 8..e1 + 12].copy_from_slice(&64u32.to_le_bytes());
        sector[e1 + 12..e1 + 16].copy_from_slice(&100u32.to_le_bytes());
        let e3 = 0x1DE;
        sector[e3 + 4] = 0xA9;
        sector[e3 + 8..e3 + 12].copy_from_slice(&4096u32.to_le_bytes());
        sector[e3 + 12..e3 + 16].copy_from_slice(&8192u32.to_le_bytes());
        sector[0x1FE] = 0x55;
        sector[0x1FF] = 0xAA;

        let table = decode(sector).recognized().unwrap();
        assert_eq!(table.entries.len(), 2);

        let slices: Vec<_> = table.bsd_slices().collect();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].index, 3);
        assert_eq!(slices[0].start_lba, 4096);
    }

    #[test]
    fn test_slot_round_trip() {
        // Decoding then re-encoding each occupied slot reproduces the
        // original 16 bytes, including status byte and CHS fields.
        let sector = create_test_sector();
        let table = decode(sector.clone()).recognized().unwrap();

        for entry in &table.entries {
            let offset = 0x1BE + (entry.index - 1) * 16;
            assert_eq!(entry.to_bytes(), sector[offset..offset + 16]);
        }
    }

    #[test]
    fn test_non_boot_status_byte_preserved() {
        let mut sector = create_test_sector();
        sector[0x1BE] = 0x81; // unusual but seen in the wild

        let table = decode(sector).recognized().unwrap();
        let entry = &table.entries[0];
        assert!(entry.active());
        assert_eq!(entry.to_bytes()[0], 0x81);
    }
}
