//! Normalized output model
//!
//! Decoders produce [`PartitionRecord`]s; the pipeline aggregates them
//! into one [`DiskReport`] per image. Records are immutable once created
//! and owned solely by the report that holds them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which on-disk format a table or record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    Mbr,
    Gpt,
    Bsd,
}

impl TableKind {
    /// Human-readable table name
    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Mbr => "Master Boot Record",
            TableKind::Gpt => "GUID Partition Table",
            TableKind::Bsd => "BSD Disklabel",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One normalized partition entry, cross-format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionRecord {
    /// Format of the table this record came from
    pub source: TableKind,

    /// 1-based slot position within its table
    pub index: usize,

    /// Human string for the type byte / type GUID; "Unknown" if unmapped
    pub type_descriptor: String,

    /// Absolute start sector
    pub start: u64,

    /// Size in sectors
    pub size: u64,

    /// Free-text annotation ("* ID=0x83", volume name, flags)
    pub note: String,
}

impl fmt::Display for PartitionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [start {}, {} sectors] {}",
            self.index, self.type_descriptor, self.start, self.size, self.note
        )
    }
}

/// Soft decode findings attached to a recognized table
///
/// Warnings never abort decoding; the decoded fields are still reported
/// best-effort for forensic use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Warning {
    /// GPT header CRC32 did not match the recomputed value
    HeaderChecksumMismatch { stored: u32, computed: u32 },

    /// GPT partition entry array CRC32 did not match
    EntryArrayChecksumMismatch { stored: u32, computed: u32 },

    /// BSD disklabel 16-bit checksum did not match
    LabelChecksumMismatch { stored: u16, computed: u16 },

    /// Primary GPT header was unusable; fields come from the backup
    BackupHeaderUsed { lba: u64 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::HeaderChecksumMismatch { stored, computed } => write!(
                f,
                "header CRC32 mismatch: stored 0x{stored:08X}, computed 0x{computed:08X}"
            ),
            Warning::EntryArrayChecksumMismatch { stored, computed } => write!(
                f,
                "partition array CRC32 mismatch: stored 0x{stored:08X}, computed 0x{computed:08X}"
            ),
            Warning::LabelChecksumMismatch { stored, computed } => write!(
                f,
                "label checksum mismatch: stored 0x{stored:04X}, computed 0x{computed:04X}"
            ),
            Warning::BackupHeaderUsed { lba } => {
                write!(f, "primary header unusable, decoded backup at LBA {lba}")
            }
        }
    }
}

/// One recognized table with its records and soft findings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub kind: TableKind,
    /// Format-level identity: MBR disk serial, GPT disk GUID
    pub descriptor: Option<String>,
    pub records: Vec<PartitionRecord>,
    pub warnings: Vec<Warning>,
}

/// Everything recognized on one image
///
/// An image may legitimately hold more than one table (protective MBR
/// plus GPT is the common case); both are kept, in probe order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskReport {
    /// Identity of the inspected image (path or label)
    pub source: String,
    pub tables: Vec<TableReport>,
}

impl DiskReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            tables: Vec::new(),
        }
    }

    /// True when no format was recognized; a valid, non-error outcome
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// First table of the given kind, if any was recognized
    pub fn table(&self, kind: TableKind) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.kind == kind)
    }
}

/// Tagged probe result shared by all decoders
///
/// A decoder is a pure function from bytes to one of these tags; the
/// pipeline composes results by matching on them. `Absent` is the
/// overwhelmingly common outcome and is not an error.
#[derive(Debug)]
pub enum Detection<T> {
    /// Signature matched and the table decoded
    Recognized(T),

    /// Signature/magic mismatch: this format is not present
    Absent,

    /// Signature matched but the structure is impossible; the reason is
    /// logged and this table contributes nothing to the report
    Malformed(String),
}

impl<T> Detection<T> {
    pub fn is_recognized(&self) -> bool {
        matches!(self, Detection::Recognized(_))
    }

    /// Unwrap the recognized value, discarding negative outcomes
    pub fn recognized(self) -> Option<T> {
        match self {
            Detection::Recognized(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_kind_names() {
        assert_eq!(TableKind::Mbr.name(), "Master Boot Record");
        assert_eq!(TableKind::Gpt.name(), "GUID Partition Table");
        assert_eq!(TableKind::Bsd.name(), "BSD Disklabel");
    }

    #[test]
    fn test_disk_report_lookup() {
        let mut report = DiskReport::new("disk.img");
        assert!(report.is_empty());

        report.tables.push(TableReport {
            kind: TableKind::Mbr,
            descriptor: Some("1A2B3C4D".to_string()),
            records: vec![],
            warnings: vec![],
        });
        report.tables.push(TableReport {
            kind: TableKind::Gpt,
            descriptor: None,
            records: vec![],
            warnings: vec![],
        });

        assert!(!report.is_empty());
        assert!(report.table(TableKind::Mbr).is_some());
        assert!(report.table(TableKind::Gpt).is_some());
        assert!(report.table(TableKind::Bsd).is_none());
    }

    #[test]
    fn test_detection_recognized() {
        let d = Detection::Recognized(42);
        assert!(d.is_recognized());
        assert_eq!(d.recognized(), Some(42));

        let d: Detection<i32> = Detection::Absent;
        assert!(!d.is_recognized());
        assert_eq!(d.recognized(), None);
    }

    #[test]
    fn test_warning_display() {
        let w = Warning::HeaderChecksumMismatch {
            stored: 0xDEADBEEF,
            computed: 0x12345678,
        };
        let s = w.to_string();
        assert!(s.contains("0xDEADBEEF"));
        assert!(s.contains("0x12345678"));
    }
}
