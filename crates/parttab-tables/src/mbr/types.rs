//! MBR type byte lookup and CHS addressing

use std::fmt;

/// Partition type code for a GPT protective MBR entry
pub const GPT_PROTECTIVE: u8 = 0xEE;

/// Human string for an MBR partition type byte
///
/// Data, not behavior: extend freely without touching the decoder.
pub fn type_name(byte: u8) -> &'static str {
    match byte {
        0x00 => "Empty",
        0x01 => "FAT12",
        0x04 => "FAT16 16-32MB",
        0x05 => "Extended, CHS",
        0x06 => "FAT16 32MB-2GB",
        0x07 => "NTFS",
        0x0B => "FAT32",
        0x0C => "FAT32X",
        0x0E => "FAT16X",
        0x0F => "Extended, LBA",
        0x11 => "Hidden FAT12",
        0x14 => "Hidden FAT16,16-32MB",
        0x15 => "Hidden Extended, CHS",
        0x16 => "Hidden FAT16,32MB-2GB",
        0x17 => "Hidden NTFS",
        0x1B => "Hidden FAT32",
        0x1C => "Hidden FAT32X",
        0x1E => "Hidden FAT16X",
        0x1F => "Hidden Extended, LBA",
        0x27 => "Windows recovery environment",
        0x39 => "Plan 9",
        0x3C => "PartitionMagic recovery partition",
        0x42 => "Windows dynamic extended partition marker",
        0x44 => "GoBack partition",
        0x63 => "Unix System V",
        0x64 => "PC-ARMOUR protected partition",
        0x81 => "Minix",
        0x82 => "Linux Swap",
        0x83 => "Linux",
        0x84 => "Hibernation",
        0x85 => "Linux Extended",
        0x86 => "Fault-tolerant FAT16B volume set",
        0x87 => "Fault-tolerant NTFS volume set",
        0x88 => "Linux plaintext",
        0x8E => "Linux LVM",
        0x93 => "Hidden Linux",
        0x9F => "BSD/OS",
        0xA0 | 0xA1 => "Hibernation",
        0xA5 => "FreeBSD",
        0xA6 => "OpenBSD",
        0xA8 => "Mac OS X",
        0xA9 => "NetBSD",
        0xAB => "Mac OS X Boot",
        0xAF => "Mac OS X HFS",
        0xBE => "Solaris 8 boot",
        0xBF => "Solaris x86",
        0xE8 => "Linux Unified Key Setup",
        0xEB => "BFS",
        0xEE => "EFI GPT protective MBR",
        0xEF => "EFI system",
        0xFA => "Bochs x86 emulator",
        0xFB => "VMware File System",
        0xFC => "VMware Swap",
        0xFD => "Linux RAID",
        _ => "Unknown",
    }
}

/// Extended partition container types (chain traversal is out of scope;
/// only the top-level pointer entry is reported)
pub fn is_extended(byte: u8) -> bool {
    matches!(byte, 0x05 | 0x0F | 0x15 | 0x1F | 0x85)
}

/// Type bytes that mark a BSD slice, i.e. a candidate location for an
/// embedded BSD disklabel
pub fn is_bsd_slice(byte: u8) -> bool {
    matches!(byte, 0x9F | 0xA5 | 0xA6 | 0xA9)
}

/// CHS (Cylinder-Head-Sector) address
///
/// Legacy geometry addressing, superseded by the LBA fields. Parsed for
/// slot round-trip fidelity but excluded from the normalized record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChsAddress {
    pub cylinder: u16,
    pub head: u8,
    pub sector: u8,
}

impl ChsAddress {
    /// Parse a CHS address from its packed 3-byte form
    ///
    /// Byte 0 is the head; byte 1 packs the sector (bits 0-5) with the
    /// cylinder's top two bits; byte 2 is the cylinder's low byte.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let head = bytes[0];
        let sector = bytes[1] & 0x3F;
        let cylinder = (((bytes[1] & 0xC0) as u16) << 2) | bytes[2] as u16;

        Self {
            cylinder,
            head,
            sector,
        }
    }

    /// Re-pack into the on-disk 3-byte form
    pub fn to_bytes(&self) -> [u8; 3] {
        let cyl_high = ((self.cylinder >> 8) & 0x03) as u8;
        [
            self.head,
            (self.sector & 0x3F) | (cyl_high << 6),
            (self.cylinder & 0xFF) as u8,
        ]
    }
}

impl fmt::Display for ChsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C:{}/H:{}/S:{}", self.cylinder, self.head, self.sector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(0x83), "Linux");
        assert_eq!(type_name(0xEE), "EFI GPT protective MBR");
        assert_eq!(type_name(0x0B), "FAT32");
        assert_eq!(type_name(0xD0), "Unknown");
    }

    #[test]
    fn test_extended_and_bsd_predicates() {
        assert!(is_extended(0x05));
        assert!(is_extended(0x0F));
        assert!(is_extended(0x85));
        assert!(!is_extended(0x83));

        assert!(is_bsd_slice(0xA5));
        assert!(is_bsd_slice(0xA9));
        assert!(!is_bsd_slice(0x07));
    }

    #[test]
    fn test_chs_round_trip() {
        let chs = ChsAddress {
            cylinder: 1023,
            head: 254,
            sector: 63,
        };
        assert_eq!(ChsAddress::from_bytes(&chs.to_bytes()), chs);

        let chs = ChsAddress {
            cylinder: 0,
            head: 1,
            sector: 1,
        };
        assert_eq!(ChsAddress::from_bytes(&chs.to_bytes()), chs);
    }

    #[test]
    fn test_chs_from_bytes_packing() {
        // Sector 5 with cylinder 0x2FF: byte 1 = 0b10_000101
        let chs = ChsAddress::from_bytes(&[7, 0x85, 0xFF]);
        assert_eq!(chs.head, 7);
        assert_eq!(chs.sector, 5);
        assert_eq!(chs.cylinder, 0x2FF);
    }
}
