//! BSD disklabel fstype lookup

/// Human string for a disklabel fstype byte
///
/// Data, not behavior: extend freely without touching the decoder.
pub fn fstype_name(byte: u8) -> &'static str {
    match byte {
        0x00 => "Unused",
        0x01 => "Swap",
        0x02 => "V6",
        0x03 => "V7",
        0x04 => "SystemV",
        0x05 => "4.1BSD",
        0x06 => "Eighth edition",
        0x07 => "4.2BSD fast file system (FFS)",
        0x08 => "MSDOS (FAT variants)",
        0x09 => "4.4BSD (LFS)",
        0x0B => "OS/2 (HPFS)",
        0x0C => "CD-ROM (ISO9660)",
        0x0D => "Bootstrap",
        0x1B => "ZFS",
        0x20 => "NTFS",
        _ => "Unknown",
    }
}
