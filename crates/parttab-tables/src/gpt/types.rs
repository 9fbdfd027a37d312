//! GPT header/entry structures and the type GUID lookup table

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known partition type GUIDs, keyed by their canonical uppercase
/// hyphenated rendering
///
/// Data, not behavior: extend freely without touching the decoder.
pub const TYPE_GUID_NAMES: &[(&str, &str)] = &[
    ("024DEE41-33E7-11D3-9D69-0008C781F39F", "MBR partition scheme"),
    ("C12A7328-F81F-11D2-BA4B-00A0C93EC93B", "EFI System partition"),
    ("21686148-6449-6E6F-744E-656564454649", "BIOS Boot partition"),
    ("D3BFE2DE-3DAF-11DF-BA40-E3A556D89593", "Intel Fast Flash (iFFS) partition"),
    ("F4019732-066E-4E12-8273-346C5641494F", "Sony boot partition"),
    ("BFBFAFE7-A34F-448A-9A5B-6213EB736C22", "Lenovo boot partition / Ceph Journal"),
    ("E3C9E316-0B5C-4DB8-817D-F92DF00215AE", "Microsoft Reserved Partition (MSR)"),
    ("EBD0A0A2-B9E5-4433-87C0-68B6B72699C7", "Basic data partition"),
    ("5808C8AA-7E8F-42E0-85D2-E1E90434CFB3", "Logical Disk Manager (LDM) metadata partition"),
    ("AF9B60A0-1431-4F62-BC68-3311714A69AD", "Logical Disk Manager data partition"),
    ("DE94BBA4-06D1-4D40-A16A-BFD50179D6AC", "Windows Recovery Environment"),
    ("37AFFC90-EF7D-4E96-91C3-2D7AE055B174", "IBM General Parallel File System (GPFS) partition"),
    ("75894C1E-3AEB-11D3-B7C1-7B03A0000000", "Data partition"),
    ("E2A1E728-32E3-11D6-A682-7B03A0000000", "Service Partition"),
    ("0FC63DAF-8483-4772-8E79-3D69D8477DE4", "Linux filesystem data"),
    ("A19D880F-05FC-4D3B-A006-743F0F84911E", "RAID partition"),
    ("0657FD6D-A4AB-43C4-84E5-0933C84B4F4F", "Swap partition"),
    ("E6D6D379-F507-44C2-A23C-238F2A3DF928", "Logical Volume Manager (LVM) partition"),
    ("933AC7E1-2EB4-4F13-B844-0E14E2AEF915", "/home partition"),
    ("3B8F8425-20E0-4F3B-907F-1A25A76F98E8", "/srv partition"),
    ("7FFEC5C9-2D00-49B7-8941-3EA10A5586B7", "Plain dm-crypt partition"),
    ("CA7D7CCB-63ED-4C53-861C-1742536059CC", "LUKS partition"),
    ("8DA63339-0007-60C0-C436-083AC8230908", "Reserved"),
    ("83BD6B9D-7F41-11DC-BE0B-001560B84F0F", "Boot partition"),
    ("516E7CB4-6ECF-11D6-8FF8-00022D09712B", "Data partition"),
    ("516E7CB5-6ECF-11D6-8FF8-00022D09712B", "Swap partition"),
    ("516E7CB6-6ECF-11D6-8FF8-00022D09712B", "Unix File System (UFS) partition"),
    ("516E7CB8-6ECF-11D6-8FF8-00022D09712B", "Vinum volume manager partition"),
    ("516E7CBA-6ECF-11D6-8FF8-00022D09712B", "ZFS partition"),
    ("48465300-0000-11AA-AA11-00306543ECAC", "Hierarchical File System Plus (HFS+) partition"),
    ("55465300-0000-11AA-AA11-00306543ECAC", "Apple UFS"),
    ("6A898CC3-1DD2-11B2-99A6-080020736631", "ZFS / usr partition"),
    ("52414944-0000-11AA-AA11-00306543ECAC", "Apple RAID partition"),
    ("52414944-5F4F-11AA-AA11-00306543ECAC", "Apple RAID partition, offline"),
    ("426F6F74-0000-11AA-AA11-00306543ECAC", "Apple Boot partition"),
    ("4C616265-6C00-11AA-AA11-00306543ECAC", "Apple Label"),
    ("5265636F-7665-11AA-AA11-00306543ECAC", "Apple TV Recovery partition"),
    ("53746F72-6167-11AA-AA11-00306543ECAC", "Apple Core Storage partition"),
    ("6A82CB45-1DD2-11B2-99A6-080020736631", "Boot partition"),
    ("6A85CF4D-1DD2-11B2-99A6-080020736631", "Root partition"),
    ("6A87C46F-1DD2-11B2-99A6-080020736631", "Swap partition"),
    ("6A8B642B-1DD2-11B2-99A6-080020736631", "Backup partition"),
    ("6A8EF2E9-1DD2-11B2-99A6-080020736631", "/var partition"),
    ("6A90BA39-1DD2-11B2-99A6-080020736631", "/home partition"),
    ("6A9283A5-1DD2-11B2-99A6-080020736631", "Alternate sector"),
    ("6A945A3B-1DD2-11B2-99A6-080020736631", "Reserved partition"),
    ("6A9630D1-1DD2-11B2-99A6-080020736631", "Reserved partition"),
    ("6A980767-1DD2-11B2-99A6-080020736631", "Reserved partition"),
    ("6A96237F-1DD2-11B2-99A6-080020736631", "Reserved partition"),
    ("6A8D2AC7-1DD2-11B2-99A6-080020736631", "Reserved partition"),
    ("49F48D32-B10E-11DC-B99B-0019D1879648", "Swap partition"),
    ("49F48D5A-B10E-11DC-B99B-0019D1879648", "FFS partition"),
    ("49F48D82-B10E-11DC-B99B-0019D1879648", "LFS partition"),
    ("49F48DAA-B10E-11DC-B99B-0019D1879648", "RAID partition"),
    ("2DB519C4-B10F-11DC-B99B-0019D1879648", "Concatenated partition"),
    ("2DB519EC-B10F-11DC-B99B-0019D1879648", "Encrypted partition"),
    ("FE3A2A5D-4F32-41A7-B725-ACCC3285A309", "ChromeOS kernel"),
    ("3CB8E202-3B7E-47DD-8A3C-7FF2A13CFCEC", "ChromeOS rootfs"),
    ("2E0A753D-9E48-43B0-8337-B15192CB1B5E", "ChromeOS future use"),
    ("42465331-3BA3-10F1-802A-4861696B7521", "Haiku BFS"),
    ("85D5E45E-237C-11E1-B4B3-E89A8F7FC3A7", "Boot partition"),
    ("85D5E45A-237C-11E1-B4B3-E89A8F7FC3A7", "Data partition"),
    ("85D5E45B-237C-11E1-B4B3-E89A8F7FC3A7", "Swap partition"),
    ("0394EF8B-237E-11E1-B4B3-E89A8F7FC3A7", "Unix File System (UFS) partition"),
    ("85D5E45C-237C-11E1-B4B3-E89A8F7FC3A7", "Vinum volume manager partition"),
    ("85D5E45D-237C-11E1-B4B3-E89A8F7FC3A7", "ZFS partition"),
    ("45B0969E-9B03-4F30-B4C6-5EC00CEFF106", "Ceph dm-crypt Encrypted Journal"),
    ("4FBD7E29-9D25-41B8-AFD0-062C0CEFF05D", "Ceph OSD"),
    ("4FBD7E29-9D25-41B8-AFD0-5EC00CEFF05D", "Ceph dm-crypt OSD"),
    ("89C57F98-2FE5-4DC0-89C1-F3AD0CEFF2BE", "Ceph disk in creation"),
    ("89C57F98-2FE5-4DC0-89C1-5EC00CEFF2BE", "Ceph dm-crypt disk in creation"),
];

/// Canonical uppercase hyphenated rendering, matching `gdisk` output
pub fn guid_string(guid: &Uuid) -> String {
    guid.hyphenated().to_string().to_ascii_uppercase()
}

/// Human string for a partition type GUID; "Unknown" if unmapped
pub fn type_name(guid: &Uuid) -> &'static str {
    let key = guid_string(guid);
    TYPE_GUID_NAMES
        .iter()
        .find(|(g, _)| *g == key)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// GPT header, at LBA 1 (primary) and the last LBA (backup)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GptHeader {
    /// GPT revision (0x00010000 for revision 1.0)
    pub revision: u32,
    /// Declared header size in bytes (92 for revision 1.0)
    pub header_size: u32,
    /// CRC32 of the header with this field zeroed
    pub header_crc32: u32,
    /// LBA of this header
    pub current_lba: u64,
    /// LBA of the other header copy
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: Uuid,
    /// Starting LBA of the partition entry array
    pub partition_entry_lba: u64,
    pub partition_entry_count: u32,
    pub partition_entry_size: u32,
    /// CRC32 of the full partition entry array
    pub partition_array_crc32: u32,
}

impl GptHeader {
    /// Header signature literal
    pub const SIGNATURE: &'static [u8; 8] = b"EFI PART";

    /// Minimum legal header size
    pub const MIN_HEADER_SIZE: u32 = 92;

    /// Byte range of the CRC32 field within the header
    pub const CRC_FIELD: std::ops::Range<usize> = 16..20;

    /// Parse a header from a raw sector; `None` on signature mismatch
    ///
    /// Field values are taken at face value here; structural validation
    /// and checksum verification happen in the decoder.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::MIN_HEADER_SIZE as usize || &bytes[0..8] != Self::SIGNATURE {
            return None;
        }

        let mut disk_guid = [0u8; 16];
        disk_guid.copy_from_slice(&bytes[56..72]);

        Some(Self {
            revision: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            header_size: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
            header_crc32: u32::from_le_bytes(bytes[16..20].try_into().unwrap()),
            current_lba: u64::from_le_bytes(bytes[24..32].try_into().unwrap()),
            backup_lba: u64::from_le_bytes(bytes[32..40].try_into().unwrap()),
            first_usable_lba: u64::from_le_bytes(bytes[40..48].try_into().unwrap()),
            last_usable_lba: u64::from_le_bytes(bytes[48..56].try_into().unwrap()),
            disk_guid: Uuid::from_bytes_le(disk_guid),
            partition_entry_lba: u64::from_le_bytes(bytes[72..80].try_into().unwrap()),
            partition_entry_count: u32::from_le_bytes(bytes[80..84].try_into().unwrap()),
            partition_entry_size: u32::from_le_bytes(bytes[84..88].try_into().unwrap()),
            partition_array_crc32: u32::from_le_bytes(bytes[88..92].try_into().unwrap()),
        })
    }

    /// Recompute the header CRC32 over `header_size` bytes of `raw` with
    /// the checksum field zeroed
    pub fn compute_header_crc32(&self, raw: &[u8]) -> u32 {
        let mut copy = raw[..self.header_size as usize].to_vec();
        copy[Self::CRC_FIELD].fill(0);
        crc32fast::hash(&copy)
    }
}

/// One occupied GPT partition entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GptEntry {
    /// 1-based slot position within the entry array
    pub index: usize,
    pub type_guid: Uuid,
    pub unique_guid: Uuid,
    /// First LBA, inclusive
    pub first_lba: u64,
    /// Last LBA, inclusive
    pub last_lba: u64,
    pub attributes: u64,
    /// Volume name, trimmed at the first NUL
    pub name: String,
}

impl GptEntry {
    /// Minimum (and typical) entry size in bytes
    pub const MIN_ENTRY_SIZE: usize = 128;

    /// Parse one entry slot; `None` when unused (all-zero type GUID)
    ///
    /// Entries larger than 128 bytes carry reserved tail bytes which are
    /// ignored.
    pub fn from_bytes(index: usize, bytes: &[u8]) -> Option<Self> {
        let mut type_guid = [0u8; 16];
        type_guid.copy_from_slice(&bytes[0..16]);
        let type_guid = Uuid::from_bytes_le(type_guid);
        if type_guid.is_nil() {
            return None;
        }

        let mut unique_guid = [0u8; 16];
        unique_guid.copy_from_slice(&bytes[16..32]);

        Some(Self {
            index,
            type_guid,
            unique_guid: Uuid::from_bytes_le(unique_guid),
            first_lba: u64::from_le_bytes(bytes[32..40].try_into().unwrap()),
            last_lba: u64::from_le_bytes(bytes[40..48].try_into().unwrap()),
            attributes: u64::from_le_bytes(bytes[48..56].try_into().unwrap()),
            name: parse_utf16_name(&bytes[56..128]),
        })
    }

    /// Size in sectors; LBA bounds are inclusive on both ends
    pub fn size_in_sectors(&self) -> u64 {
        if self.last_lba >= self.first_lba {
            self.last_lba - self.first_lba + 1
        } else {
            0
        }
    }

    /// Human string for the type GUID
    pub fn type_name(&self) -> &'static str {
        type_name(&self.type_guid)
    }
}

/// Decode a UTF-16LE name field, stopping at the first NUL code unit
fn parse_utf16_name(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}
