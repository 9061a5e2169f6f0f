use crate::config::HEADER_LEN;
use crate::error::{FramfsError, Result};
use serde::{Deserialize, Serialize};

/// Header magic, "FS" little-endian
pub const MAGIC: u16 = 0x4653;
pub const FORMAT_VERSION: u8 = 0x01;

/// Filesystem header (16 bytes at media address 0)
///
/// Single source of truth for how much of the device is allocated:
/// `next_data_addr` always equals the index-region end plus the sum of all
/// counted entry lengths.
///
/// On-media layout (little-endian):
///
/// ```text
/// offset  0: magic           u16   0x4653
/// offset  2: version         u8    0x01
/// offset  3: reserved        u8
/// offset  4: file_count      u16
/// offset  6: max_files       u16
/// offset  8: next_data_addr  u32
/// offset 12: total_data_size u32
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub magic: u16,
    pub version: u8,
    /// Entries counted so far; entries at or past this index are invisible
    pub file_count: u16,
    /// Entry-table capacity this image was formatted with
    pub max_files: u16,
    /// Next free byte in the data region
    pub next_data_addr: u32,
    /// Total data bytes accounted across all files
    pub total_data_size: u32,
}

impl Header {
    /// Fresh header for a newly formatted image
    pub fn new(max_files: u16, data_start: u32) -> Self {
        Header {
            magic: MAGIC,
            version: FORMAT_VERSION,
            file_count: 0,
            max_files,
            next_data_addr: data_start,
            total_data_size: 0,
        }
    }

    /// Validate magic, version, and internal accounting
    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(FramfsError::CorruptHeader(format!(
                "bad magic {:#06x} (expected {:#06x})",
                self.magic, MAGIC
            )));
        }
        if self.version != FORMAT_VERSION {
            return Err(FramfsError::CorruptHeader(format!(
                "unsupported version {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        if self.file_count > self.max_files {
            return Err(FramfsError::CorruptHeader(format!(
                "file_count {} exceeds max_files {}",
                self.file_count, self.max_files
            )));
        }
        Ok(())
    }

    /// Serialize to the 16-byte media representation
    pub fn to_bytes(&self) -> [u8; HEADER_LEN as usize] {
        let mut bytes = [0u8; HEADER_LEN as usize];
        bytes[0..2].copy_from_slice(&self.magic.to_le_bytes());
        bytes[2] = self.version;
        // byte 3 reserved
        bytes[4..6].copy_from_slice(&self.file_count.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.max_files.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.next_data_addr.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.total_data_size.to_le_bytes());
        bytes
    }

    /// Deserialize and validate the 16-byte media representation
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN as usize {
            return Err(FramfsError::CorruptHeader(format!(
                "short header: {} bytes",
                bytes.len()
            )));
        }

        let header = Header {
            magic: u16::from_le_bytes([bytes[0], bytes[1]]),
            version: bytes[2],
            file_count: u16::from_le_bytes([bytes[4], bytes[5]]),
            max_files: u16::from_le_bytes([bytes[6], bytes[7]]),
            next_data_addr: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            total_data_size: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
        };

        header.validate()?;
        Ok(header)
    }
}
