//! File entries
//!
//! One 32-byte slot per index position, immediately after the header. Entries
//! are created in order and never deleted; slot index equals creation order.

use crate::config::ENTRY_LEN;
use crate::error::{FramfsError, Result};
use serde::{Deserialize, Serialize};

/// File type tag: raw bytes (uninterpreted by the filesystem)
pub const FILE_TYPE_RAW: u8 = 0x00;
/// File type tag: sensor log
pub const FILE_TYPE_SENSOR_LOG: u8 = 0x01;
/// File type tag: configuration data
pub const FILE_TYPE_CONFIG: u8 = 0x02;

/// Entry lifecycle state
///
/// The states are mutually exclusive: a slot starts Free, becomes Active when
/// a file is created in it, and ends Sealed. At most one entry is Active
/// system-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntryStatus {
    /// Slot never used
    Free = 0x00,
    /// Currently appendable
    Active = 0x01,
    /// Immutable, read-only
    Sealed = 0x02,
}

impl EntryStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Free),
            0x01 => Some(Self::Active),
            0x02 => Some(Self::Sealed),
            _ => None,
        }
    }
}

/// One file's metadata record
///
/// On-media layout (32 bytes, little-endian; `cap` is the configured
/// filename field width):
///
/// ```text
/// offset 0:       filename    [u8; cap]  NUL-terminated
/// offset cap:     start_addr  u32
/// offset cap+4:   length      u32
/// offset cap+8:   status      u8
/// offset cap+9:   file_type   u8
/// offset cap+10:  reserved    u16
/// remainder:      zero padding
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Unique among non-Free entries
    pub filename: String,
    /// First data byte, assigned once at creation
    pub start_addr: u32,
    /// Bytes durably appended and accounted so far
    pub length: u32,
    pub status: EntryStatus,
    /// Caller-defined tag, opaque to the filesystem
    pub file_type: u8,
}

impl FileEntry {
    /// New Active entry at `start_addr` with zero length
    pub fn new_active(filename: &str, start_addr: u32, file_type: u8) -> Self {
        FileEntry {
            filename: filename.to_string(),
            start_addr,
            length: 0,
            status: EntryStatus::Active,
            file_type,
        }
    }

    /// Serialize to the 32-byte media representation
    ///
    /// Fails with `InvalidArgument` if the name does not fit `cap - 1` bytes
    /// or contains a NUL.
    pub fn to_bytes(&self, cap: usize) -> Result<[u8; ENTRY_LEN as usize]> {
        let name = self.filename.as_bytes();
        if name.len() >= cap {
            return Err(FramfsError::InvalidArgument(format!(
                "filename '{}' longer than {} bytes",
                self.filename,
                cap - 1
            )));
        }
        if name.contains(&0) {
            return Err(FramfsError::InvalidArgument(
                "filename contains NUL".into(),
            ));
        }

        let mut bytes = [0u8; ENTRY_LEN as usize];
        bytes[..name.len()].copy_from_slice(name);
        bytes[cap..cap + 4].copy_from_slice(&self.start_addr.to_le_bytes());
        bytes[cap + 4..cap + 8].copy_from_slice(&self.length.to_le_bytes());
        bytes[cap + 8] = self.status as u8;
        bytes[cap + 9] = self.file_type;
        // cap+10..cap+12 reserved, remainder padding
        Ok(bytes)
    }

    /// Deserialize the 32-byte media representation
    ///
    /// An unknown status byte means the index region no longer matches any
    /// state this filesystem writes, and is reported as `InconsistentState`.
    pub fn from_bytes(bytes: &[u8], cap: usize) -> Result<Self> {
        if bytes.len() < ENTRY_LEN as usize {
            return Err(FramfsError::InconsistentState(format!(
                "short entry: {} bytes",
                bytes.len()
            )));
        }

        let name_end = bytes[..cap].iter().position(|&b| b == 0).unwrap_or(cap);
        let filename = String::from_utf8_lossy(&bytes[..name_end]).into_owned();

        let status_byte = bytes[cap + 8];
        let status = EntryStatus::from_u8(status_byte).ok_or_else(|| {
            FramfsError::InconsistentState(format!("invalid entry status byte {status_byte:#04x}"))
        })?;

        Ok(FileEntry {
            filename,
            start_addr: u32::from_le_bytes([
                bytes[cap],
                bytes[cap + 1],
                bytes[cap + 2],
                bytes[cap + 3],
            ]),
            length: u32::from_le_bytes([
                bytes[cap + 4],
                bytes[cap + 5],
                bytes[cap + 6],
                bytes[cap + 7],
            ]),
            status,
            file_type: bytes[cap + 9],
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == EntryStatus::Active
    }

    pub fn is_free(&self) -> bool {
        self.status == EntryStatus::Free
    }
}
