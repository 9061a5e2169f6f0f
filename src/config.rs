//! Filesystem geometry configuration
//!
//! All on-media offsets are derived from the values here, so two builds can
//! only exchange images when their configurations match exactly. `Framfs::init`
//! cross-checks the on-media `max_files` against the config for this reason.

use crate::error::{FramfsError, Result};

/// Size of the filesystem header at address 0
pub const HEADER_LEN: u32 = 16;

/// Size of one file entry slot in the index region
pub const ENTRY_LEN: u32 = 32;

/// Size of one peer address in the address table
pub const ADDR_LEN: usize = 6;

/// Fixed (non-filename) bytes inside an entry: start_addr + length + status +
/// file_type + reserved
const ENTRY_FIXED_LEN: u32 = 12;

/// Filesystem geometry
///
/// Defaults mirror the original sensor-logger deployment: 64 files, a 12-byte
/// filename field, 128 peer address slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsConfig {
    /// Number of entry slots in the index region
    pub max_files: u16,

    /// Width of the filename field inside an entry, including the NUL
    /// terminator. Usable name length is one byte less.
    pub filename_cap: usize,

    /// Number of 6-byte slots in the address table
    pub addr_slots: usize,
}

impl FsConfig {
    /// Validate the geometry
    ///
    /// The filename field must leave room for the fixed entry fields within
    /// the 32-byte slot, and address-table indices must fit in one byte.
    pub fn validate(&self) -> Result<()> {
        if self.max_files == 0 {
            return Err(FramfsError::InvalidArgument(
                "max_files must be at least 1".into(),
            ));
        }
        if self.filename_cap < 2 || self.filename_cap as u32 > ENTRY_LEN - ENTRY_FIXED_LEN {
            return Err(FramfsError::InvalidArgument(format!(
                "filename_cap {} out of range 2..={}",
                self.filename_cap,
                ENTRY_LEN - ENTRY_FIXED_LEN
            )));
        }
        if self.addr_slots == 0 || self.addr_slots > 256 {
            return Err(FramfsError::InvalidArgument(format!(
                "addr_slots {} out of range 1..=256",
                self.addr_slots
            )));
        }
        Ok(())
    }

    /// Media address of entry slot `index`
    pub fn entry_addr(&self, index: u16) -> u32 {
        HEADER_LEN + u32::from(index) * ENTRY_LEN
    }

    /// Media address of the address table
    pub fn addr_table_start(&self) -> u32 {
        HEADER_LEN + u32::from(self.max_files) * ENTRY_LEN
    }

    /// Media address of address-table slot `index`
    pub fn addr_slot_addr(&self, index: u8) -> u32 {
        self.addr_table_start() + u32::from(index) * ADDR_LEN as u32
    }

    /// First address of the data region
    pub fn data_start(&self) -> u32 {
        self.addr_table_start() + self.addr_slots as u32 * ADDR_LEN as u32
    }
}

impl Default for FsConfig {
    fn default() -> Self {
        FsConfig {
            max_files: 64,
            filename_cap: 12,
            addr_slots: 128,
        }
    }
}
