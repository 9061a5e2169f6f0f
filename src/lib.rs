//! FRAM File System
//!
//! An append-only filesystem for byte-addressable non-volatile memory (FRAM)
//! in battery-powered sensor loggers.
//!
//! ## Features
//!
//! - **Crash-safe appends**: payload bytes are written before any accounting,
//!   so a power cut at any byte boundary never exposes uninitialized data
//! - **Single active file** with automatic rollover: creating a new file
//!   seals the previous one
//! - **Fixed-layout index**: 16-byte header plus 32-byte entries, explicit
//!   little-endian encoding, no directory hierarchy
//! - **Address table** compressing repeated 6-byte peer identifiers into
//!   1-byte indices for compact scan records
//! - **Daily rotation** driven by an injected clock
//!
//! ## Media layout
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ 0x0000: Header (16 bytes)                   │
//! │  - Magic 0x4653, version, file count        │
//! │  - next_data_addr, total_data_size          │
//! ├─────────────────────────────────────────────┤
//! │ Entry table (max_files × 32 bytes)          │
//! │  - filename, start_addr, length             │
//! │  - status: Free | Active | Sealed           │
//! ├─────────────────────────────────────────────┤
//! │ Address table (addr_slots × 6 bytes)        │
//! │  - peer identifiers, index = slot position  │
//! ├─────────────────────────────────────────────┤
//! │ Data region                                 │
//! │  - file contents, allocated strictly        │
//! │    forward from next_data_addr              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use framfs::{FsConfig, Framfs, MemStorage};
//!
//! let device = MemStorage::new(8192);
//! let mut fs = Framfs::format(device, FsConfig::default()).unwrap();
//!
//! fs.create_active("240115", framfs::FILE_TYPE_SENSOR_LOG).unwrap();
//! fs.append(b"sensor bytes").unwrap();
//! fs.seal_active().unwrap();
//!
//! assert_eq!(fs.read("240115", 0, 12).unwrap(), b"sensor bytes");
//! ```
//!
//! The context is synchronous and single-writer; callers must serialize all
//! operations against one [`Framfs`] value.

pub mod addr_table;
pub mod config;
pub mod daily;
pub mod device;
pub mod entry;
pub mod error;
pub mod fs;
pub mod header;
pub mod records;

// Re-export commonly used types
pub use addr_table::PeerAddr;
pub use config::{FsConfig, ADDR_LEN, ENTRY_LEN, HEADER_LEN};
pub use daily::{date_filename, DailyLog};
pub use device::{FileStorage, MemStorage, Storage};
pub use entry::{EntryStatus, FileEntry, FILE_TYPE_CONFIG, FILE_TYPE_RAW, FILE_TYPE_SENSOR_LOG};
pub use error::{FramfsError, Result};
pub use fs::Framfs;
pub use header::Header;
pub use records::{
    BatteryRecord, EventKind, ScanRecord, ScanSample, SimpleRecord, MAX_SCAN_DEVICES,
    MINUTES_PER_DAY,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Filesystem magic number ("FS")
pub const MAGIC: u16 = header::MAGIC;
