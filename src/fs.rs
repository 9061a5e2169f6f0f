//! Filesystem core
//!
//! [`Framfs`] owns the header, the entry table, and the single-active-file
//! invariant. All mutation funnels through it so the header and the index can
//! never disagree about `next_data_addr`.
//!
//! Crash safety rests on two ordering rules, both inherited from the media
//! having no multi-byte write atomicity:
//!
//! - `create_active` writes the new entry record before incrementing
//!   `file_count`. A crash in between leaves an entry that exists physically
//!   but is not counted; the next `init` ignores it.
//! - `append` writes payload bytes before updating the entry length and the
//!   header accounting. After any crash the accounted length never exceeds
//!   the bytes durably written, so a reader cannot observe uninitialized
//!   data. The tail of an in-flight append may be lost; the next append
//!   overwrites it.
//!
//! The context is synchronous and single-writer: the caller must serialize
//! all calls against one `Framfs` value.

use crate::config::{FsConfig, ADDR_LEN, ENTRY_LEN, HEADER_LEN};
use crate::device::Storage;
use crate::entry::{EntryStatus, FileEntry};
use crate::error::{FramfsError, Result};
use crate::header::Header;
use tracing::{debug, info, warn};

/// Append-only filesystem over a byte-addressable storage device
pub struct Framfs<S: Storage> {
    device: S,
    config: FsConfig,
    /// Cached header, refreshed after every mutating operation
    header: Header,
    /// Index of the Active entry, if any
    active_index: Option<u16>,
    /// Assigned address-table slots (recovered at init, maintained in memory)
    pub(crate) addr_count: u16,
}

impl<S: Storage> Framfs<S> {
    /// Open an existing filesystem image
    ///
    /// Fails with `CorruptHeader` on bad magic/version or when the image
    /// geometry does not match `config`. Never formats on failure; that
    /// decision stays with the caller.
    pub fn init(device: S, config: FsConfig) -> Result<Self> {
        config.validate()?;
        Self::check_device_fits(&device, &config)?;

        let mut buf = [0u8; HEADER_LEN as usize];
        device.read(0, &mut buf)?;
        let header = Header::from_bytes(&buf)?;

        if header.max_files != config.max_files {
            return Err(FramfsError::CorruptHeader(format!(
                "image formatted with max_files {} but config says {}",
                header.max_files, config.max_files
            )));
        }
        if header.next_data_addr < config.data_start() {
            return Err(FramfsError::CorruptHeader(format!(
                "next_data_addr {:#x} inside the index region (data starts at {:#x})",
                header.next_data_addr,
                config.data_start()
            )));
        }

        let mut fs = Framfs {
            device,
            config,
            header,
            active_index: None,
            addr_count: 0,
        };

        fs.active_index = fs.find_active()?;
        fs.addr_count = fs.recover_addr_count()?;

        info!(
            files = fs.header.file_count,
            next_data_addr = fs.header.next_data_addr,
            peers = fs.addr_count,
            "filesystem initialized"
        );
        Ok(fs)
    }

    /// Format the device and open the fresh filesystem
    ///
    /// Destroys all prior files and the address table. This is an explicit
    /// caller-invoked operation, never triggered by a failed `init`.
    pub fn format(device: S, config: FsConfig) -> Result<Self> {
        config.validate()?;
        Self::check_device_fits(&device, &config)?;

        info!(
            max_files = config.max_files,
            data_start = config.data_start(),
            "formatting filesystem"
        );

        let header = Header::new(config.max_files, config.data_start());
        device.write(0, &header.to_bytes())?;

        let zero_entry = [0u8; ENTRY_LEN as usize];
        for i in 0..config.max_files {
            device.write(config.entry_addr(i), &zero_entry)?;
        }

        let zero_slot = [0u8; ADDR_LEN];
        for i in 0..config.addr_slots {
            device.write(config.addr_slot_addr(i as u8), &zero_slot)?;
        }

        Ok(Framfs {
            device,
            config,
            header,
            active_index: None,
            addr_count: 0,
        })
    }

    /// Snapshot of the cached header
    ///
    /// Reflects the last durably committed state, since the cache is
    /// refreshed after every mutating operation.
    pub fn stats(&self) -> Header {
        self.header
    }

    /// Geometry this filesystem was opened with
    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    // -------------------------------------------------------------------
    // Active-file writer
    // -------------------------------------------------------------------

    /// Create a new Active file, sealing any current one
    ///
    /// The new entry record is written before `file_count` is incremented,
    /// so a crash in between leaves the entry invisible rather than
    /// corrupting the accounting.
    pub fn create_active(&mut self, filename: &str, file_type: u8) -> Result<()> {
        self.validate_filename(filename)?;

        if self.find_file(filename)?.is_some() {
            return Err(FramfsError::Exists(filename.to_string()));
        }
        if self.header.file_count >= self.config.max_files {
            warn!(
                files = self.header.file_count,
                max = self.config.max_files,
                "entry table exhausted"
            );
            return Err(FramfsError::Full("entry table"));
        }

        // Automatic rollover: at most one Active file system-wide.
        if self.active_index.is_some() {
            self.seal_active()?;
        }

        let index = self.header.file_count;
        let entry = FileEntry::new_active(filename, self.header.next_data_addr, file_type);
        self.write_entry(index, &entry)?;

        self.header.file_count += 1;
        self.write_header()?;

        self.active_index = Some(index);
        info!(
            filename,
            index,
            start_addr = entry.start_addr,
            "created active file"
        );
        Ok(())
    }

    /// Append bytes to the Active file
    ///
    /// Payload bytes are written before any accounting is updated.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(FramfsError::InvalidArgument("empty append".into()));
        }

        let index = self.active_index.ok_or(FramfsError::NoActiveFile)?;
        let mut entry = self.read_entry(index)?;
        if !entry.is_active() {
            return Err(FramfsError::ReadOnly(entry.filename));
        }

        let write_addr = entry.start_addr + entry.length;
        let end = u64::from(write_addr) + data.len() as u64;
        if end > u64::from(self.device.capacity()) {
            return Err(FramfsError::SizeError(format!(
                "append of {} bytes at {:#x} exceeds device capacity {}",
                data.len(),
                write_addr,
                self.device.capacity()
            )));
        }

        self.device.write(write_addr, data)?;

        entry.length += data.len() as u32;
        self.write_entry(index, &entry)?;

        self.header.next_data_addr = write_addr + data.len() as u32;
        self.header.total_data_size += data.len() as u32;
        self.write_header()?;

        debug!(
            filename = %entry.filename,
            appended = data.len(),
            total = entry.length,
            "appended to active file"
        );
        Ok(())
    }

    /// Seal the Active file, freezing its length
    pub fn seal_active(&mut self) -> Result<()> {
        let index = self.active_index.ok_or(FramfsError::NoActiveFile)?;
        let mut entry = self.read_entry(index)?;

        entry.status = EntryStatus::Sealed;
        self.write_entry(index, &entry)?;
        self.active_index = None;

        info!(filename = %entry.filename, length = entry.length, "sealed file");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Query layer
    // -------------------------------------------------------------------

    /// Read `length` bytes from `filename` starting at `offset`
    ///
    /// Reading the Active file returns only the prefix durably appended so
    /// far; `offset + length` past the accounted length is a `SizeError`.
    pub fn read(&self, filename: &str, offset: u32, length: usize) -> Result<Vec<u8>> {
        let (_, entry) = self
            .find_file(filename)?
            .ok_or_else(|| FramfsError::NotFound(filename.to_string()))?;

        let end = u64::from(offset) + length as u64;
        if end > u64::from(entry.length) {
            return Err(FramfsError::SizeError(format!(
                "read [{offset}, {end}) beyond file length {}",
                entry.length
            )));
        }

        let mut buf = vec![0u8; length];
        self.device.read(entry.start_addr + offset, &mut buf)?;
        debug!(filename, offset, length, "read file range");
        Ok(buf)
    }

    /// Current length of `filename` in bytes
    pub fn get_file_size(&self, filename: &str) -> Result<u32> {
        Ok(self.get_file_info(filename)?.length)
    }

    /// Full entry snapshot for `filename`
    pub fn get_file_info(&self, filename: &str) -> Result<FileEntry> {
        self.find_file(filename)?
            .map(|(_, entry)| entry)
            .ok_or_else(|| FramfsError::NotFound(filename.to_string()))
    }

    /// Filenames of all files in creation order, capped at `max`
    pub fn list_files(&self, max: usize) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for i in 0..self.header.file_count {
            if names.len() >= max {
                break;
            }
            let entry = self.read_entry(i)?;
            if entry.is_free() {
                warn!(index = i, "counted entry slot is free, skipping");
                continue;
            }
            names.push(entry.filename);
        }
        Ok(names)
    }

    /// Name of the Active file
    pub fn get_active_filename(&self) -> Result<String> {
        let index = self.active_index.ok_or(FramfsError::NoActiveFile)?;
        Ok(self.read_entry(index)?.filename)
    }

    /// Whether a file is currently Active
    pub fn has_active_file(&self) -> bool {
        self.active_index.is_some()
    }

    // -------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------

    fn check_device_fits(device: &S, config: &FsConfig) -> Result<()> {
        if config.data_start() > device.capacity() {
            return Err(FramfsError::InvalidArgument(format!(
                "device capacity {} cannot hold the {}-byte index region",
                device.capacity(),
                config.data_start()
            )));
        }
        Ok(())
    }

    fn validate_filename(&self, filename: &str) -> Result<()> {
        if filename.is_empty() {
            return Err(FramfsError::InvalidArgument("empty filename".into()));
        }
        if filename.len() >= self.config.filename_cap {
            return Err(FramfsError::InvalidArgument(format!(
                "filename '{}' longer than {} bytes",
                filename,
                self.config.filename_cap - 1
            )));
        }
        if filename.as_bytes().contains(&0) {
            return Err(FramfsError::InvalidArgument(
                "filename contains NUL".into(),
            ));
        }
        Ok(())
    }

    fn write_header(&self) -> Result<()> {
        self.device.write(0, &self.header.to_bytes())
    }

    pub(crate) fn read_entry(&self, index: u16) -> Result<FileEntry> {
        let mut buf = [0u8; ENTRY_LEN as usize];
        self.device.read(self.config.entry_addr(index), &mut buf)?;
        FileEntry::from_bytes(&buf, self.config.filename_cap)
    }

    fn write_entry(&self, index: u16, entry: &FileEntry) -> Result<()> {
        let bytes = entry.to_bytes(self.config.filename_cap)?;
        self.device.write(self.config.entry_addr(index), &bytes)
    }

    /// Find a counted, non-Free entry by exact name
    fn find_file(&self, filename: &str) -> Result<Option<(u16, FileEntry)>> {
        for i in 0..self.header.file_count {
            let entry = self.read_entry(i)?;
            if !entry.is_free() && entry.filename == filename {
                return Ok(Some((i, entry)));
            }
        }
        Ok(None)
    }

    /// Scan counted entries for the single Active one
    fn find_active(&self) -> Result<Option<u16>> {
        let mut active = None;
        for i in 0..self.header.file_count {
            let entry = self.read_entry(i)?;
            if entry.is_active() {
                if let Some(first) = active {
                    return Err(FramfsError::InconsistentState(format!(
                        "two active entries: index {first} and {i}"
                    )));
                }
                active = Some(i);
            }
        }
        Ok(active)
    }

    pub(crate) fn device(&self) -> &S {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemStorage;
    use crate::entry::FILE_TYPE_SENSOR_LOG;

    fn small_config() -> FsConfig {
        FsConfig {
            max_files: 4,
            filename_cap: 8,
            addr_slots: 16,
        }
    }

    fn small_fs() -> Framfs<MemStorage> {
        Framfs::format(MemStorage::new(2048), small_config()).unwrap()
    }

    #[test]
    fn test_format_stats() {
        let fs = small_fs();
        let stats = fs.stats();
        assert_eq!(stats.file_count, 0);
        assert_eq!(stats.next_data_addr, small_config().data_start());
        assert_eq!(stats.total_data_size, 0);
    }

    #[test]
    fn test_format_overwrites_garbage() {
        let device = MemStorage::new(2048);
        device.write(0, &[0xAB; 512]).unwrap();

        let fs = Framfs::format(device, small_config()).unwrap();
        assert_eq!(fs.stats().file_count, 0);
        assert_eq!(fs.list_files(16).unwrap().len(), 0);
    }

    #[test]
    fn test_init_on_blank_device_fails() {
        let err = Framfs::init(MemStorage::new(2048), small_config())
            .err()
            .unwrap();
        assert!(matches!(err, FramfsError::CorruptHeader(_)));
    }

    #[test]
    fn test_init_rejects_geometry_mismatch() {
        let device = std::sync::Arc::new(MemStorage::new(4096));
        Framfs::format(device.clone(), small_config()).unwrap();

        let other = FsConfig {
            max_files: 8,
            ..small_config()
        };
        assert!(matches!(
            Framfs::init(device, other),
            Err(FramfsError::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_create_append_read() {
        let mut fs = small_fs();
        fs.create_active("A", 0).unwrap();
        fs.append(b"0123456789").unwrap();

        assert_eq!(fs.get_file_size("A").unwrap(), 10);
        assert_eq!(fs.read("A", 0, 10).unwrap(), b"0123456789");
        assert_eq!(fs.read("A", 3, 4).unwrap(), b"3456");
    }

    #[test]
    fn test_append_accumulates() {
        let mut fs = small_fs();
        fs.create_active("log", 0).unwrap();
        fs.append(b"abc").unwrap();
        fs.append(b"def").unwrap();
        fs.append(b"g").unwrap();

        assert_eq!(fs.read("log", 0, 7).unwrap(), b"abcdefg");
        let stats = fs.stats();
        assert_eq!(stats.total_data_size, 7);
        assert_eq!(stats.next_data_addr, small_config().data_start() + 7);
    }

    #[test]
    fn test_read_beyond_length_fails() {
        let mut fs = small_fs();
        fs.create_active("A", 0).unwrap();
        fs.append(b"hello").unwrap();

        assert!(matches!(
            fs.read("A", 0, 6),
            Err(FramfsError::SizeError(_))
        ));
        assert!(matches!(
            fs.read("A", 5, 1),
            Err(FramfsError::SizeError(_))
        ));
        // Zero-length read at the end is allowed.
        assert_eq!(fs.read("A", 5, 0).unwrap(), b"");
    }

    #[test]
    fn test_rollover_seals_previous() {
        let mut fs = small_fs();
        fs.create_active("A", FILE_TYPE_SENSOR_LOG).unwrap();
        fs.append(b"0123456789").unwrap();
        fs.create_active("B", FILE_TYPE_SENSOR_LOG).unwrap();

        let info = fs.get_file_info("A").unwrap();
        assert_eq!(info.status, EntryStatus::Sealed);
        assert_eq!(info.length, 10);
        assert_eq!(fs.get_active_filename().unwrap(), "B");
    }

    #[test]
    fn test_duplicate_name_fails() {
        let mut fs = small_fs();
        fs.create_active("A", 0).unwrap();
        assert!(matches!(
            fs.create_active("A", 0),
            Err(FramfsError::Exists(_))
        ));

        // Sealed files keep their name reserved too.
        fs.seal_active().unwrap();
        assert!(matches!(
            fs.create_active("A", 0),
            Err(FramfsError::Exists(_))
        ));
    }

    #[test]
    fn test_entry_table_full() {
        let mut fs = small_fs();
        for name in ["f0", "f1", "f2", "f3"] {
            fs.create_active(name, 0).unwrap();
        }
        assert!(matches!(
            fs.create_active("f4", 0),
            Err(FramfsError::Full("entry table"))
        ));
    }

    #[test]
    fn test_append_without_active_fails() {
        let mut fs = small_fs();
        assert!(matches!(fs.append(b"x"), Err(FramfsError::NoActiveFile)));

        fs.create_active("A", 0).unwrap();
        fs.seal_active().unwrap();
        assert!(matches!(fs.append(b"x"), Err(FramfsError::NoActiveFile)));
    }

    #[test]
    fn test_seal_without_active_fails() {
        let mut fs = small_fs();
        assert!(matches!(fs.seal_active(), Err(FramfsError::NoActiveFile)));
    }

    #[test]
    fn test_append_beyond_capacity_fails() {
        let mut fs = small_fs();
        fs.create_active("big", 0).unwrap();
        let room = 2048 - small_config().data_start() as usize;
        fs.append(&vec![0x55u8; room]).unwrap();
        assert!(matches!(
            fs.append(b"x"),
            Err(FramfsError::SizeError(_))
        ));
    }

    #[test]
    fn test_invalid_filenames() {
        let mut fs = small_fs();
        assert!(matches!(
            fs.create_active("", 0),
            Err(FramfsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.create_active("12345678", 0),
            Err(FramfsError::InvalidArgument(_))
        ));
        assert!(matches!(
            fs.create_active("a\0b", 0),
            Err(FramfsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_list_files_order_and_cap() {
        let mut fs = small_fs();
        fs.create_active("A", 0).unwrap();
        fs.create_active("B", 0).unwrap();
        fs.create_active("C", 0).unwrap();

        assert_eq!(fs.list_files(16).unwrap(), vec!["A", "B", "C"]);
        assert_eq!(fs.list_files(2).unwrap(), vec!["A", "B"]);
        assert_eq!(small_fs().list_files(16).unwrap().len(), 0);
    }

    #[test]
    fn test_init_rejects_two_active_entries() {
        let device = std::sync::Arc::new(MemStorage::new(2048));
        {
            let mut fs = Framfs::format(device.clone(), small_config()).unwrap();
            fs.create_active("A", 0).unwrap();
            fs.create_active("B", 0).unwrap();
        }

        // Stamp the sealed entry back to Active directly on the media.
        let config = small_config();
        let status_addr = config.entry_addr(0) + config.filename_cap as u32 + 8;
        device
            .write(status_addr, &[EntryStatus::Active as u8])
            .unwrap();

        assert!(matches!(
            Framfs::init(device, config),
            Err(FramfsError::InconsistentState(_))
        ));
    }

    #[test]
    fn test_reinit_recovers_active_file() {
        let device = std::sync::Arc::new(MemStorage::new(2048));
        {
            let mut fs = Framfs::format(device.clone(), small_config()).unwrap();
            fs.create_active("A", 0).unwrap();
            fs.append(b"hello").unwrap();
        }

        let mut fs = Framfs::init(device, small_config()).unwrap();
        assert_eq!(fs.get_active_filename().unwrap(), "A");
        fs.append(b" world").unwrap();
        assert_eq!(fs.read("A", 0, 11).unwrap(), b"hello world");
    }

    #[test]
    fn test_empty_append_rejected() {
        let mut fs = small_fs();
        fs.create_active("A", 0).unwrap();
        assert!(matches!(
            fs.append(b""),
            Err(FramfsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_device_too_small_for_index() {
        let config = FsConfig::default(); // needs 2832 bytes of index
        assert!(matches!(
            Framfs::format(MemStorage::new(1024), config),
            Err(FramfsError::InvalidArgument(_))
        ));
    }
}
