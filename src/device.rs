//! Storage device abstraction
//!
//! FRAM is byte addressable: reads and writes go straight to an address with
//! no block erase and no multi-byte atomicity. Everything the filesystem needs
//! from a device is captured by [`Storage`]; the crash-ordering rules in
//! [`crate::fs`] are built on top of that contract.
//!
//! Two backends are provided: [`MemStorage`] for tests and host-side tooling,
//! and [`FileStorage`] for working with device images on disk. Retry policy
//! for transient faults belongs to the device, not to the filesystem layer.

use crate::error::{FramfsError, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Byte-addressable synchronous storage
pub trait Storage {
    /// Read `buf.len()` bytes starting at `addr`
    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `addr`
    fn write(&self, addr: u32, data: &[u8]) -> Result<()>;

    /// Fixed device capacity in bytes
    fn capacity(&self) -> u32;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<()> {
        (**self).read(addr, buf)
    }

    fn write(&self, addr: u32, data: &[u8]) -> Result<()> {
        (**self).write(addr, data)
    }

    fn capacity(&self) -> u32 {
        (**self).capacity()
    }
}

fn check_range(capacity: u32, addr: u32, len: usize) -> Result<()> {
    let end = u64::from(addr) + len as u64;
    if end > u64::from(capacity) {
        return Err(FramfsError::SizeError(format!(
            "access [{addr}, {end}) exceeds device capacity {capacity}"
        )));
    }
    Ok(())
}

/// In-memory storage device
///
/// Uses interior mutability so reads can share the device.
pub struct MemStorage {
    bytes: Mutex<Vec<u8>>,
}

impl MemStorage {
    /// Create a device of `capacity` bytes, zero-filled
    pub fn new(capacity: u32) -> Self {
        MemStorage {
            bytes: Mutex::new(vec![0u8; capacity as usize]),
        }
    }
}

impl Storage for MemStorage {
    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let bytes = self.bytes.lock();
        check_range(bytes.len() as u32, addr, buf.len())?;
        let start = addr as usize;
        buf.copy_from_slice(&bytes[start..start + buf.len()]);
        Ok(())
    }

    fn write(&self, addr: u32, data: &[u8]) -> Result<()> {
        let mut bytes = self.bytes.lock();
        check_range(bytes.len() as u32, addr, data.len())?;
        let start = addr as usize;
        bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn capacity(&self) -> u32 {
        self.bytes.lock().len() as u32
    }
}

/// Disk-backed device image
pub struct FileStorage {
    file: Mutex<File>,
    path: PathBuf,
    capacity: u32,
}

impl FileStorage {
    /// Create a new image of `capacity` bytes, zero-filled
    pub fn create<P: AsRef<Path>>(path: P, capacity: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(u64::from(capacity))?;

        Ok(FileStorage {
            file: Mutex::new(file),
            path: path.as_ref().to_path_buf(),
            capacity,
        })
    }

    /// Open an existing image; capacity is the current file length
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        let capacity = u32::try_from(len).map_err(|_| {
            FramfsError::InvalidArgument(format!("image too large for a 32-bit device: {len}"))
        })?;

        Ok(FileStorage {
            file: Mutex::new(file),
            path: path.as_ref().to_path_buf(),
            capacity,
        })
    }

    /// Path of the backing image
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Storage for FileStorage {
    fn read(&self, addr: u32, buf: &mut [u8]) -> Result<()> {
        check_range(self.capacity, addr, buf.len())?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(u64::from(addr)))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write(&self, addr: u32, data: &[u8]) -> Result<()> {
        check_range(self.capacity, addr, data.len())?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(u64::from(addr)))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }
}
