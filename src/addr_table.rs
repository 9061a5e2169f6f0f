//! Peer address table
//!
//! Repeated 6-byte peer identifiers are compressed to 1-byte indices so scan
//! records stay compact. The table lives between the entry table and the data
//! region: `addr_slots` raw 6-byte slots, no table header. A slot of all
//! zeroes is free, which is why the all-zero identifier is rejected as input.
//!
//! Indices are assigned monotonically on first sight and never reused or
//! evicted. The table is logically independent of the file entries: it
//! survives file creation and sealing and is only reset by `format`. A newly
//! assigned slot is persisted immediately, before any record referencing its
//! index can be appended, so a crash cannot orphan an index.

use crate::config::ADDR_LEN;
use crate::device::Storage;
use crate::error::{FramfsError, Result};
use crate::fs::Framfs;
use tracing::debug;

/// A peer identifier as it appears on the radio
pub type PeerAddr = [u8; ADDR_LEN];

const FREE_SLOT: PeerAddr = [0u8; ADDR_LEN];

impl<S: Storage> Framfs<S> {
    /// Return the index for `addr`, assigning the next free slot on first
    /// sight
    ///
    /// Fails `Full` once all slots are assigned; whether to then drop the
    /// peer or fall back to uncompressed encoding is the caller's policy.
    pub fn lookup_or_assign(&mut self, addr: &PeerAddr) -> Result<u8> {
        if let Some(index) = self.find_addr(addr)? {
            return Ok(index);
        }

        if usize::from(self.addr_count) >= self.config().addr_slots {
            return Err(FramfsError::Full("address table"));
        }

        let index = self.addr_count as u8;
        self.device().write(self.config().addr_slot_addr(index), addr)?;
        self.addr_count += 1;

        debug!(index, "assigned address-table slot");
        Ok(index)
    }

    /// Look up `addr` without assigning
    pub fn find_addr(&self, addr: &PeerAddr) -> Result<Option<u8>> {
        if addr == &FREE_SLOT {
            return Err(FramfsError::InvalidArgument(
                "all-zero peer address is reserved".into(),
            ));
        }

        for i in 0..self.addr_count {
            if self.read_addr_slot(i as u8)? == *addr {
                return Ok(Some(i as u8));
            }
        }
        Ok(None)
    }

    /// Identifier stored at `index`
    pub fn addr_by_index(&self, index: u8) -> Result<PeerAddr> {
        if u16::from(index) >= self.addr_count {
            return Err(FramfsError::NotFound(format!(
                "address-table index {index} (only {} assigned)",
                self.addr_count
            )));
        }
        self.read_addr_slot(index)
    }

    /// Number of assigned slots
    pub fn addr_count(&self) -> u16 {
        self.addr_count
    }

    /// Recover the assigned-slot count by scanning for the first free slot
    ///
    /// Slots are assigned in order and never reclaimed, so the first all-zero
    /// slot marks the end of the assigned region.
    pub(crate) fn recover_addr_count(&self) -> Result<u16> {
        for i in 0..self.config().addr_slots {
            if self.read_addr_slot(i as u8)? == FREE_SLOT {
                return Ok(i as u16);
            }
        }
        Ok(self.config().addr_slots as u16)
    }

    fn read_addr_slot(&self, index: u8) -> Result<PeerAddr> {
        let mut slot = FREE_SLOT;
        self.device()
            .read(self.config().addr_slot_addr(index), &mut slot)?;
        Ok(slot)
    }
}
