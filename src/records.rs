//! Log record encoding
//!
//! Records are the application-level units written inside a file's byte
//! stream. The filesystem core treats them as opaque; this module is the
//! encoding layer used by the sensor-logging caller.
//!
//! Every record starts with a minute-of-day value (0-1439, high byte first)
//! and a type tag. Tags 0x01..=0x80 double as the device count of a proximity
//! scan record; the remaining tags mark events:
//!
//! ```text
//! 0x00        no activity this minute         (3 bytes)
//! 0x01..=0x80 proximity scan, n devices       (6 + 2n bytes)
//! 0xF1        boot                            (3 bytes)
//! 0xF2        peer connected                  (3 bytes)
//! 0xF3        settings changed                (3 bytes)
//! 0xF4        battery level                   (4 bytes)
//! 0xF5        error                           (3 bytes)
//! ```
//!
//! Scan records reference peers by address-table index, which keeps a
//! per-device sample at 2 bytes instead of 7.

use crate::addr_table::PeerAddr;
use crate::device::Storage;
use crate::error::{FramfsError, Result};
use crate::fs::Framfs;

/// Minutes in a day; valid minute values are below this
pub const MINUTES_PER_DAY: u16 = 1440;

/// Largest device count a scan record can carry
pub const MAX_SCAN_DEVICES: usize = 128;

/// Event markers (type tags outside the scan range)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    NoActivity = 0x00,
    Boot = 0xF1,
    Connected = 0xF2,
    Settings = 0xF3,
    Error = 0xF5,
}

impl EventKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::NoActivity),
            0xF1 => Some(Self::Boot),
            0xF2 => Some(Self::Connected),
            0xF3 => Some(Self::Settings),
            0xF5 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Battery record type tag
pub const RECORD_TYPE_BATTERY: u8 = 0xF4;

fn check_minute(minute: u16) -> Result<()> {
    if minute >= MINUTES_PER_DAY {
        return Err(FramfsError::InvalidArgument(format!(
            "minute {minute} out of range 0..{MINUTES_PER_DAY}"
        )));
    }
    Ok(())
}

/// Minute + event marker, 3 bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleRecord {
    pub minute: u16,
    pub kind: EventKind,
}

impl SimpleRecord {
    pub fn encode(&self) -> Result<[u8; 3]> {
        check_minute(self.minute)?;
        Ok([
            (self.minute >> 8) as u8,
            (self.minute & 0xFF) as u8,
            self.kind as u8,
        ])
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 3 {
            return Err(FramfsError::SizeError(format!(
                "simple record needs 3 bytes, got {}",
                bytes.len()
            )));
        }
        let kind = EventKind::from_u8(bytes[2]).ok_or_else(|| {
            FramfsError::InvalidArgument(format!("unknown event tag {:#04x}", bytes[2]))
        })?;
        Ok(SimpleRecord {
            minute: u16::from(bytes[0]) << 8 | u16::from(bytes[1]),
            kind,
        })
    }
}

/// Minute + battery level, 4 bytes, tag 0xF4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryRecord {
    pub minute: u16,
    /// Percent, 0-100
    pub level: u8,
}

impl BatteryRecord {
    pub fn encode(&self) -> Result<[u8; 4]> {
        check_minute(self.minute)?;
        Ok([
            (self.minute >> 8) as u8,
            (self.minute & 0xFF) as u8,
            RECORD_TYPE_BATTERY,
            self.level,
        ])
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(FramfsError::SizeError(format!(
                "battery record needs 4 bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[2] != RECORD_TYPE_BATTERY {
            return Err(FramfsError::InvalidArgument(format!(
                "expected battery tag {RECORD_TYPE_BATTERY:#04x}, got {:#04x}",
                bytes[2]
            )));
        }
        Ok(BatteryRecord {
            minute: u16::from(bytes[0]) << 8 | u16::from(bytes[1]),
            level: bytes[3],
        })
    }
}

/// One observed peer inside a scan record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSample {
    /// Address-table index of the peer
    pub addr_index: u8,
    /// Signal strength in dBm
    pub rssi: i8,
}

/// Proximity scan record, 6 + 2n bytes
///
/// The type tag is the device count (1..=128). Indices come first, then the
/// RSSI values, so all indices stay in one contiguous run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub minute: u16,
    /// Motion events during this minute
    pub motion_count: u8,
    /// Percent, 0-100
    pub battery_level: u8,
    /// Degrees Celsius
    pub temperature: i8,
    pub samples: Vec<ScanSample>,
}

impl ScanRecord {
    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        6 + 2 * self.samples.len()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        check_minute(self.minute)?;
        if self.samples.is_empty() || self.samples.len() > MAX_SCAN_DEVICES {
            return Err(FramfsError::InvalidArgument(format!(
                "scan record device count {} out of range 1..={MAX_SCAN_DEVICES}",
                self.samples.len()
            )));
        }

        let n = self.samples.len();
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.push((self.minute >> 8) as u8);
        bytes.push((self.minute & 0xFF) as u8);
        bytes.push(n as u8);
        bytes.push(self.motion_count);
        bytes.push(self.battery_level);
        bytes.push(self.temperature as u8);
        for sample in &self.samples {
            bytes.push(sample.addr_index);
        }
        for sample in &self.samples {
            bytes.push(sample.rssi as u8);
        }
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 6 {
            return Err(FramfsError::SizeError(format!(
                "scan record needs at least 6 bytes, got {}",
                bytes.len()
            )));
        }

        let n = bytes[2] as usize;
        if n == 0 || n > MAX_SCAN_DEVICES {
            return Err(FramfsError::InvalidArgument(format!(
                "scan record device count {n} out of range 1..={MAX_SCAN_DEVICES}"
            )));
        }
        let needed = 6 + 2 * n;
        if bytes.len() < needed {
            return Err(FramfsError::SizeError(format!(
                "scan record with {n} devices needs {needed} bytes, got {}",
                bytes.len()
            )));
        }

        let samples = (0..n)
            .map(|i| ScanSample {
                addr_index: bytes[6 + i],
                rssi: bytes[6 + n + i] as i8,
            })
            .collect();

        Ok(ScanRecord {
            minute: u16::from(bytes[0]) << 8 | u16::from(bytes[1]),
            motion_count: bytes[3],
            battery_level: bytes[4],
            temperature: bytes[5] as i8,
            samples,
        })
    }
}

impl<S: Storage> Framfs<S> {
    /// Append an event marker to the active file
    pub fn append_event(&mut self, minute: u16, kind: EventKind) -> Result<()> {
        let record = SimpleRecord { minute, kind };
        self.append(&record.encode()?)
    }

    /// Append a battery level record to the active file
    pub fn append_battery(&mut self, minute: u16, level: u8) -> Result<()> {
        let record = BatteryRecord { minute, level };
        self.append(&record.encode()?)
    }

    /// Append a proximity scan, routing peer addresses through the address
    /// table
    ///
    /// Each `(address, rssi)` pair becomes a 2-byte sample keyed by the
    /// peer's table index. Fails `Full` when the address table runs out of
    /// slots before all peers are assigned.
    pub fn append_scan(
        &mut self,
        minute: u16,
        motion_count: u8,
        battery_level: u8,
        temperature: i8,
        peers: &[(PeerAddr, i8)],
    ) -> Result<()> {
        let mut samples = Vec::with_capacity(peers.len());
        for (addr, rssi) in peers {
            samples.push(ScanSample {
                addr_index: self.lookup_or_assign(addr)?,
                rssi: *rssi,
            });
        }

        let record = ScanRecord {
            minute,
            motion_count,
            battery_level,
            temperature,
            samples,
        };
        self.append(&record.encode()?)
    }
}
