//! Daily log rotation
//!
//! Sensor loggers write one file per day, named after the date. [`DailyLog`]
//! wraps a [`Framfs`] with an injected clock and rolls the active file
//! whenever the date changes: the old file is sealed and a new one created
//! under the new date's name. The clock returns a YYMMDD date code (for
//! example 240115); the filename is its zero-padded 6-digit form.
//!
//! Filenames are never reused. If a sealed file for today's date already
//! exists (the date went backwards, or the file was sealed out-of-band), the
//! roll surfaces `Exists` without touching the sealed file or the currently
//! active one; appends resume as soon as the clock returns a usable date.

use crate::addr_table::PeerAddr;
use crate::device::Storage;
use crate::entry::FILE_TYPE_SENSOR_LOG;
use crate::error::Result;
use crate::fs::Framfs;
use crate::records::EventKind;
use tracing::info;

/// Filename for a YYMMDD date code
pub fn date_filename(date: u32) -> String {
    format!("{:06}", date % 1_000_000)
}

/// Clock-driven daily rotation over a filesystem
pub struct DailyLog<S: Storage, C: FnMut() -> u32> {
    fs: Framfs<S>,
    clock: C,
    current_date: Option<u32>,
}

impl<S: Storage, C: FnMut() -> u32> DailyLog<S, C> {
    /// Wrap `fs`, deferring file creation until the first append
    pub fn new(fs: Framfs<S>, clock: C) -> Self {
        DailyLog {
            fs,
            clock,
            current_date: None,
        }
    }

    /// Make sure today's file is the active one, rolling if needed
    ///
    /// Adopts an already-active file carrying today's name, which is the
    /// normal case after a reboot mid-day.
    pub fn ensure_current_file(&mut self) -> Result<()> {
        let date = (self.clock)();
        if self.current_date == Some(date) && self.fs.has_active_file() {
            return Ok(());
        }

        let filename = date_filename(date);
        if self.fs.has_active_file() {
            if self.fs.get_active_filename()? == filename {
                self.current_date = Some(date);
                return Ok(());
            }
            info!(%filename, "date changed, rolling log file");
        }

        // The rollover inside create_active seals the previous file only
        // after the name checks pass, so a failed roll leaves it appendable.
        self.fs.create_active(&filename, FILE_TYPE_SENSOR_LOG)?;
        self.current_date = Some(date);
        Ok(())
    }

    /// Append raw bytes to today's file
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_current_file()?;
        self.fs.append(data)
    }

    /// Append an event marker to today's file
    pub fn append_event(&mut self, minute: u16, kind: EventKind) -> Result<()> {
        self.ensure_current_file()?;
        self.fs.append_event(minute, kind)
    }

    /// Append a battery record to today's file
    pub fn append_battery(&mut self, minute: u16, level: u8) -> Result<()> {
        self.ensure_current_file()?;
        self.fs.append_battery(minute, level)
    }

    /// Append a proximity scan to today's file
    pub fn append_scan(
        &mut self,
        minute: u16,
        motion_count: u8,
        battery_level: u8,
        temperature: i8,
        peers: &[(PeerAddr, i8)],
    ) -> Result<()> {
        self.ensure_current_file()?;
        self.fs
            .append_scan(minute, motion_count, battery_level, temperature, peers)
    }

    /// Name of the file appends currently go to, if one is active
    pub fn current_filename(&self) -> Option<String> {
        if !self.fs.has_active_file() {
            return None;
        }
        self.current_date.map(date_filename)
    }

    /// The wrapped filesystem
    pub fn fs(&self) -> &Framfs<S> {
        &self.fs
    }

    /// Unwrap back into the filesystem
    pub fn into_inner(self) -> Framfs<S> {
        self.fs
    }
}
