//! End-to-end logger scenarios

use framfs::{
    DailyLog, EntryStatus, EventKind, FileStorage, FsConfig, Framfs, FramfsError, MemStorage,
};
use proptest::prelude::*;
use std::sync::Arc;

fn small_config() -> FsConfig {
    FsConfig {
        max_files: 4,
        filename_cap: 8,
        addr_slots: 16,
    }
}

#[test]
fn two_file_logging_scenario() {
    // 2048-byte device, 4 max files, 8-byte filename field.
    let mut fs = Framfs::format(MemStorage::new(2048), small_config()).unwrap();

    fs.create_active("A", 0).unwrap();
    fs.append(b"0123456789").unwrap();
    fs.seal_active().unwrap();
    fs.create_active("B", 0).unwrap();
    fs.append(b"hello").unwrap();

    assert_eq!(fs.list_files(16).unwrap(), vec!["A", "B"]);
    assert_eq!(fs.get_file_size("A").unwrap(), 10);
    assert_eq!(fs.read("A", 0, 10).unwrap(), b"0123456789");
    assert_eq!(fs.get_file_size("B").unwrap(), 5);
    assert_eq!(fs.get_active_filename().unwrap(), "B");

    // "B" starts right where "A" ended.
    let a = fs.get_file_info("A").unwrap();
    let b = fs.get_file_info("B").unwrap();
    assert_eq!(b.start_addr, a.start_addr + a.length);
    assert_eq!(fs.stats().next_data_addr, b.start_addr + b.length);
}

#[test]
fn address_table_full_at_129th_peer() {
    let config = FsConfig {
        max_files: 4,
        filename_cap: 8,
        addr_slots: 128,
    };
    let mut fs = Framfs::format(MemStorage::new(4096), config).unwrap();

    for i in 0..128u32 {
        let addr = [1, 0, 0, 0, (i >> 8) as u8, i as u8];
        assert_eq!(fs.lookup_or_assign(&addr).unwrap(), i as u8);
    }
    assert_eq!(fs.addr_count(), 128);

    assert!(matches!(
        fs.lookup_or_assign(&[2, 0, 0, 0, 0, 0]),
        Err(FramfsError::Full("address table"))
    ));

    // Re-asking for a known peer still works.
    assert_eq!(fs.lookup_or_assign(&[1, 0, 0, 0, 0, 37]).unwrap(), 37);
}

#[test]
fn week_of_daily_logging_on_disk_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logger.img");
    let config = FsConfig {
        max_files: 16,
        filename_cap: 8,
        addr_slots: 32,
    };

    let day = std::cell::Cell::new(240115u32);
    {
        let device = FileStorage::create(&path, 64 * 1024).unwrap();
        let fs = Framfs::format(device, config).unwrap();
        let mut log = DailyLog::new(fs, || day.get());

        for d in 0..7u32 {
            day.set(240115 + d);
            log.append_event(0, EventKind::Boot).unwrap();
            log.append_scan(1, 2, 90, 21, &[([d as u8 + 1, 2, 3, 4, 5, 6], -64)])
                .unwrap();
            log.append_battery(1439, 90 - d as u8).unwrap();
        }
    }

    // Reopen the image cold and audit the week.
    let device = FileStorage::open(&path).unwrap();
    let fs = Framfs::init(device, config).unwrap();

    let files = fs.list_files(16).unwrap();
    assert_eq!(files.len(), 7);
    assert_eq!(files[0], "240115");
    assert_eq!(files[6], "240121");

    for name in &files[..6] {
        assert_eq!(
            fs.get_file_info(name).unwrap().status,
            EntryStatus::Sealed
        );
        // boot (3) + one-peer scan (8) + battery (4)
        assert_eq!(fs.get_file_size(name).unwrap(), 15);
    }
    assert_eq!(fs.get_active_filename().unwrap(), "240121");
    assert_eq!(fs.addr_count(), 7);
}

#[test]
fn sealed_files_never_change() {
    let mut fs = Framfs::format(MemStorage::new(2048), small_config()).unwrap();
    fs.create_active("A", 0).unwrap();
    fs.append(b"frozen").unwrap();
    fs.seal_active().unwrap();

    let before = fs.get_file_info("A").unwrap();
    fs.create_active("B", 0).unwrap();
    fs.append(b"active data").unwrap();

    let after = fs.get_file_info("A").unwrap();
    assert_eq!(before, after);
    assert_eq!(fs.read("A", 0, 6).unwrap(), b"frozen");
}

proptest! {
    #[test]
    fn appended_bytes_read_back_exactly(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..64), 1..20)
    ) {
        let device = Arc::new(MemStorage::new(16 * 1024));
        let mut fs = Framfs::format(device.clone(), small_config()).unwrap();
        fs.create_active("data", 0).unwrap();

        let mut expected = Vec::new();
        for chunk in &chunks {
            fs.append(chunk).unwrap();
            expected.extend_from_slice(chunk);
        }

        prop_assert_eq!(fs.get_file_size("data").unwrap() as usize, expected.len());
        prop_assert_eq!(fs.read("data", 0, expected.len()).unwrap(), expected.clone());

        // The same bytes survive a re-init.
        let fs = Framfs::init(device, small_config()).unwrap();
        prop_assert_eq!(fs.read("data", 0, expected.len()).unwrap(), expected);
    }
}
