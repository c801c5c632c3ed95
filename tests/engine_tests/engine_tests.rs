//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/set/delete operations and their not-found errors
//! - In-place vs. append value placement
//! - Recovery from the index log on reopen
//! - Memory and pure in-memory store modes
//! - Batch operations, backup, delete-file, close
//! - Concurrent access and the background syncer

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use twinlog::config::{Config, StoreMode};
use twinlog::engine::Engine;
use twinlog::index::IndexRecord;
use twinlog::{Key, TwinlogError};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Point {
    x: i64,
    y: i64,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_engine() -> (TempDir, PathBuf, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("db");
    let engine = Engine::open_path(&path).unwrap();
    (temp_dir, path, engine)
}

fn memory_config(path: impl Into<PathBuf>) -> Config {
    Config::builder()
        .path(path)
        .store_mode(StoreMode::Memory)
        .build()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_files_and_directories() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("dir").join("db");

    let _engine = Engine::open_path(&path).unwrap();

    assert!(path.exists());
    assert!(temp_dir.path().join("nested/dir/db.idx").exists());
}

#[test]
fn test_open_empty_path_requires_memory_mode() {
    let result = Engine::open(Config::default());
    assert!(matches!(result, Err(TwinlogError::Config(_))));
}

#[test]
fn test_store_mode_codes() {
    assert_eq!(StoreMode::try_from(0u8).unwrap(), StoreMode::Disk);
    assert_eq!(StoreMode::try_from(2u8).unwrap(), StoreMode::Memory);
    assert!(matches!(StoreMode::try_from(1u8), Err(TwinlogError::Config(_))));
    assert_eq!(StoreMode::Memory.code(), 2);
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_set_get() {
    let (_temp, _path, engine) = setup_temp_engine();

    engine.set("hello", "world").unwrap();

    assert_eq!(engine.get("hello").unwrap(), b"world".to_vec());
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, _path, engine) = setup_temp_engine();

    let result = engine.get("nonexistent");

    assert!(matches!(result, Err(TwinlogError::KeyNotFound)));
}

#[test]
fn test_engine_set_overwrite() {
    let (_temp, _path, engine) = setup_temp_engine();

    engine.set("key", "value1").unwrap();
    engine.set("key", "value2").unwrap();

    assert_eq!(engine.get("key").unwrap(), b"value2".to_vec());
    assert_eq!(engine.count().unwrap(), 1);
}

#[test]
fn test_engine_delete() {
    let (_temp, _path, engine) = setup_temp_engine();

    engine.set("key", "value").unwrap();
    assert!(engine.has("key").unwrap());

    engine.delete("key").unwrap();

    assert!(!engine.has("key").unwrap());
    assert!(matches!(engine.get("key"), Err(TwinlogError::KeyNotFound)));
    assert!(engine.keys(None, 0, 0, true).unwrap().is_empty());
}

#[test]
fn test_engine_delete_nonexistent_key() {
    let (_temp, _path, engine) = setup_temp_engine();

    let result = engine.delete("nonexistent");

    assert!(matches!(result, Err(TwinlogError::KeyNotFound)));
}

#[test]
fn test_engine_scalar_keys() {
    let (_temp, _path, engine) = setup_temp_engine();

    engine.set(1i64, "one").unwrap();
    engine.set(1u32, "one-u32").unwrap();
    engine.set(true, "yes").unwrap();

    assert_eq!(engine.get(1i64).unwrap(), b"one".to_vec());
    assert_eq!(engine.get(1u32).unwrap(), b"one-u32".to_vec());
    assert_eq!(engine.get(true).unwrap(), b"yes".to_vec());
    assert_eq!(engine.count().unwrap(), 3);
}

#[test]
fn test_engine_typed_values() {
    let (_temp, _path, engine) = setup_temp_engine();

    for i in (0..=100i64).rev() {
        engine.set_as(i, &Point { x: i, y: i }).unwrap();
    }

    let point: Point = engine.get_as(8i64).unwrap();
    assert_eq!(point, Point { x: 8, y: 8 });

    let keys = engine.keys(Some(Key::from(7i64)), 2, 0, true).unwrap();
    let points: Vec<Point> = keys
        .into_iter()
        .map(|k| engine.get_as(k).unwrap())
        .collect();
    assert_eq!(points, vec![Point { x: 8, y: 8 }, Point { x: 9, y: 9 }]);
}

#[test]
fn test_engine_structured_keys() {
    let (_temp, _path, engine) = setup_temp_engine();
    let key = Key::structured(&("user", 42u32)).unwrap();

    engine.set(key.clone(), "profile").unwrap();

    assert_eq!(engine.get(key).unwrap(), b"profile".to_vec());
}

#[test]
fn test_engine_empty_value() {
    let (_temp, path, engine) = setup_temp_engine();

    engine.set("empty", b"").unwrap();
    assert_eq!(engine.get("empty").unwrap(), Vec::<u8>::new());

    engine.close().unwrap();
    let engine = Engine::open_path(&path).unwrap();
    assert_eq!(engine.get("empty").unwrap(), Vec::<u8>::new());
}

#[test]
fn test_engine_oversized_key_touches_no_file() {
    let (_temp, _path, engine) = setup_temp_engine();

    let result = engine.set(vec![b'k'; 70_000], "v");

    assert!(matches!(result, Err(TwinlogError::Encoding(_))));
    assert_eq!(engine.value_log_len(), Some(0));
    assert_eq!(engine.index_log_len(), Some(0));
}

// =============================================================================
// Value Placement Tests
// =============================================================================

#[test]
fn test_shorter_value_overwrites_in_place() {
    let (_temp, _path, engine) = setup_temp_engine();
    engine.set("other", "xxxx").unwrap();
    engine.set("k", "hello world").unwrap();
    let before = engine.entry("k").unwrap();
    let value_len = engine.value_log_len().unwrap();
    let index_len = engine.index_log_len().unwrap();

    engine.set("k", "hi").unwrap();

    let after = engine.entry("k").unwrap();
    assert_eq!(after.value_offset, before.value_offset);
    assert_eq!(after.record_offset, before.record_offset);
    assert_eq!(after.value_size, 2);
    assert_eq!(engine.value_log_len().unwrap(), value_len);
    assert_eq!(engine.index_log_len().unwrap(), index_len);
    assert_eq!(engine.get("k").unwrap(), b"hi".to_vec());
    assert_eq!(engine.get("other").unwrap(), b"xxxx".to_vec());
}

#[test]
fn test_equal_length_value_overwrites_in_place() {
    let (_temp, _path, engine) = setup_temp_engine();
    engine.set("k", "aaaa").unwrap();
    let value_len = engine.value_log_len().unwrap();

    engine.set("k", "bbbb").unwrap();

    assert_eq!(engine.value_log_len().unwrap(), value_len);
    assert_eq!(engine.get("k").unwrap(), b"bbbb".to_vec());
}

#[test]
fn test_longer_value_is_appended() {
    let (_temp, _path, engine) = setup_temp_engine();
    engine.set("k", "short").unwrap();
    let before = engine.entry("k").unwrap();
    let value_len = engine.value_log_len().unwrap();
    let index_len = engine.index_log_len().unwrap();

    engine.set("k", "a much longer value").unwrap();

    let after = engine.entry("k").unwrap();
    assert_eq!(after.value_offset as u64, value_len);
    assert_ne!(after.value_offset, before.value_offset);
    assert_eq!(after.record_offset, before.record_offset);
    assert_eq!(engine.value_log_len().unwrap(), value_len + 19);
    assert_eq!(engine.index_log_len().unwrap(), index_len);
    assert_eq!(engine.get("k").unwrap(), b"a much longer value".to_vec());
}

#[test]
fn test_growth_after_shrink_appends() {
    let (_temp, _path, engine) = setup_temp_engine();
    engine.set("k", "123456").unwrap();
    engine.set("k", "12").unwrap();
    let value_len = engine.value_log_len().unwrap();

    // The recorded size is now 2, so 4 bytes no longer fit the slot
    engine.set("k", "1234").unwrap();

    assert_eq!(engine.value_log_len().unwrap(), value_len + 4);
    assert_eq!(engine.get("k").unwrap(), b"1234".to_vec());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_reopen_restores_directory() {
    let (_temp, path, engine) = setup_temp_engine();

    engine.set("a", "1").unwrap();
    engine.set("b", "22").unwrap();
    engine.set("c", "333").unwrap();
    engine.set("b", "2").unwrap(); // in place
    engine.set("c", "33333").unwrap(); // appended
    engine.delete("a").unwrap();
    engine.set("a", "again").unwrap(); // set, delete, set
    engine.set("d", "4").unwrap();
    engine.delete("d").unwrap();

    let keys_before = engine.keys(None, 0, 0, true).unwrap();
    let entries_before: Vec<_> = keys_before
        .iter()
        .map(|k| engine.entry(k.clone()).unwrap())
        .collect();
    engine.close().unwrap();

    let engine = Engine::open_path(&path).unwrap();
    let keys_after = engine.keys(None, 0, 0, true).unwrap();
    let entries_after: Vec<_> = keys_after
        .iter()
        .map(|k| engine.entry(k.clone()).unwrap())
        .collect();

    assert_eq!(keys_after, keys_before);
    assert_eq!(entries_after, entries_before);
    assert_eq!(engine.get("a").unwrap(), b"again".to_vec());
    assert_eq!(engine.get("b").unwrap(), b"2".to_vec());
    assert_eq!(engine.get("c").unwrap(), b"33333".to_vec());
    assert!(matches!(engine.get("d"), Err(TwinlogError::KeyNotFound)));
}

#[test]
fn test_reopen_without_close() {
    let (_temp, path, engine) = setup_temp_engine();
    engine.set("k", "v").unwrap();
    drop(engine);

    let engine = Engine::open_path(&path).unwrap();

    assert_eq!(engine.get("k").unwrap(), b"v".to_vec());
}

#[test]
fn test_reopen_after_torn_index_tail() {
    let (temp, path, engine) = setup_temp_engine();
    engine.set("k1", "v1").unwrap();
    engine.set("k2", "v2").unwrap();
    let index_len = engine.index_log_len().unwrap();
    engine.close().unwrap();

    // Simulate a crash halfway through writing a third record
    let torn = IndexRecord::upsert(b"k3".to_vec(), 4, 2).encode().unwrap();
    let mut file = OpenOptions::new()
        .append(true)
        .open(temp.path().join("db.idx"))
        .unwrap();
    file.write_all(&torn[..9]).unwrap();
    drop(file);

    let engine = Engine::open_path(&path).unwrap();
    assert_eq!(engine.count().unwrap(), 2);
    assert_eq!(engine.index_log_len(), Some(index_len));

    engine.set("k3", "v3").unwrap();
    engine.close().unwrap();

    let engine = Engine::open_path(&path).unwrap();
    assert_eq!(engine.count().unwrap(), 3);
    assert_eq!(engine.get("k3").unwrap(), b"v3".to_vec());
}

#[test]
fn test_open_rejects_corrupt_index() {
    let (temp, path, engine) = setup_temp_engine();
    engine.set("k1", "v1").unwrap();
    engine.close().unwrap();

    let mut bad = IndexRecord::upsert(b"k2".to_vec(), 0, 2).encode().unwrap();
    bad[1] = 5;
    let good = IndexRecord::upsert(b"k3".to_vec(), 0, 2).encode().unwrap();
    let mut file = OpenOptions::new()
        .append(true)
        .open(temp.path().join("db.idx"))
        .unwrap();
    file.write_all(&bad).unwrap();
    file.write_all(&good).unwrap();
    drop(file);

    let result = Engine::open_path(&path);

    assert!(matches!(result, Err(TwinlogError::CorruptIndex { offset: 18, .. })));
}

// =============================================================================
// Store Mode Tests
// =============================================================================

#[test]
fn test_memory_mode_caches_and_persists() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sm");

    let engine = Engine::open(memory_config(&path)).unwrap();
    engine.set(1i64, "2").unwrap();
    assert_eq!(engine.get(1i64).unwrap(), b"2".to_vec());
    assert_eq!(engine.entry(1i64).unwrap().value, Some(b"2".to_vec()));
    engine.set(1i64, "42").unwrap();
    engine.close().unwrap();

    // Disk mode reads what memory mode wrote through
    let engine = Engine::open_path(&path).unwrap();
    assert_eq!(engine.get(1i64).unwrap(), b"42".to_vec());
    assert_eq!(engine.entry(1i64).unwrap().value, None);
    engine.close().unwrap();

    // Memory mode reloads values during replay
    let engine = Engine::open(memory_config(&path)).unwrap();
    assert_eq!(engine.entry(1i64).unwrap().value, Some(b"42".to_vec()));
}

#[test]
fn test_pure_memory_mode() {
    let engine = Engine::open(memory_config("")).unwrap();

    for i in 0..1_000i64 {
        engine.set(i, i.to_be_bytes()).unwrap();
    }

    assert_eq!(engine.value_log_len(), None);
    assert_eq!(engine.index_log_len(), None);
    assert_eq!(engine.count().unwrap(), 1_000);
    assert_eq!(engine.get(6i64).unwrap(), 6i64.to_be_bytes().to_vec());
    assert_eq!(
        engine.keys(Some(Key::from(997i64)), 0, 0, true).unwrap(),
        vec![Key::from(998i64).encode(), Key::from(999i64).encode()]
    );

    engine.delete(6i64).unwrap();
    assert!(matches!(engine.get(6i64), Err(TwinlogError::KeyNotFound)));

    engine.delete_file().unwrap();
    engine.close().unwrap();
}

#[test]
fn test_pure_memory_backup_is_noop() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(memory_config("")).unwrap();
    engine.set("k", "v").unwrap();

    engine.backup(temp_dir.path()).unwrap();

    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

// =============================================================================
// Batch Operation Tests
// =============================================================================

#[test]
fn test_sets_and_gets() {
    let (_temp, _path, engine) = setup_temp_engine();

    let pairs: Vec<(i64, Vec<u8>)> = (1..64i64).map(|i| (i, (i + 1).to_be_bytes().to_vec())).collect();
    engine.sets(pairs).unwrap();
    assert_eq!(engine.get(63i64).unwrap(), 64i64.to_be_bytes().to_vec());

    let binary: Vec<(Vec<u8>, Vec<u8>)> = (0..100)
        .map(|i| {
            let k = format!("{:04}", i).into_bytes();
            (k.clone(), k)
        })
        .collect();
    engine.sets(binary).unwrap();
    assert_eq!(engine.get("0063").unwrap(), b"0063".to_vec());

    let found = engine.gets(["0002", "0003", "9999"]).unwrap();
    assert_eq!(
        found,
        vec![
            (b"0002".to_vec(), b"0002".to_vec()),
            (b"0003".to_vec(), b"0003".to_vec()),
        ]
    );
}

// =============================================================================
// Prefix Query Tests
// =============================================================================

#[test]
fn test_keys_by_prefix_not_found() {
    let (_temp, _path, engine) = setup_temp_engine();

    for (offset, ascending) in [(0, false), (0, true), (1, false)] {
        let result = engine.keys_by_prefix("non-existent-prefix", 0, offset, ascending);
        assert!(matches!(result, Err(TwinlogError::KeyNotFound)));
    }

    engine.set("some-key", "some-value").unwrap();

    for (offset, ascending) in [(0, false), (0, true), (1, false)] {
        let result = engine.keys_by_prefix("non-existent-prefix", 0, offset, ascending);
        assert!(matches!(result, Err(TwinlogError::KeyNotFound)));
    }
}

#[test]
fn test_keys_by_prefix() {
    let (_temp, _path, engine) = setup_temp_engine();
    for key in ["user:3", "item:1", "user:1", "user:2", "zeta"] {
        engine.set(key, "v").unwrap();
    }

    let asc = engine.keys_by_prefix("user:", 0, 0, true).unwrap();
    let desc = engine.keys_by_prefix("user:", 2, 0, false).unwrap();

    assert_eq!(asc, vec![b"user:1".to_vec(), b"user:2".to_vec(), b"user:3".to_vec()]);
    assert_eq!(desc, vec![b"user:3".to_vec(), b"user:2".to_vec()]);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_close_is_idempotent_and_blocks_operations() {
    let (_temp, _path, engine) = setup_temp_engine();
    engine.set("k", "v").unwrap();

    engine.close().unwrap();
    engine.close().unwrap();

    assert!(engine.is_closed());
    assert!(matches!(engine.get("k"), Err(TwinlogError::Closed)));
    assert!(matches!(engine.set("k", "v"), Err(TwinlogError::Closed)));
    assert!(matches!(engine.delete("k"), Err(TwinlogError::Closed)));
    assert!(matches!(engine.count(), Err(TwinlogError::Closed)));
    assert!(matches!(engine.keys(None, 0, 0, true), Err(TwinlogError::Closed)));
}

#[test]
fn test_delete_file_removes_both_files() {
    let (temp, path, engine) = setup_temp_engine();
    engine.set("k", "v").unwrap();

    engine.delete_file().unwrap();

    assert!(!path.exists());
    assert!(!temp.path().join("db.idx").exists());
    assert!(engine.is_closed());
    assert!(matches!(engine.delete_file(), Err(TwinlogError::Io(_))));
}

#[test]
fn test_backup_copies_files() {
    let (_temp, path, engine) = setup_temp_engine();
    let dest = TempDir::new().unwrap();
    engine.set(1i64, "2").unwrap();
    engine.set("4", "4").unwrap();

    let target = engine.backup(dest.path()).unwrap();
    engine.delete_file().unwrap();

    assert!(target.starts_with(dest.path()));
    assert!(target.ends_with("db"));
    assert_ne!(target, path);
    let restored = Engine::open_path(&target).unwrap();
    assert_eq!(restored.get(1i64).unwrap(), b"2".to_vec());
    assert_eq!(restored.get("4").unwrap(), b"4".to_vec());
}

#[cfg(unix)]
#[test]
fn test_file_mode_is_applied() {
    use std::os::unix::fs::PermissionsExt;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("private");
    let config = Config::builder().path(&path).file_mode(0o600).build();

    let _engine = Engine::open(config).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_and_readers() {
    let (_temp, _path, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let writers: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..200 {
                    let key = format!("Key:{}:{}", t, i);
                    engine.set(key, format!("Val:{}:{}", t, i)).unwrap();
                }
            })
        })
        .collect();
    for handle in writers {
        handle.join().unwrap();
    }

    let readers: Vec<_> = (0..8)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..200 {
                    let value = engine.get(format!("Key:{}:{}", t, i)).unwrap();
                    assert_eq!(value, format!("Val:{}:{}", t, i).into_bytes());
                }
                engine.keys(None, 10, 0, t % 2 == 0).unwrap().len()
            })
        })
        .collect();
    for handle in readers {
        assert_eq!(handle.join().unwrap(), 10);
    }

    assert_eq!(engine.count().unwrap(), 1_600);
}

#[test]
fn test_background_syncer_runs_and_stops() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("synced");
    let config = Config::builder()
        .path(&path)
        .sync_interval(Duration::from_millis(5))
        .build();
    let engine = Engine::open(config).unwrap();

    for i in 0..50u32 {
        engine.set(i, i.to_be_bytes()).unwrap();
    }
    thread::sleep(Duration::from_millis(30));

    engine.close().unwrap();

    let engine = Engine::open_path(&path).unwrap();
    assert_eq!(engine.count().unwrap(), 50);
}

#[test]
fn test_drop_stops_background_syncer() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .path(temp_dir.path().join("dropped"))
        .sync_interval(Duration::from_secs(3600))
        .build();

    let engine = Engine::open(config).unwrap();
    engine.set("k", "v").unwrap();

    // Must not wait out the hour-long interval
    drop(engine);
}
