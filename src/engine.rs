//! Engine Module
//!
//! One open database: a value log, an index log, and the key directory that
//! indexes them.
//!
//! ## Responsibilities
//! - Rebuild the key directory from the index log on open
//! - Decide where each value goes (in place or appended)
//! - Serve point, batch, and range lookups
//! - Run the optional background syncer
//! - Close / delete / back up the underlying files

mod syncer;

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, StoreMode};
use crate::encoding::{decode_value, encode_value, Key};
use crate::error::{Result, TwinlogError};
use crate::index::{self, IndexRecord, MAX_KEY_LEN};
use crate::keydir::{DirEntry, KeyDir};
use crate::query::{self, Seek};
use crate::storage::{self, LogFile};

use syncer::Syncer;

/// An open database instance
///
/// ## Concurrency Model
///
/// All state sits behind one `RwLock`:
/// - **Exclusive**: `set`, `delete`, `keys*`, `close`, `delete_file`,
///   `backup`, `sync`, and the background syncer. Range queries are
///   exclusive because searching may re-sort the key list.
/// - **Shared**: `get`, `has`, `count`, which only touch the key map and use
///   positional reads.
///
/// Every mutation holds the lock for its full duration, so effects on one
/// instance are linearizable.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Files plus key directory, shared with the syncer thread
    state: Arc<RwLock<State>>,

    /// Background fsync task, if a sync interval is configured
    syncer: Mutex<Option<Syncer>>,
}

/// Mutable state guarded by the instance lock
struct State {
    /// Both log files; `None` for pure in-memory instances
    files: Option<Files>,

    keydir: KeyDir,

    /// Keep value bytes in directory entries (memory store mode)
    cache_values: bool,

    closed: bool,
}

struct Files {
    values: LogFile,
    index: LogFile,
}

impl Engine {
    /// Open or create a database
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Create parent directories and open both files (unless pure in-memory)
    /// 3. Replay the index log into the key directory
    /// 4. Start the background syncer if an interval is set
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let cache_values = config.store_mode == StoreMode::Memory;
        let mut keydir = KeyDir::new();

        let files = if config.is_pure_memory() {
            None
        } else {
            storage::create_parent_dirs(&config.path, config.dir_mode)?;
            let values = LogFile::open(&config.path, config.file_mode)?;
            let mut index = LogFile::open(&config.index_path(), config.file_mode)?;

            let cached = if cache_values { Some(&values) } else { None };
            let stats = index::recover(&mut index, &mut keydir, cached)?;

            info!(
                path = %config.path.display(),
                mode = ?config.store_mode,
                records = stats.records,
                live_keys = keydir.len(),
                "opened database"
            );
            Some(Files { values, index })
        };

        let state = Arc::new(RwLock::new(State {
            files,
            keydir,
            cache_values,
            closed: false,
        }));

        let syncer = if config.sync_interval.is_zero() || config.is_pure_memory() {
            None
        } else {
            let shared = Arc::clone(&state);
            Some(Syncer::spawn(config.sync_interval, move || {
                let state = shared.write();
                if let Err(e) = state.sync_files() {
                    warn!("background sync failed: {}", e);
                }
            })?)
        };

        Ok(Self {
            config,
            state,
            syncer: Mutex::new(syncer),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified path
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(Config::builder().path(path).build())
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Store raw value bytes under `key`
    ///
    /// An existing key keeps its index record slot; its value is overwritten
    /// in place when the new value is no longer than the old one and
    /// appended otherwise.
    pub fn set(&self, key: impl Into<Key>, value: impl AsRef<[u8]>) -> Result<()> {
        let key = key.into().into_bytes();
        let value = value.as_ref();
        check_sizes(&key, value)?;

        self.state.write().set(key, value)
    }

    /// Encode `value` with the value codec and store it under `key`
    pub fn set_as<T: Serialize + ?Sized>(&self, key: impl Into<Key>, value: &T) -> Result<()> {
        let bytes = encode_value(value)?;
        self.set(key, bytes)
    }

    /// Fetch the raw value bytes stored under `key`
    pub fn get(&self, key: impl Into<Key>) -> Result<Vec<u8>> {
        let key = key.into().into_bytes();
        let state = self.state.read();
        state.ensure_open()?;
        state.read_value(&key)
    }

    /// Fetch and decode a value stored with [`Engine::set_as`]
    pub fn get_as<T: DeserializeOwned>(&self, key: impl Into<Key>) -> Result<T> {
        decode_value(&self.get(key)?)
    }

    /// Whether `key` is live
    pub fn has(&self, key: impl Into<Key>) -> Result<bool> {
        let key = key.into().into_bytes();
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.keydir.contains(&key))
    }

    /// Delete `key`, failing with `KeyNotFound` if it is not live
    pub fn delete(&self, key: impl Into<Key>) -> Result<()> {
        let key = key.into().into_bytes();
        self.state.write().delete(key)
    }

    /// Number of live keys
    pub fn count(&self) -> Result<usize> {
        let state = self.state.read();
        state.ensure_open()?;
        Ok(state.keydir.len())
    }

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Set each pair in order. Pairs are independent: an error stops the batch
    /// but pairs already written stay written.
    pub fn sets<K, V, I>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: AsRef<[u8]>,
    {
        for (key, value) in pairs {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Look up each key, returning `(key, value)` for the ones that are live
    pub fn gets<K, I>(&self, keys: I) -> Result<Vec<(Vec<u8>, Vec<u8>)>>
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let mut found = Vec::new();
        for key in keys {
            let key = key.into().into_bytes();
            match self.get(key.clone()) {
                Ok(value) => found.push((key, value)),
                Err(TwinlogError::KeyNotFound) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    // =========================================================================
    // Range Queries
    // =========================================================================

    /// Ordered keys after `from`
    ///
    /// - `from == None` starts at the first (ascending) or last (descending) key
    /// - a seek key ending in `*` is a prefix query (see [`Engine::keys_by_prefix`])
    /// - otherwise `from` must be a live key and is itself excluded
    ///
    /// `offset` keys are skipped, then up to `limit` returned (0 = all).
    pub fn keys(
        &self,
        from: Option<Key>,
        limit: usize,
        offset: usize,
        ascending: bool,
    ) -> Result<Vec<Vec<u8>>> {
        let seek = Seek::parse(from);
        let mut state = self.state.write();
        state.ensure_open()?;
        query::select(&mut state.keydir, &seek, limit, offset, ascending)
    }

    /// Ordered keys starting with `prefix`; `KeyNotFound` if none do
    pub fn keys_by_prefix(
        &self,
        prefix: impl AsRef<[u8]>,
        limit: usize,
        offset: usize,
        ascending: bool,
    ) -> Result<Vec<Vec<u8>>> {
        let mut state = self.state.write();
        state.ensure_open()?;
        query::select_prefix(&mut state.keydir, prefix.as_ref(), limit, offset, ascending)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Flush both files to stable storage
    pub fn sync(&self) -> Result<()> {
        let state = self.state.write();
        state.ensure_open()?;
        state.sync_files()
    }

    /// Stop the syncer, flush, and release both files. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        // The syncer takes the state lock on every tick, so stop it first.
        if let Some(syncer) = self.syncer.lock().take() {
            syncer.stop();
        }

        let mut state = self.state.write();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.keydir = KeyDir::new();

        if let Some(files) = state.files.take() {
            files.values.sync()?;
            files.index.sync()?;
        }

        debug!(path = %self.config.path.display(), "closed database");
        Ok(())
    }

    /// Close the instance and remove both files
    pub fn delete_file(&self) -> Result<()> {
        self.close()?;
        if self.config.is_pure_memory() {
            return Ok(());
        }

        fs::remove_file(&self.config.path)?;
        fs::remove_file(self.config.index_path())?;

        debug!(path = %self.config.path.display(), "deleted database files");
        Ok(())
    }

    /// Copy both files to `dest_root/<path>`
    ///
    /// Root and parent components of the database path are dropped, so the
    /// copy always lands inside `dest_root`. Pure in-memory instances have
    /// nothing to copy.
    pub fn backup(&self, dest_root: &Path) -> Result<PathBuf> {
        let target = dest_root.join(relative_path(&self.config.path));
        if self.config.is_pure_memory() {
            return Ok(target);
        }

        let state = self.state.write();
        state.ensure_open()?;
        state.sync_files()?;

        storage::create_parent_dirs(&target, self.config.dir_mode)?;
        fs::copy(&self.config.path, &target)?;
        fs::copy(self.config.index_path(), storage::index_path(&target))?;

        debug!(
            path = %self.config.path.display(),
            target = %target.display(),
            "backed up database"
        );
        Ok(target)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the value log path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// Directory entry for `key`, if live
    pub fn entry(&self, key: impl Into<Key>) -> Option<DirEntry> {
        let key = key.into().into_bytes();
        self.state.read().keydir.get(&key).cloned()
    }

    /// Current value log length (`None` without files)
    pub fn value_log_len(&self) -> Option<u64> {
        self.state.read().files.as_ref().map(|f| f.values.len())
    }

    /// Current index log length (`None` without files)
    pub fn index_log_len(&self) -> Option<u64> {
        self.state.read().files.as_ref().map(|f| f.index.len())
    }
}

impl State {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(TwinlogError::Closed);
        }
        Ok(())
    }

    fn set(&mut self, key: Vec<u8>, value: &[u8]) -> Result<()> {
        self.ensure_open()?;

        let prior = self.keydir.get(&key);
        let mut entry = match self.files.as_mut() {
            Some(files) => files.place(&key, value, prior)?,
            None => DirEntry {
                value_offset: 0,
                value_size: value.len() as u32,
                record_offset: 0,
                value: None,
            },
        };
        if self.cache_values {
            entry.value = Some(value.to_vec());
        }

        self.keydir.insert(key, entry);
        Ok(())
    }

    fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        if !self.keydir.contains(&key) {
            return Err(TwinlogError::KeyNotFound);
        }

        if let Some(files) = self.files.as_mut() {
            let record = IndexRecord::tombstone(key.clone());
            files.index.append(&record.encode()?)?;
        }

        self.keydir.remove(&key);
        Ok(())
    }

    fn read_value(&self, key: &[u8]) -> Result<Vec<u8>> {
        let entry = self.keydir.get(key).ok_or(TwinlogError::KeyNotFound)?;
        if let Some(value) = &entry.value {
            return Ok(value.clone());
        }

        match &self.files {
            Some(files) => files
                .values
                .read_at(entry.value_offset as u64, entry.value_size as usize),
            None => Err(TwinlogError::KeyNotFound),
        }
    }

    fn sync_files(&self) -> Result<()> {
        if let Some(files) = &self.files {
            files.values.sync()?;
            files.index.sync()?;
        }
        Ok(())
    }
}

impl Files {
    /// Write `value` and its index record, returning the new directory entry
    fn place(&mut self, key: &[u8], value: &[u8], prior: Option<&DirEntry>) -> Result<DirEntry> {
        let value_size = value.len() as u32;

        let (value_offset, record_offset) = match prior {
            Some(prior) => {
                let value_offset = if value_size <= prior.value_size {
                    self.values.write_at(value, prior.value_offset as u64)?;
                    prior.value_offset
                } else {
                    self.append_value(value)?
                };
                let record = IndexRecord::upsert(key.to_vec(), value_offset, value_size);
                self.index
                    .write_at(&record.encode()?, prior.record_offset as u64)?;
                (value_offset, prior.record_offset)
            }
            None => {
                let value_offset = self.append_value(value)?;
                let record = IndexRecord::upsert(key.to_vec(), value_offset, value_size);
                let record_offset = offset_u32(self.index.len())?;
                self.index.append(&record.encode()?)?;
                (value_offset, record_offset)
            }
        };

        Ok(DirEntry {
            value_offset,
            value_size,
            record_offset,
            value: None,
        })
    }

    fn append_value(&mut self, value: &[u8]) -> Result<u32> {
        let offset = offset_u32(self.values.len())?;
        self.values.append(value)?;
        Ok(offset)
    }
}

/// Reject keys and values the record layout cannot describe, before any I/O
fn check_sizes(key: &[u8], value: &[u8]) -> Result<()> {
    if key.len() > MAX_KEY_LEN {
        return Err(TwinlogError::Encoding(format!(
            "key of {} bytes exceeds the {} byte limit",
            key.len(),
            MAX_KEY_LEN
        )));
    }
    if u32::try_from(value.len()).is_err() {
        return Err(TwinlogError::Encoding(format!(
            "value of {} bytes exceeds the 4 GiB limit",
            value.len()
        )));
    }
    Ok(())
}

fn offset_u32(offset: u64) -> Result<u32> {
    u32::try_from(offset).map_err(|_| TwinlogError::OffsetOverflow(offset))
}

/// Keep only the normal components of `path`
fn relative_path(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}
