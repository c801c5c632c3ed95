//! Instance Registry
//!
//! Maps a database path to one shared [`Engine`], opening it lazily on first
//! use. Calls routed by path therefore share one instance and its lock.
//!
//! The engine never refers to the registry; it is a convenience layer on top.
//! A process-wide registry is available through [`global`] together with free
//! functions that route by path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::encoding::Key;
use crate::engine::Engine;
use crate::error::Result;

/// Default destination root for [`Registry::backup_all`] callers that have none
pub const DEFAULT_BACKUP_DIR: &str = "backup";

static GLOBAL: Lazy<Registry> = Lazy::new(|| Registry::new(Config::default()));

/// The process-wide registry
pub fn global() -> &'static Registry {
    &GLOBAL
}

/// Open engines keyed by path
pub struct Registry {
    /// Template for engines opened by path; its `path` is ignored
    defaults: RwLock<Config>,

    engines: RwLock<HashMap<PathBuf, Arc<Engine>>>,
}

impl Registry {
    pub fn new(defaults: Config) -> Self {
        Self {
            defaults: RwLock::new(defaults),
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the config used for engines opened from now on
    pub fn set_defaults(&self, defaults: Config) {
        *self.defaults.write() = defaults;
    }

    pub fn defaults(&self) -> Config {
        self.defaults.read().clone()
    }

    /// Return the engine for `path`, opening it with the default config if needed
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Arc<Engine>> {
        let mut config = self.defaults();
        config.path = path.as_ref().to_path_buf();
        self.open_with(config)
    }

    /// Return the engine for `config.path`, opening it with `config` if needed
    ///
    /// An engine closed directly through its handle is replaced by a fresh one.
    pub fn open_with(&self, config: Config) -> Result<Arc<Engine>> {
        if let Some(engine) = self.engines.read().get(&config.path) {
            if !engine.is_closed() {
                return Ok(Arc::clone(engine));
            }
        }

        let mut engines = self.engines.write();
        // Another caller may have opened it between the two locks.
        if let Some(engine) = engines.get(&config.path) {
            if !engine.is_closed() {
                return Ok(Arc::clone(engine));
            }
            debug!(path = %config.path.display(), "reopening closed database");
            engines.remove(&config.path);
        }

        let path = config.path.clone();
        let engine = Arc::new(Engine::open(config)?);
        engines.insert(path, Arc::clone(&engine));
        Ok(engine)
    }

    pub fn is_open(&self, path: impl AsRef<Path>) -> bool {
        self.engines.read().contains_key(path.as_ref())
    }

    /// Number of open engines
    pub fn len(&self) -> usize {
        self.engines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.read().is_empty()
    }

    /// Close and forget the engine for `path`; unknown paths are ignored
    pub fn close(&self, path: impl AsRef<Path>) -> Result<()> {
        let engine = self.engines.write().remove(path.as_ref());
        match engine {
            Some(engine) => engine.close(),
            None => Ok(()),
        }
    }

    /// Close every open engine, returning the first error after trying them all
    pub fn close_all(&self) -> Result<()> {
        let drained: Vec<_> = self.engines.write().drain().collect();
        debug!(count = drained.len(), "closing all databases");

        let mut first_err = None;
        for (_, engine) in drained {
            if let Err(e) = engine.close() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Open (if needed), forget, and delete the files of `path`
    pub fn delete_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let engine = self.open(path.as_ref())?;
        self.engines.write().remove(path.as_ref());
        engine.delete_file()
    }

    /// Copy every open database to `dest_root/<path>`
    pub fn backup_all(&self, dest_root: impl AsRef<Path>) -> Result<()> {
        let engines: Vec<_> = self.engines.read().values().cloned().collect();
        for engine in engines {
            engine.backup(dest_root.as_ref())?;
        }
        Ok(())
    }
}

// =============================================================================
// Path-Routed Free Functions (global registry)
// =============================================================================

/// Set `key` in the database at `path`
pub fn set(path: impl AsRef<Path>, key: impl Into<Key>, value: impl AsRef<[u8]>) -> Result<()> {
    global().open(path)?.set(key, value)
}

/// Get `key` from the database at `path`
pub fn get(path: impl AsRef<Path>, key: impl Into<Key>) -> Result<Vec<u8>> {
    global().open(path)?.get(key)
}

/// Delete `key` from the database at `path`
pub fn delete(path: impl AsRef<Path>, key: impl Into<Key>) -> Result<()> {
    global().open(path)?.delete(key)
}

/// Range query against the database at `path` (see [`Engine::keys`])
pub fn keys(
    path: impl AsRef<Path>,
    from: Option<Key>,
    limit: usize,
    offset: usize,
    ascending: bool,
) -> Result<Vec<Vec<u8>>> {
    global().open(path)?.keys(from, limit, offset, ascending)
}

/// Number of live keys in the database at `path`
pub fn count(path: impl AsRef<Path>) -> Result<usize> {
    global().open(path)?.count()
}

/// Batch set against the database at `path`
pub fn sets<K, V, I>(path: impl AsRef<Path>, pairs: I) -> Result<()>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<Key>,
    V: AsRef<[u8]>,
{
    global().open(path)?.sets(pairs)
}

/// Batch get against the database at `path`
pub fn gets<K, I>(path: impl AsRef<Path>, keys: I) -> Result<Vec<(Vec<u8>, Vec<u8>)>>
where
    I: IntoIterator<Item = K>,
    K: Into<Key>,
{
    global().open(path)?.gets(keys)
}

/// Close the database at `path`
pub fn close(path: impl AsRef<Path>) -> Result<()> {
    global().close(path)
}

/// Close every database in the global registry
pub fn close_all() -> Result<()> {
    global().close_all()
}

/// Delete the files of the database at `path`
pub fn delete_file(path: impl AsRef<Path>) -> Result<()> {
    global().delete_file(path)
}

/// Back up every open database under `dest_root`
pub fn backup_all(dest_root: impl AsRef<Path>) -> Result<()> {
    global().backup_all(dest_root)
}
