//! Configuration for Twinlog
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, TwinlogError};

/// Main configuration for a Twinlog instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Path of the value log. The index log lives next to it:
    ///   {path}        (value log, raw appended values)
    ///   {path}.idx    (index log, fixed-layout records)
    ///
    /// An empty path together with [`StoreMode::Memory`] yields a pure
    /// in-memory instance that never touches the filesystem.
    pub path: PathBuf,

    /// How values are held (see [`StoreMode`])
    pub store_mode: StoreMode,

    // -------------------------------------------------------------------------
    // Filesystem Configuration
    // -------------------------------------------------------------------------
    /// Permission bits for newly created files (Unix only)
    pub file_mode: u32,

    /// Permission bits for newly created parent directories (Unix only)
    pub dir_mode: u32,

    // -------------------------------------------------------------------------
    // Durability Configuration
    // -------------------------------------------------------------------------
    /// How often the background syncer fsyncs both files.
    /// Zero disables the syncer and leaves flushing to the OS.
    pub sync_interval: Duration,
}

/// Where values live between a `set` and a `get`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Values stay on disk and are read back on demand (code `0`)
    Disk,

    /// Values are cached in RAM and written through to disk when a path is
    /// configured (code `2`)
    Memory,
}

impl StoreMode {
    /// Numeric code used by configuration files and the CLI
    pub fn code(self) -> u8 {
        match self {
            StoreMode::Disk => 0,
            StoreMode::Memory => 2,
        }
    }
}

impl TryFrom<u8> for StoreMode {
    type Error = TwinlogError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(StoreMode::Disk),
            2 => Ok(StoreMode::Memory),
            other => Err(TwinlogError::Config(format!(
                "unknown store mode {} (expected 0 or 2)",
                other
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            store_mode: StoreMode::Disk,
            file_mode: 0o644,
            dir_mode: 0o755,
            sync_interval: Duration::ZERO,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Path of the index log derived from the value log path
    pub fn index_path(&self) -> PathBuf {
        crate::storage::index_path(&self.path)
    }

    /// True when no file will ever be created for this instance
    pub fn is_pure_memory(&self) -> bool {
        self.store_mode == StoreMode::Memory && self.path.as_os_str().is_empty()
    }

    /// Reject combinations `Engine::open` cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() && self.store_mode != StoreMode::Memory {
            return Err(TwinlogError::Config(
                "an empty path is only allowed in memory store mode".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the value log path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the store mode
    pub fn store_mode(mut self, mode: StoreMode) -> Self {
        self.config.store_mode = mode;
        self
    }

    /// Set the permission bits for created files
    pub fn file_mode(mut self, mode: u32) -> Self {
        self.config.file_mode = mode;
        self
    }

    /// Set the permission bits for created directories
    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.config.dir_mode = mode;
        self
    }

    /// Set the background sync interval (zero disables it)
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.config.sync_interval = interval;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
