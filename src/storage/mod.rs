//! Storage Module
//!
//! File abstraction shared by the value log and the index log.
//!
//! ## Responsibilities
//! - Append at end-of-file and report where the bytes landed
//! - Overwrite at a known offset (in-place value and record rewrites)
//! - Positional reads that do not disturb any cursor
//! - Create missing parent directories with the configured mode
//!
//! ## On-Disk Layout
//! ```text
//! {path}       value log: raw value bytes, no framing
//! {path}.idx   index log: IndexRecord | IndexRecord | ...
//! ```
//!
//! `LogFile` does no locking of its own; the engine serializes access.

mod log_file;

use std::fs::DirBuilder;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub use log_file::LogFile;

/// Suffix appended to the value log path to name its index log
pub const INDEX_SUFFIX: &str = ".idx";

/// Path of the index log that belongs to `value_path`
pub fn index_path(value_path: &Path) -> PathBuf {
    let mut name = value_path.as_os_str().to_os_string();
    name.push(INDEX_SUFFIX);
    PathBuf::from(name)
}

/// Create every missing directory above `file_path`
pub fn create_parent_dirs(file_path: &Path, dir_mode: u32) -> Result<()> {
    let parent = match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Ok(()),
    };

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(dir_mode);
    }
    #[cfg(not(unix))]
    let _ = dir_mode;

    builder.create(parent)?;
    Ok(())
}
