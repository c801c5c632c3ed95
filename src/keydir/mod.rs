//! Key Directory Module
//!
//! In-memory map of every live key to the location of its value.
//!
//! ## Responsibilities
//! - One entry per live key (value seek/size, index record offset)
//! - Optional cached value bytes for memory store mode
//! - A sorted list of raw key bytes for ordered search
//!
//! ## Lazy Ordering
//! Inserts only append to the key list and note when that broke the order.
//! Any search re-sorts first if needed, so read paths may mutate the list and
//! must hold exclusive access to the directory.

mod directory;

pub use directory::KeyDir;

/// Where a live key's value and latest index record are
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Offset of the value in the value log
    pub value_offset: u32,

    /// Length of the value in bytes
    pub value_size: u32,

    /// Offset of this key's record in the index log (rewritten in place on update)
    pub record_offset: u32,

    /// Value bytes, present only when values are cached in memory
    pub value: Option<Vec<u8>>,
}
