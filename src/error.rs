//! Error types for Twinlog
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TwinlogError
pub type Result<T> = std::result::Result<T, TwinlogError>;

/// Unified error type for Twinlog operations
#[derive(Debug, Error)]
pub enum TwinlogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The value log grew past what a 4-byte seek can address
    #[error("Offset {0} does not fit the 32-bit index record layout")]
    OffsetOverflow(u64),

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt index record at offset {offset}: {reason}")]
    CorruptIndex { offset: u64, reason: String },

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Encoding Errors
    // -------------------------------------------------------------------------
    #[error("Encoding error: {0}")]
    Encoding(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Database is closed")]
    Closed,
}

impl From<bincode::Error> for TwinlogError {
    fn from(err: bincode::Error) -> Self {
        TwinlogError::Encoding(err.to_string())
    }
}
