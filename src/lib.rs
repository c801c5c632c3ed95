//! # Twinlog
//!
//! An embedded key-value store with:
//! - A value log plus a compact index log per database
//! - An in-memory sorted key directory rebuilt on open
//! - Ordered range queries with prefix, offset, and limit
//! - In-place overwrites when a new value fits the old slot
//! - Optional memory-resident and pure in-memory modes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Registry (open-or-reuse by path)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Engine                               │
//! │              (one RwLock per instance, syncer)               │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │                      │                       │
//!        ▼                      ▼                       ▼
//! ┌─────────────┐       ┌──────────────┐        ┌──────────────┐
//! │   KeyDir    │◄──────│    Query     │        │  Index Log   │
//! │(sorted keys)│       │  (windows)   │        │  (records)   │
//! └─────────────┘       └──────────────┘        └──────┬───────┘
//!                                                      │
//!                                               ┌──────▼───────┐
//!                                               │  Value Log   │
//!                                               │  (LogFile)   │
//!                                               └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod encoding;
pub mod storage;
pub mod index;
pub mod keydir;
pub mod query;
pub mod engine;
pub mod registry;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TwinlogError};
pub use config::{Config, StoreMode};
pub use encoding::Key;
pub use engine::Engine;
pub use registry::Registry;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Twinlog
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
