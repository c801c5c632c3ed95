//! Index Log Module
//!
//! The index log is the durable description of where every key's value lives.
//!
//! ## Responsibilities
//! - Encode/decode fixed-layout index records
//! - Replay the log on open to rebuild the key directory
//! - Drop a torn trailing record left by a crash mid-write
//!
//! ## Record Format
//! ```text
//! ┌─────────┬────────┬──────────┬──────────┬──────────┬─────────┬───────┐
//! │ Ver (1) │ Op (1) │ Seek (4) │ Size (4) │ Time (4) │ KLen (2)│  Key  │
//! └─────────┴────────┴──────────┴──────────┴──────────┴─────────┴───────┘
//! ```
//! All integers are big-endian. There are no delimiters or checksums: the key
//! length field makes every record self-describing. Op `0` is an upsert,
//! op `1` a tombstone.

mod record;
mod recovery;

pub use record::{IndexRecord, OpCode, RecordError, FORMAT_VERSION, HEADER_SIZE, MAX_KEY_LEN};
pub use recovery::{recover, replay, RecoveryStats};
