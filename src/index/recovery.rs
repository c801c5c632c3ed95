//! Index log recovery
//!
//! Rebuilds the key directory by replaying the index log from offset 0.
//! Later records for a key overwrite earlier ones, so append order alone
//! re-derives the final state, including keys deleted and set again.

use tracing::warn;

use crate::error::{Result, TwinlogError};
use crate::keydir::{DirEntry, KeyDir};
use crate::storage::LogFile;

use super::{IndexRecord, OpCode, RecordError};

/// Result of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Complete records decoded
    pub records: u64,

    pub upserts: u64,

    pub tombstones: u64,

    /// Length of the log covered by complete records
    pub valid_len: u64,

    /// Bytes of a torn trailing record that were ignored
    pub truncated_bytes: u64,
}

/// Replay an in-memory copy of the index log into `keydir`.
///
/// When `values` is given, each upsert also loads its value bytes so the
/// directory can serve reads from memory.
///
/// A trailing record shorter than it declares ends the replay without error.
/// Any other malformed record aborts with [`TwinlogError::CorruptIndex`].
pub fn replay(buf: &[u8], keydir: &mut KeyDir, values: Option<&LogFile>) -> Result<RecoveryStats> {
    let mut stats = RecoveryStats::default();
    let mut read_seek = 0usize;

    while read_seek < buf.len() {
        let (record, consumed) = match IndexRecord::decode(&buf[read_seek..]) {
            Ok(decoded) => decoded,
            Err(RecordError::Truncated { .. }) => {
                stats.truncated_bytes = (buf.len() - read_seek) as u64;
                break;
            }
            Err(e) => {
                return Err(TwinlogError::CorruptIndex {
                    offset: read_seek as u64,
                    reason: e.to_string(),
                })
            }
        };

        let record_offset = u32::try_from(read_seek)
            .map_err(|_| TwinlogError::OffsetOverflow(read_seek as u64))?;

        match record.op {
            OpCode::Upsert => {
                let value = match values {
                    Some(file) => Some(
                        file.read_at(record.value_offset as u64, record.value_size as usize)?,
                    ),
                    None => None,
                };
                keydir.insert(
                    record.key,
                    DirEntry {
                        value_offset: record.value_offset,
                        value_size: record.value_size,
                        record_offset,
                        value,
                    },
                );
                stats.upserts += 1;
            }
            OpCode::Tombstone => {
                keydir.remove(&record.key);
                stats.tombstones += 1;
            }
        }

        stats.records += 1;
        read_seek += consumed;
    }

    stats.valid_len = read_seek as u64;
    Ok(stats)
}

/// Replay an index log file and cut off any torn tail so new records
/// append right after the last complete one.
pub fn recover(
    index: &mut LogFile,
    keydir: &mut KeyDir,
    values: Option<&LogFile>,
) -> Result<RecoveryStats> {
    let buf = index.read_all()?;
    let stats = replay(&buf, keydir, values)?;

    if stats.truncated_bytes > 0 {
        warn!(
            path = %index.path().display(),
            valid_len = stats.valid_len,
            dropped = stats.truncated_bytes,
            "dropping truncated trailing index record"
        );
        index.truncate(stats.valid_len)?;
    }

    Ok(stats)
}
