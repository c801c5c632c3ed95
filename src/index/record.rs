//! Index record codec

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::error::{Result, TwinlogError};

/// Fixed part of a record: version (1) + op (1) + seek (4) + size (4) + time (4) + key len (2)
pub const HEADER_SIZE: usize = 16;

/// Only format version written and accepted
pub const FORMAT_VERSION: u8 = 0;

/// Longest key the 2-byte length field can describe
pub const MAX_KEY_LEN: usize = u16::MAX as usize;

/// What a record does to its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Upsert = 0,
    Tombstone = 1,
}

/// Why a byte slice could not be decoded as a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Fewer bytes than the record declares; expected at the log tail
    #[error("truncated record: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unsupported format version {0}")]
    UnknownVersion(u8),

    #[error("unknown op code {0}")]
    UnknownOp(u8),
}

/// One entry of the index log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub op: OpCode,
    /// Offset of the value in the value log
    pub value_offset: u32,
    pub value_size: u32,
    /// Unix seconds at encode time; never interpreted
    pub timestamp: u32,
    pub key: Vec<u8>,
}

impl IndexRecord {
    /// Record pointing `key` at a value
    pub fn upsert(key: Vec<u8>, value_offset: u32, value_size: u32) -> Self {
        Self {
            op: OpCode::Upsert,
            value_offset,
            value_size,
            timestamp: unix_now(),
            key,
        }
    }

    /// Record deleting `key`
    pub fn tombstone(key: Vec<u8>) -> Self {
        Self {
            op: OpCode::Tombstone,
            value_offset: 0,
            value_size: 0,
            timestamp: unix_now(),
            key,
        }
    }

    /// Size on disk; constant for a given key
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.key.len() > MAX_KEY_LEN {
            return Err(TwinlogError::Encoding(format!(
                "key of {} bytes exceeds the {} byte limit",
                self.key.len(),
                MAX_KEY_LEN
            )));
        }

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_u8(FORMAT_VERSION);
        buf.put_u8(self.op as u8);
        buf.put_u32(self.value_offset);
        buf.put_u32(self.value_size);
        buf.put_u32(self.timestamp);
        buf.put_u16(self.key.len() as u16);
        buf.put_slice(&self.key);
        Ok(buf)
    }

    /// Decode the record at the start of `buf`.
    ///
    /// Returns the record and the number of bytes it occupied, so a caller can
    /// step through a log buffer record by record.
    pub fn decode(buf: &[u8]) -> std::result::Result<(Self, usize), RecordError> {
        if buf.len() < HEADER_SIZE {
            return Err(RecordError::Truncated {
                needed: HEADER_SIZE,
                available: buf.len(),
            });
        }

        let mut cursor = buf;
        let version = cursor.get_u8();
        let op = cursor.get_u8();
        let value_offset = cursor.get_u32();
        let value_size = cursor.get_u32();
        let timestamp = cursor.get_u32();
        let key_len = cursor.get_u16() as usize;

        let total = HEADER_SIZE + key_len;
        if buf.len() < total {
            return Err(RecordError::Truncated {
                needed: total,
                available: buf.len(),
            });
        }

        if version != FORMAT_VERSION {
            return Err(RecordError::UnknownVersion(version));
        }
        let op = match op {
            0 => OpCode::Upsert,
            1 => OpCode::Tombstone,
            other => return Err(RecordError::UnknownOp(other)),
        };

        Ok((
            Self {
                op,
                value_offset,
                value_size,
                timestamp,
                key: cursor[..key_len].to_vec(),
            },
            total,
        ))
    }
}

fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}
