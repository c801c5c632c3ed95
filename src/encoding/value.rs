//! Value codec
//!
//! Typed values are stored with bincode; raw byte strings bypass this module
//! entirely and are written as-is.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Encode a typed value into the bytes written to the value log
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Decode bytes previously produced by [`encode_value`]
pub fn decode_value<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}
