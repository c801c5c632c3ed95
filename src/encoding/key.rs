//! Lookup key encoding
//!
//! Every key handed to the engine is one of a closed set of kinds. Scalars get
//! a fixed-width encoding whose byte order matches their numeric order, so
//! range queries over integer keys walk them numerically.

use serde::Serialize;

use crate::error::Result;

const SIGN_BIT_64: u64 = 1 << 63;
const SIGN_BIT_32: u32 = 1 << 31;

/// A lookup key before it is reduced to raw bytes
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),

    /// Raw bytes, stored unchanged
    Bytes(Vec<u8>),

    /// UTF-8 text, stored unchanged
    Str(String),

    /// Already-encoded structured key (see [`Key::structured`])
    Encoded(Vec<u8>),
}

impl Key {
    /// Build a key from any serde type using the canonical structured encoding
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Key::Encoded(bincode::serialize(value)?))
    }

    /// The bytes stored in the index and compared by range queries
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Key::Bool(v) => vec![u8::from(*v)],
            Key::U8(v) => vec![*v],
            Key::U16(v) => v.to_be_bytes().to_vec(),
            Key::U32(v) => v.to_be_bytes().to_vec(),
            Key::U64(v) => v.to_be_bytes().to_vec(),
            Key::I8(v) => vec![(*v as u8) ^ 0x80],
            Key::I16(v) => ((*v as u16) ^ 0x8000).to_be_bytes().to_vec(),
            Key::I32(v) => ((*v as u32) ^ SIGN_BIT_32).to_be_bytes().to_vec(),
            Key::I64(v) => ((*v as u64) ^ SIGN_BIT_64).to_be_bytes().to_vec(),
            Key::F32(v) => {
                let bits = v.to_bits();
                let ordered = if bits & SIGN_BIT_32 != 0 {
                    !bits
                } else {
                    bits ^ SIGN_BIT_32
                };
                ordered.to_be_bytes().to_vec()
            }
            Key::F64(v) => {
                let bits = v.to_bits();
                let ordered = if bits & SIGN_BIT_64 != 0 {
                    !bits
                } else {
                    bits ^ SIGN_BIT_64
                };
                ordered.to_be_bytes().to_vec()
            }
            Key::Bytes(b) | Key::Encoded(b) => b.clone(),
            Key::Str(s) => s.as_bytes().to_vec(),
        }
    }

    /// Consume the key, avoiding a copy for byte and text keys
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Key::Bytes(b) | Key::Encoded(b) => b,
            Key::Str(s) => s.into_bytes(),
            other => other.encode(),
        }
    }
}

macro_rules! key_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Key {
                fn from(v: $ty) -> Self {
                    Key::$variant(v)
                }
            }
        )*
    };
}

key_from_scalar! {
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
}

impl From<usize> for Key {
    fn from(v: usize) -> Self {
        Key::U64(v as u64)
    }
}

impl From<isize> for Key {
    fn from(v: isize) -> Self {
        Key::I64(v as i64)
    }
}

impl From<Vec<u8>> for Key {
    fn from(v: Vec<u8>) -> Self {
        Key::Bytes(v)
    }
}

impl From<&Vec<u8>> for Key {
    fn from(v: &Vec<u8>) -> Self {
        Key::Bytes(v.clone())
    }
}

impl From<&[u8]> for Key {
    fn from(v: &[u8]) -> Self {
        Key::Bytes(v.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Key {
    fn from(v: &[u8; N]) -> Self {
        Key::Bytes(v.to_vec())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}

impl From<&String> for Key {
    fn from(v: &String) -> Self {
        Key::Str(v.clone())
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}
