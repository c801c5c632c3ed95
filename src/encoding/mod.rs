//! Encoding Module
//!
//! Turns caller-facing keys and values into the byte strings the engine
//! stores and sorts.
//!
//! ## Responsibilities
//! - Order-preserving fixed-width encoding for scalar keys
//! - Pass-through for byte strings and text
//! - Canonical bincode encoding for structured keys and typed values
//!
//! ## Key Byte Layout
//! ```text
//! bool          1 byte  (0x00 / 0x01)
//! u8..u64       big-endian, 1/2/4/8 bytes
//! i8..i64       big-endian with the sign bit flipped
//! f32 / f64     big-endian IEEE bits, negatives inverted, positives sign-flipped
//! bytes / str   unchanged
//! structured    bincode
//! ```

mod key;
mod value;

pub use key::Key;
pub use value::{decode_value, encode_value};
