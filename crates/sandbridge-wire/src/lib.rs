//! Wire codec for scripting-runtime value sequences.
//!
//! Encodes an ordered sequence of script values — scalars, strings, and
//! opaque remote-object references — into a flat, self-describing byte
//! sequence and back. The codec knows nothing about message kinds; that
//! is the framing layer's concern.
//!
//! Opaque references are encoded with their own tag so the receiving
//! endpoint can register them in its remote-reference table instead of
//! interpreting their bytes as data.

pub mod codec;
pub mod error;
pub mod value;

pub use codec::{decode, encode, encode_into};
pub use error::{Result, WireError};
pub use value::{RefId, Value};
