//! Kind-tagged, length-prefixed framing over the controller/worker link.
//!
//! Every message is framed with:
//! - A 4-byte network-order kind code (the closed [`MessageKind`] set)
//! - A 4-byte network-order payload length
//!
//! The framing layer is payload-agnostic: it moves `(kind, bytes)` pairs
//! and buffers partial reads internally. No partial frame ever reaches a
//! caller. Integrity relies on the transport being a reliable local
//! stream; there is no checksum.

pub mod codec;
pub mod error;
pub mod kind;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use kind::{Direction, MessageKind, Role};
pub use reader::FrameReader;
pub use writer::FrameWriter;
