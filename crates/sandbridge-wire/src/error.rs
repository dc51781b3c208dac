/// Errors that can occur while decoding a value sequence.
///
/// A malformed payload is always rejected whole; the decoder never reads
/// past the supplied buffer.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The buffer ended inside a value.
    #[error("truncated value sequence (needed {needed} more bytes)")]
    Truncated { needed: usize },

    /// The tag byte does not name a known value kind.
    #[error("unknown value tag 0x{0:02x}")]
    UnknownTag(u8),

    /// A string value is not valid UTF-8.
    #[error("string value is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// A boolean value byte was neither 0 nor 1.
    #[error("invalid boolean byte 0x{0:02x}")]
    InvalidBool(u8),
}

pub type Result<T> = std::result::Result<T, WireError>;
