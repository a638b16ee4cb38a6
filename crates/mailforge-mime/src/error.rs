//! Errors raised while building or decoding message parts.

use std::string::FromUtf8Error;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a message or encoded value could not be produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed quoted-printable or encoded-word input.
    #[error("Malformed encoded data: {0}")]
    InvalidEncoding(String),

    /// Malformed base64 input.
    #[error("Malformed base64: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Decoded bytes are not UTF-8.
    #[error("Decoded text is not UTF-8: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// The builder was not given a header every message needs.
    #[error("Message has no {0} header")]
    MissingHeader(&'static str),

    /// Neither a text nor an HTML body was given.
    #[error("Message has no body")]
    MissingBody,
}
