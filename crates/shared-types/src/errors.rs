//! # Error Types
//!
//! Parsing errors for the hex-encoded value objects.

use thiserror::Error;

/// Errors raised when decoding a value object from its hex form.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HexError {
    /// The input was not valid hex.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The decoded bytes had the wrong width.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// A quantity did not fit in the target integer.
    #[error("quantity out of range: {0}")]
    QuantityOutOfRange(String),
}
