//! Error types for the HTTP transport layer.

use clawpoly::encoding::DecodeError;

/// Errors that can occur during header encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The header did not hold base64 JSON of the expected shape.
    #[error("malformed header payload: {0}")]
    Decode(#[from] DecodeError),
}
