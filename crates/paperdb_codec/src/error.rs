//! Error types for payload encoding and decoding.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while converting documents to or from payloads.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The document could not be encoded to a payload.
    #[error("serialize: {message}")]
    Serialize {
        /// Description of the failure.
        message: String,
    },

    /// The payload could not be decoded into the document type.
    #[error("deserialize: {message}")]
    Deserialize {
        /// Description of the failure.
        message: String,
    },
}
