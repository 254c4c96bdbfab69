//! Error types for session operations.

use paperdb_codec::CodecError;
use paperdb_storage::StorageError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur during session operations.
///
/// Lookup misses are not errors: `load` returns `None` and queries return
/// empty sequences for absent documents.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The caller supplied an unusable input.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected input.
        message: String,
    },

    /// A physical command failed during commit or a bulk batch.
    ///
    /// The affected transaction was rolled back before this error was
    /// raised; pending changes remain in the session for inspection or
    /// retry.
    #[error("transaction failed and was rolled back: {source}")]
    Transaction {
        /// The underlying command failure.
        #[source]
        source: StorageError,
    },

    /// The backing store failed on a read path.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A payload could not be converted to or from its document type.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl SessionError {
    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Wraps a command failure from the commit or bulk path.
    pub(crate) fn transaction(source: StorageError) -> Self {
        Self::Transaction { source }
    }
}
