//! Error types for storage operations.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The target table does not exist.
    #[error("table not found: {table}")]
    MissingTable {
        /// Name of the missing table.
        table: String,
    },

    /// A row with the same key already exists.
    #[error("duplicate key '{key}' in table '{table}'")]
    DuplicateKey {
        /// Table the insert targeted.
        table: String,
        /// The conflicting key.
        key: String,
    },

    /// The backend could not interpret the command text.
    #[error("command syntax: {message}")]
    Syntax {
        /// Description of what could not be parsed.
        message: String,
    },

    /// A parameter reference (`@n`) had no bound value.
    #[error("unbound parameter @{index} (command carries {bound} parameters)")]
    UnboundParameter {
        /// The referenced index.
        index: usize,
        /// How many parameters were bound.
        bound: usize,
    },

    /// Transaction control used out of order.
    #[error("transaction state: {message}")]
    TransactionState {
        /// Description of the misuse.
        message: String,
    },

    /// An injected fault (test backends only).
    #[error("injected fault: {message}")]
    Fault {
        /// Description of the injected failure.
        message: String,
    },

    /// The connection to the backend failed.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
    },
}

impl StorageError {
    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    /// Creates a transaction-state error.
    pub fn transaction_state(message: impl Into<String>) -> Self {
        Self::TransactionState {
            message: message.into(),
        }
    }

    /// Creates an injected-fault error.
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}
