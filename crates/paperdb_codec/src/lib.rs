//! # PaperDB Codec
//!
//! JSON payload encoding/decoding for PaperDB.
//!
//! Documents are stored as JSON text payloads in a single data column.
//! This crate converts between document types and their payload
//! representation:
//!
//! - Any `serde::Serialize` type encodes to a payload
//! - Any `serde::de::DeserializeOwned` type decodes from one
//! - A decode failure is fatal to the operation that needed it; nothing is
//!   registered or partially constructed on the failure path
//!
//! ## Usage
//!
//! ```
//! use paperdb_codec::{from_payload, to_payload};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! let user = User { name: "Alice".into(), age: 30 };
//! let payload = to_payload(&user).unwrap();
//! let decoded: User = from_payload(&payload).unwrap();
//! assert_eq!(user, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;

pub use error::{CodecError, CodecResult};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a document to its JSON payload text.
///
/// # Errors
///
/// Returns [`CodecError::Serialize`] if the document cannot be represented
/// as JSON.
pub fn to_payload<T: Serialize>(document: &T) -> CodecResult<String> {
    serde_json::to_string(document).map_err(|err| CodecError::Serialize {
        message: err.to_string(),
    })
}

/// Decodes a document from its JSON payload text.
///
/// # Errors
///
/// Returns [`CodecError::Deserialize`] if the payload is not valid JSON or
/// does not match the document type.
pub fn from_payload<T: DeserializeOwned>(payload: &str) -> CodecResult<T> {
    serde_json::from_str(payload).map_err(|err| CodecError::Deserialize {
        message: err.to_string(),
    })
}

/// Reads a single top-level field from a payload without a typed decode.
///
/// Returns `None` if the payload is not a JSON object or the field is
/// absent. Used for identity reconciliation, where only the embedded id
/// field is needed.
#[must_use]
pub fn payload_field(payload: &str, name: &str) -> Option<serde_json::Value> {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|doc| doc.get(name).cloned())
}
