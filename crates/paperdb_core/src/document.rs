//! Document identity and the per-type document contract.

use paperdb_storage::ParamValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A document identity value.
///
/// Identities are either primitive values or strings; together with the
/// document type they form the key under which a session tracks an
/// instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocId {
    /// Integer identity (sequence-style).
    Int(i64),
    /// UUID identity (generated-style).
    Uuid(Uuid),
    /// String identity (natural-key-style).
    Text(String),
}

impl DocId {
    /// Generates a fresh UUID identity.
    #[must_use]
    pub fn generate() -> Self {
        Self::Uuid(Uuid::new_v4())
    }

    /// Whether this value is the type's zero value, i.e. no identity has
    /// been assigned yet.
    #[must_use]
    pub fn is_unassigned(&self) -> bool {
        match self {
            Self::Int(i) => *i == 0,
            Self::Uuid(u) => u.is_nil(),
            Self::Text(t) => t.is_empty(),
        }
    }

    /// Renders the identity as a command parameter.
    #[must_use]
    pub fn as_param(&self) -> ParamValue {
        match self {
            Self::Int(i) => ParamValue::Int(*i),
            Self::Uuid(u) => ParamValue::Text(u.to_string()),
            Self::Text(t) => ParamValue::Text(t.clone()),
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Text(t) => write!(f, "{t}"),
        }
    }
}

impl From<i64> for DocId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for DocId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<Uuid> for DocId {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<&str> for DocId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DocId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// How identities are produced for a document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStyle {
    /// The caller assigns the identity before storing.
    Assigned,
    /// The session assigns a fresh UUID at store time when the identity is
    /// still unassigned.
    Generated,
}

/// The contract a type must satisfy to be stored as a document.
///
/// A document carries its own identity: [`document_id`](Self::document_id)
/// retrieves it, and for [`IdStyle::Generated`] types
/// [`set_document_id`](Self::set_document_id) accepts the session-assigned
/// value before the first write.
///
/// # Example
///
/// ```
/// use paperdb_core::{DocId, Document, IdStyle};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Invoice {
///     id: i64,
///     total: i64,
/// }
///
/// impl Document for Invoice {
///     const NAME: &'static str = "invoices";
///
///     fn document_id(&self) -> DocId {
///         DocId::Int(self.id)
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Logical document name; the default backing table name.
    const NAME: &'static str;

    /// How identities are produced for this type.
    const ID_STYLE: IdStyle = IdStyle::Assigned;

    /// Returns this document's identity.
    fn document_id(&self) -> DocId;

    /// Accepts a session-assigned identity.
    ///
    /// Only called for [`IdStyle::Generated`] types; the default is a no-op.
    fn set_document_id(&mut self, id: DocId) {
        let _ = id;
    }
}
