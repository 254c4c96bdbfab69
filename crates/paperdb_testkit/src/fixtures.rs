//! Document fixtures covering the identity styles.

use paperdb_core::{DocId, Document, IdStyle};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user document with a session-generated UUID identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    /// Generated identity; nil until first store.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: i64,
}

impl User {
    /// Creates an unsaved user with a nil identity.
    #[must_use]
    pub fn new(name: impl Into<String>, age: i64) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            age,
        }
    }
}

impl Document for User {
    const NAME: &'static str = "users";
    const ID_STYLE: IdStyle = IdStyle::Generated;

    fn document_id(&self) -> DocId {
        DocId::Uuid(self.id)
    }

    fn set_document_id(&mut self, id: DocId) {
        if let DocId::Uuid(uuid) = id {
            self.id = uuid;
        }
    }
}

/// An invoice document with a caller-assigned integer identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Invoice {
    /// Caller-assigned identity.
    pub id: i64,
    /// Customer reference.
    pub customer: String,
    /// Total in cents.
    pub total_cents: i64,
    /// Whether the invoice is settled.
    pub paid: bool,
}

impl Invoice {
    /// Creates a deterministic sample invoice for the given identity.
    #[must_use]
    pub fn sample(id: i64) -> Self {
        Self {
            id,
            customer: format!("customer-{}", id % 7),
            total_cents: id * 100,
            paid: id % 2 == 0,
        }
    }

    /// Creates a run of sample invoices with identities `1..=count`.
    #[must_use]
    pub fn batch(count: i64) -> Vec<Self> {
        (1..=count).map(Self::sample).collect()
    }
}

impl Document for Invoice {
    const NAME: &'static str = "invoices";

    fn document_id(&self) -> DocId {
        DocId::Int(self.id)
    }
}

/// A note document keyed by a string natural key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Note {
    /// Natural-key identity.
    pub id: String,
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
}

impl Note {
    /// Creates a note.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

impl Document for Note {
    const NAME: &'static str = "notes";

    fn document_id(&self) -> DocId {
        DocId::Text(self.id.clone())
    }
}
