//! Physical storage shape for a document type.

use crate::document::{Document, IdStyle};

/// The physical storage shape resolved for a document type: the backing
/// table, its columns, and the type's identity style.
///
/// Defaults derive from the [`Document`] contract (`NAME` as the table,
/// `id`/`data` columns); individual pieces can be overridden before the
/// mapping is registered with a
/// [`SchemaProvider`](crate::schema::SchemaProvider).
#[derive(Debug, Clone)]
pub struct Mapping {
    /// The backing table name.
    pub table: String,
    /// The identity column name.
    pub id_column: String,
    /// The payload column name.
    pub data_column: String,
    /// How identities are produced.
    pub id_style: IdStyle,
}

impl Mapping {
    /// Derives the default mapping for a document type.
    #[must_use]
    pub fn for_document<T: Document>() -> Self {
        Self {
            table: T::NAME.to_string(),
            id_column: "id".to_string(),
            data_column: "data".to_string(),
            id_style: T::ID_STYLE,
        }
    }

    /// Overrides the backing table name.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = name.into();
        self
    }

    /// Overrides the identity column name.
    #[must_use]
    pub fn id_column(mut self, name: impl Into<String>) -> Self {
        self.id_column = name.into();
        self
    }

    /// Overrides the payload column name.
    #[must_use]
    pub fn data_column(mut self, name: impl Into<String>) -> Self {
        self.data_column = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocId;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Widget {
        id: i64,
    }

    impl Document for Widget {
        const NAME: &'static str = "widgets";

        fn document_id(&self) -> DocId {
            DocId::Int(self.id)
        }
    }

    #[test]
    fn defaults_follow_the_document() {
        let mapping = Mapping::for_document::<Widget>();
        assert_eq!(mapping.table, "widgets");
        assert_eq!(mapping.id_column, "id");
        assert_eq!(mapping.data_column, "data");
        assert_eq!(mapping.id_style, IdStyle::Assigned);
    }

    #[test]
    fn overrides() {
        let mapping = Mapping::for_document::<Widget>()
            .table("gadgets")
            .id_column("key")
            .data_column("body");
        assert_eq!(mapping.table, "gadgets");
        assert_eq!(mapping.id_column, "key");
        assert_eq!(mapping.data_column, "body");
    }
}
