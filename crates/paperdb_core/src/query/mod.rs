//! Deferred, composable query descriptors.

pub(crate) mod translate;

use crate::document::Document;
use crate::schema::Mapping;
use paperdb_storage::{ParamValue, SqlCommand};
use std::marker::PhantomData;
use uuid::Uuid;

/// A lazy query descriptor for a document type.
///
/// A `Queryable` accumulates filter fragments, ordering, and paging, and is
/// only translated to a physical command when executed through its session
/// or inspected through
/// [`Diagnostics::command_for`](crate::session::Diagnostics::command_for).
/// It can be executed repeatedly.
///
/// Each filter fragment writes its parameter references `@0`-based against
/// its own parameter list; translation renumbers them into one positional
/// sequence, so fragments compose without coordination.
///
/// Queryables are stamped with the session that produced them; executing
/// one through a different session is rejected.
///
/// # Example
///
/// ```rust,ignore
/// let adults = session
///     .queryable::<Person>()
///     .filter("age >= @0", vec![18.into()])
///     .order_by_desc("age")
///     .limit(20);
/// let docs = session.execute(&adults)?;
/// ```
pub struct Queryable<T: Document> {
    stamp: Uuid,
    filters: Vec<translate::Filter>,
    order: Option<(String, bool)>,
    limit: Option<usize>,
    offset: Option<usize>,
    _marker: PhantomData<fn() -> T>,
}

// Manual impls: the descriptor is clonable and printable whatever the
// document type is.
impl<T: Document> Clone for Queryable<T> {
    fn clone(&self) -> Self {
        Self {
            stamp: self.stamp,
            filters: self.filters.clone(),
            order: self.order.clone(),
            limit: self.limit,
            offset: self.offset,
            _marker: PhantomData,
        }
    }
}

impl<T: Document> std::fmt::Debug for Queryable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queryable")
            .field("document", &T::NAME)
            .field("filters", &self.filters.len())
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl<T: Document> Queryable<T> {
    pub(crate) fn new(stamp: Uuid) -> Self {
        Self {
            stamp,
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: None,
            _marker: PhantomData,
        }
    }

    pub(crate) fn stamp(&self) -> Uuid {
        self.stamp
    }

    /// Adds a filter fragment, `and`-joined with any previous ones.
    ///
    /// The fragment references its `params` as `@0`, `@1`, ... regardless
    /// of filters added before it.
    #[must_use]
    pub fn filter(mut self, fragment: impl Into<String>, params: Vec<ParamValue>) -> Self {
        self.filters.push(translate::Filter {
            fragment: fragment.into(),
            params,
        });
        self
    }

    /// Orders results ascending by a field.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order = Some((field.into(), false));
        self
    }

    /// Orders results descending by a field.
    #[must_use]
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order = Some((field.into(), true));
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Skips leading results (applies with [`limit`](Self::limit)).
    #[must_use]
    pub const fn offset(mut self, n: usize) -> Self {
        self.offset = Some(n);
        self
    }

    /// Translates the descriptor against a mapping without executing it.
    pub(crate) fn to_command(&self, mapping: &Mapping) -> SqlCommand {
        translate::build(
            mapping,
            &self.filters,
            self.order.as_ref().map(|(f, d)| (f.as_str(), *d)),
            self.limit,
            self.offset,
        )
    }
}
