//! Session configuration.

/// Configuration shared by all sessions of a document store.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum documents per bulk-insert batch.
    pub bulk_batch_size: usize,

    /// Whether sessions issue a type's create-table statement before its
    /// first write or fetch against that table.
    pub auto_create_storage: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bulk_batch_size: 1000,
            auto_create_storage: true,
        }
    }
}

impl SessionConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum documents per bulk-insert batch.
    #[must_use]
    pub const fn bulk_batch_size(mut self, size: usize) -> Self {
        self.bulk_batch_size = size;
        self
    }

    /// Sets whether storage is created on first use.
    #[must_use]
    pub const fn auto_create_storage(mut self, value: bool) -> Self {
        self.auto_create_storage = value;
        self
    }
}
