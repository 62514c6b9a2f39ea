//! Stores.
//!
//! The uniform operational surface over any backend: look up by key, read
//! the first/last entry and key, enumerate fields, and submit entries
//! singly or in bulk with at-most-once semantics per key.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      EntryStore Trait                        │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                                      ↑
//!          │                                      │
//! ┌────────┴────────┐                    ┌────────┴────────┐
//! │    CsvStore     │                    │   SqliteStore   │
//! │ (adapter +      │                    │ (database file) │
//! │  partitioner)   │                    │                 │
//! └─────────────────┘                    └─────────────────┘
//! ```

mod csv;
mod queue;
mod sqlite;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::value::{Entry, Value};

pub use csv::CsvStore;
pub use sqlite::SqliteStore;

// =============================================================================
// EntryStore Trait
// =============================================================================

/// A store of indexed entries.
///
/// All operations resolve the store's schema on first contact; any
/// operation can therefore fail with
/// [`MissingSchema`](crate::StoreError::MissingSchema) or
/// [`SchemaMismatched`](crate::StoreError::SchemaMismatched).
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Field names of the resolved schema, in declaration order.
    async fn fields(&self) -> StoreResult<Vec<String>>;

    /// The entry with the smallest index value, or `None` on an empty store.
    async fn first(&self) -> StoreResult<Option<Entry>>;

    /// The entry with the largest index value, or `None` on an empty store.
    async fn last(&self) -> StoreResult<Option<Entry>>;

    /// The smallest index value, or `None` on an empty store.
    async fn first_key(&self) -> StoreResult<Option<Value>>;

    /// The largest index value, or `None` on an empty store.
    async fn last_key(&self) -> StoreResult<Option<Value>>;

    /// The entry stored under `key`, or `None`.
    async fn get(&self, key: &Value) -> StoreResult<Option<Entry>>;

    /// Submit a batch of entries.
    ///
    /// Every entry is validated before anything is written. An empty batch
    /// is a no-op. Resolves only when every touched partition queue has
    /// drained; a fault on one partition does not roll back another.
    async fn put(&self, entries: Vec<Entry>) -> StoreResult<()>;
}

/// Project the index field out of an optional entry.
fn project_key(schema_index: &str, entry: Option<&Entry>) -> Option<Value> {
    entry.and_then(|e| e.get(schema_index).cloned())
}

pub(crate) use queue::PartitionQueues;
