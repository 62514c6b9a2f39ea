//! # Tidemark
//!
//! A schema-validated, partitioned entry store: rows keyed by a single
//! designated index field, stored across heterogeneous backends behind one
//! uniform operational surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 EntryStore (public surface)                  │
//! │   fields · first · last · first_key · last_key · get · put  │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │           CsvStore           │         SqliteStore          │
//! │  partitioned text files      │  schema + records tables     │
//! ├──────────────┬───────────────┼──────────────────────────────┤
//! │ StorageAdapter│  Partitioner │      embedded SQLite         │
//! └──────────────┴───────────────┴──────────────────────────────┘
//! ```
//!
//! A caller describes its data once as a [`Schema`] of typed fields, picks
//! a backend, and gets the same surface everywhere. On first contact a
//! store reconciles any persisted schema with any declared template,
//! persists the result if absent, and never mutates it again.
//!
//! ## Quick Start
//!
//! ```
//! use tidemark::{
//!     CsvStore, Entry, EntryStore, FieldKind, FieldType, MemoryAdapter, Schema, Value,
//!     YearMonthPartitioner,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tidemark::StoreError> {
//! use chrono::TimeZone;
//!
//! let template = Schema::builder("timestamp", FieldKind::Date)
//!     .field("value", FieldType::new(FieldKind::String))
//!     .build()?;
//! let store = CsvStore::with_template(
//!     MemoryAdapter::new(),
//!     YearMonthPartitioner::new(),
//!     template,
//! );
//!
//! let when = chrono::Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
//! store
//!     .put(vec![Entry::from([
//!         ("timestamp".to_string(), Value::Date(when)),
//!         ("value".to_string(), Value::String("hello".to_string())),
//!     ])])
//!     .await?;
//!
//! let entry = store.get(&Value::Date(when)).await?;
//! assert!(entry.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - Append-fast CSV writes: a batch strictly later than a partition's last
//!   entry is appended without reading the file; anything else rewrites
//!   that partition alone, merged, deduplicated by key, sorted ascending.
//! - `first`/`last` probe at most two lines per touched partition.
//! - One schema per store lifetime; a mismatching template fails fast with
//!   a structural diff.
//! - Relational writes are serialized process-wide and chunked under the
//!   SQLite parameter cap, with first-wins semantics per key.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod constants;
pub mod error;
pub mod partition;
pub mod schema;
pub mod storage;
pub mod store;
pub mod value;

pub use error::{StoreError, StoreResult};
pub use partition::{
    DateCoercion, FixedSizePartitioner, PartitionRange, Partitioner, SinglePartitioner,
    YearMonthPartitioner,
};
pub use schema::{ChangedField, FieldType, Schema, SchemaBuilder, SchemaDiff, SchemaField};
pub use storage::{LocalDirAdapter, MemoryAdapter, StorageAdapter};
pub use store::{CsvStore, EntryStore, SqliteStore};
pub use value::{Entry, FieldKind, Value};
