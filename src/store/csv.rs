//! Partitioned CSV store.
//!
//! Entries live in `<partition>.csv` files under a storage adapter root,
//! one header row of field names in schema order, one entry per line,
//! values hydrated by the CSV codec. `schema.json` is reserved at the root
//! for the persisted schema.
//!
//! The write path is append-fast: a batch that sorts strictly after the
//! partition's last stored entry is appended without reading the file.
//! Anything else degrades to a merge-dedupe-sort rewrite of that partition
//! alone.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tokio::sync::OnceCell;

use crate::codec;
use crate::constants::{CSV_FILE_EXTENSION, SCHEMA_FILE_NAME};
use crate::error::{StoreError, StoreResult};
use crate::partition::Partitioner;
use crate::schema::{
    decode_schema_json, encode_schema_json, reconcile, validate_entry, Schema,
};
use crate::storage::StorageAdapter;
use crate::value::{Entry, Value};

use super::{project_key, EntryStore, PartitionQueues};

// =============================================================================
// CsvStore
// =============================================================================

/// Entry store over a partitioned CSV namespace.
pub struct CsvStore {
    adapter: Arc<dyn StorageAdapter>,
    partitioner: Arc<dyn Partitioner>,
    template: Option<Schema>,
    schema: OnceCell<Schema>,
    queues: PartitionQueues,
}

impl CsvStore {
    /// Create a store without a template.
    ///
    /// The schema must already be persisted at the adapter root or every
    /// operation fails with [`StoreError::MissingSchema`].
    pub fn new<A, P>(adapter: A, partitioner: P) -> Self
    where
        A: StorageAdapter + 'static,
        P: Partitioner + 'static,
    {
        Self {
            adapter: Arc::new(adapter),
            partitioner: Arc::new(partitioner),
            template: None,
            schema: OnceCell::new(),
            queues: PartitionQueues::new(),
        }
    }

    /// Create a store with a declared template.
    ///
    /// The template is persisted on first contact when no schema exists
    /// yet; when one does, the two must be structurally equal.
    pub fn with_template<A, P>(adapter: A, partitioner: P, template: Schema) -> Self
    where
        A: StorageAdapter + 'static,
        P: Partitioner + 'static,
    {
        Self {
            adapter: Arc::new(adapter),
            partitioner: Arc::new(partitioner),
            template: Some(template),
            schema: OnceCell::new(),
            queues: PartitionQueues::new(),
        }
    }

    /// Resolve and cache the schema for this store's lifetime.
    async fn resolve_schema(&self) -> StoreResult<Schema> {
        let schema = self
            .schema
            .get_or_try_init(|| async {
                let stored = if self.adapter.exists(SCHEMA_FILE_NAME).await? {
                    let text = self.adapter.read(SCHEMA_FILE_NAME).await?;
                    Some(decode_schema_json(&text)?)
                } else {
                    None
                };
                let had_stored = stored.is_some();
                let resolved = reconcile(stored, self.template.as_ref())?;
                if !had_stored {
                    self.adapter
                        .write(SCHEMA_FILE_NAME, &encode_schema_json(&resolved))
                        .await?;
                }
                Ok::<_, StoreError>(resolved)
            })
            .await?;
        Ok(schema.clone())
    }

    /// Populated partition names, extensions stripped.
    async fn partition_names(&self) -> StoreResult<Vec<String>> {
        let suffix = format!(".{CSV_FILE_EXTENSION}");
        let files = self.adapter.collection(CSV_FILE_EXTENSION).await?;
        Ok(files
            .iter()
            .map(|f| f.strip_suffix(&suffix).unwrap_or(f).to_string())
            .collect())
    }

    /// Last stored entry of one partition, probed with two line reads.
    async fn probe_last(&self, schema: &Schema, path: &str) -> StoreResult<Option<Entry>> {
        let header = self.adapter.head(path, 1).await?;
        let row = self.adapter.tail(path, 1).await?;
        if row == header {
            return Ok(None);
        }
        Ok(parse_rows(schema, &format!("{header}{row}"))?
            .into_iter()
            .next())
    }

    /// Drain one partition's share of a batch under its write slot.
    async fn drain_partition(
        &self,
        schema: &Schema,
        name: String,
        mut batch: Vec<Entry>,
    ) -> StoreResult<()> {
        let _slot = self.queues.acquire(&name).await;
        let path = format!("{name}.{CSV_FILE_EXTENSION}");

        sort_entries(schema, &mut batch);

        let exists = self.adapter.exists(&path).await?;
        if exists {
            if let Some(last) = self.probe_last(schema, &path).await? {
                let after_last = match (batch.first(), last.get(schema.index())) {
                    (Some(first), Some(last_key)) => {
                        project_key(schema.index(), Some(first))
                            .and_then(|min| min.key_cmp(last_key))
                            == Some(Ordering::Greater)
                    }
                    _ => false,
                };
                if after_last {
                    tracing::debug!(partition = %name, rows = batch.len(), "append");
                    let rows = encode_rows(schema, &batch, false)?;
                    return self.adapter.append(&path, &rows).await;
                }
            }
        }

        tracing::debug!(partition = %name, rows = batch.len(), "rewrite");
        let mut merged = if exists {
            parse_rows(schema, &self.adapter.read(&path).await?)?
        } else {
            Vec::new()
        };
        merged.append(&mut batch);

        // Dedupe by key text; the latest occurrence in iteration order wins.
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut unique: Vec<Entry> = Vec::new();
        for entry in merged {
            let key = entry.get(schema.index()).unwrap_or(&Value::Null);
            let key_text = codec::csv::hydrate(key)?;
            match slots.get(&key_text) {
                Some(&i) => unique[i] = entry,
                None => {
                    slots.insert(key_text, unique.len());
                    unique.push(entry);
                }
            }
        }
        sort_entries(schema, &mut unique);

        let text = encode_rows(schema, &unique, true)?;
        self.adapter.write(&path, &text).await
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Ascending stable sort by index value.
fn sort_entries(schema: &Schema, entries: &mut [Entry]) {
    let index = schema.index();
    entries.sort_by(|a, b| match (a.get(index), b.get(index)) {
        (Some(x), Some(y)) => x.key_cmp(y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    });
}

/// Parse header-first CSV text into entries under the schema.
fn parse_rows(schema: &Schema, text: &str) -> StoreResult<Vec<Entry>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| StoreError::corrupt(format!("csv header: {e}")))?
        .clone();

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| StoreError::corrupt(format!("csv row: {e}")))?;
        entries.push(record_to_entry(schema, &headers, &record)?);
    }
    Ok(entries)
}

fn record_to_entry(
    schema: &Schema,
    headers: &StringRecord,
    record: &StringRecord,
) -> StoreResult<Entry> {
    let mut entry = Entry::with_capacity(headers.len());
    for (name, cell) in headers.iter().zip(record.iter()) {
        let Some(ty) = schema.field(name) else {
            return Err(StoreError::corrupt(format!(
                "csv column {name:?} is not in the schema"
            )));
        };
        entry.insert(name.to_string(), codec::csv::dehydrate(ty, cell)?);
    }
    Ok(entry)
}

/// Encode entries as CSV text, columns in schema order.
fn encode_rows(schema: &Schema, entries: &[Entry], with_header: bool) -> StoreResult<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    if with_header {
        writer
            .write_record(schema.field_names())
            .map_err(|e| StoreError::corrupt(format!("csv header: {e}")))?;
    }
    for entry in entries {
        let mut cells = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let value = entry.get(&field.name).unwrap_or(&Value::Null);
            cells.push(codec::csv::hydrate(value)?);
        }
        writer
            .write_record(&cells)
            .map_err(|e| StoreError::corrupt(format!("csv row: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::corrupt(format!("csv flush: {e}")))?;
    String::from_utf8(bytes).map_err(|e| StoreError::corrupt(format!("csv text: {e}")))
}

// =============================================================================
// EntryStore Implementation
// =============================================================================

#[async_trait]
impl EntryStore for CsvStore {
    async fn fields(&self) -> StoreResult<Vec<String>> {
        Ok(self.resolve_schema().await?.field_names())
    }

    #[tracing::instrument(skip(self))]
    async fn first(&self) -> StoreResult<Option<Entry>> {
        let schema = self.resolve_schema().await?;
        let names = self.partition_names().await?;
        let Some(range) = self.partitioner.range(&names) else {
            return Ok(None);
        };
        // The range is partitioner-defined and may name a partition that
        // was never written, e.g. a constant partitioner over an empty store.
        let path = format!("{}.{CSV_FILE_EXTENSION}", range.first);
        if !self.adapter.exists(&path).await? {
            return Ok(None);
        }
        let text = self.adapter.head(&path, 2).await?;
        Ok(parse_rows(&schema, &text)?.into_iter().next())
    }

    #[tracing::instrument(skip(self))]
    async fn last(&self) -> StoreResult<Option<Entry>> {
        let schema = self.resolve_schema().await?;
        let names = self.partition_names().await?;
        let Some(range) = self.partitioner.range(&names) else {
            return Ok(None);
        };
        let path = format!("{}.{CSV_FILE_EXTENSION}", range.last);
        if !self.adapter.exists(&path).await? {
            return Ok(None);
        }
        self.probe_last(&schema, &path).await
    }

    async fn first_key(&self) -> StoreResult<Option<Value>> {
        let schema = self.resolve_schema().await?;
        Ok(project_key(schema.index(), self.first().await?.as_ref()))
    }

    async fn last_key(&self) -> StoreResult<Option<Value>> {
        let schema = self.resolve_schema().await?;
        Ok(project_key(schema.index(), self.last().await?.as_ref()))
    }

    #[tracing::instrument(skip(self, key))]
    async fn get(&self, key: &Value) -> StoreResult<Option<Entry>> {
        let schema = self.resolve_schema().await?;
        let name = self.partitioner.partition(key)?;
        let path = format!("{name}.{CSV_FILE_EXTENSION}");
        if !self.adapter.exists(&path).await? {
            return Ok(None);
        }

        let text = self.adapter.read(&path).await?;
        let needle = codec::csv::hydrate(key)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .map_err(|e| StoreError::corrupt(format!("csv header: {e}")))?
            .clone();
        let Some(index_col) = headers.iter().position(|h| h == schema.index()) else {
            return Err(StoreError::corrupt(format!(
                "partition {name:?} has no {:?} column",
                schema.index()
            )));
        };

        for record in reader.records() {
            let record = record.map_err(|e| StoreError::corrupt(format!("csv row: {e}")))?;
            if record.get(index_col) == Some(needle.as_str()) {
                return Ok(Some(record_to_entry(&schema, &headers, &record)?));
            }
        }
        Ok(None)
    }

    #[tracing::instrument(skip(self, entries), fields(batch = entries.len()))]
    async fn put(&self, entries: Vec<Entry>) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let schema = self.resolve_schema().await?;
        for entry in &entries {
            validate_entry(&schema, entry)?;
        }

        // Bucket by partition; submission order survives within a bucket.
        let mut order: Vec<String> = Vec::new();
        let mut buckets: HashMap<String, Vec<Entry>> = HashMap::new();
        for entry in entries {
            let key = entry
                .get(schema.index())
                .cloned()
                .unwrap_or(Value::Null);
            let name = self.partitioner.partition(&key)?;
            if !buckets.contains_key(&name) {
                order.push(name.clone());
            }
            buckets.entry(name).or_default().push(entry);
        }

        let drains = order.into_iter().map(|name| {
            let batch = buckets.remove(&name).unwrap_or_default();
            self.drain_partition(&schema, name, batch)
        });
        let results = futures::future::join_all(drains).await;
        for result in results {
            result?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
