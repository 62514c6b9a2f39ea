//! Indexed relational store over an embedded SQLite file.
//!
//! Two tables back the store: `schema`, a single row of grammar tokens with
//! one TEXT column per field, and `records`, one column per field with
//! NUMERIC affinity for `Boolean`/`Number`/`Date` and TEXT otherwise,
//! primary-keyed on the index field.
//!
//! Writes are serialized through a process-wide single-slot queue; each
//! write task opens the database file, installs the statement trace sink,
//! and closes the connection on every exit path. `ON CONFLICT DO NOTHING`
//! is the at-most-once-per-key guarantee: later writes with the same index
//! are silently ignored.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row};
use tokio::sync::{Mutex, OnceCell};

use crate::codec::sql::{self, SqlValue};
use crate::constants::SQLITE_PARAMS_COUNT_MAX;
use crate::error::{StoreError, StoreResult};
use crate::schema::{decode_schema, encode_schema, reconcile, validate_entry, FieldType, Schema};
use crate::value::{Entry, FieldKind, Value};

use super::{project_key, EntryStore};

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

// =============================================================================
// SqliteStore
// =============================================================================

/// Entry store over an embedded SQLite database file.
pub struct SqliteStore {
    path: PathBuf,
    template: Option<Schema>,
    schema: OnceCell<Schema>,
    write_slot: Mutex<()>,
}

impl SqliteStore {
    /// Create a store without a template.
    ///
    /// The database must already hold a schema or every operation fails
    /// with [`StoreError::MissingSchema`].
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            template: None,
            schema: OnceCell::new(),
            write_slot: Mutex::new(()),
        }
    }

    /// Create a store with a declared template.
    ///
    /// Both tables are created atomically on first contact when the
    /// database holds no schema yet; when it does, the two must be
    /// structurally equal.
    #[must_use]
    pub fn with_template(path: impl Into<PathBuf>, template: Schema) -> Self {
        Self {
            path: path.into(),
            template: Some(template),
            schema: OnceCell::new(),
            write_slot: Mutex::new(()),
        }
    }

    /// The database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the database file with the statement trace sink installed.
    async fn connect(&self) -> StoreResult<SqliteConnection> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .log_statements(log::LevelFilter::Debug);
        options
            .connect()
            .await
            .map_err(|e| StoreError::database(format!("open {}: {e}", self.path.display())))
    }

    /// Resolve and cache the schema for this store's lifetime.
    async fn resolve_schema(&self, conn: &mut SqliteConnection) -> StoreResult<Schema> {
        if let Some(schema) = self.schema.get() {
            return Ok(schema.clone());
        }
        let stored = read_stored_schema(conn).await?;
        let had_stored = stored.is_some();
        let resolved = reconcile(stored, self.template.as_ref())?;
        if !had_stored {
            create_tables(conn, &resolved).await?;
        }
        let schema = self.schema.get_or_init(|| async { resolved }).await;
        Ok(schema.clone())
    }

    /// One end of the store under the index order.
    async fn boundary(&self, descending: bool) -> StoreResult<Option<Entry>> {
        let mut conn = self.connect().await?;
        let result: StoreResult<Option<Entry>> = async {
            let schema = self.resolve_schema(&mut conn).await?;
            let direction = if descending { "DESC" } else { "ASC" };
            let query = format!(
                "SELECT * FROM records ORDER BY \"{}\" {direction} LIMIT 1",
                schema.index()
            );
            let row = sqlx::query(&query)
                .fetch_optional(&mut conn)
                .await
                .map_err(|e| StoreError::database(format!("boundary query: {e}")))?;
            row.map(|r| row_to_entry(&schema, &r)).transpose()
        }
        .await;
        let closed = close(conn).await;
        let entry = result?;
        closed?;
        Ok(entry)
    }

    /// Insert the validated entries in parameter-capped chunks.
    async fn put_inner(
        &self,
        conn: &mut SqliteConnection,
        entries: &[Entry],
    ) -> StoreResult<()> {
        let schema = self.resolve_schema(conn).await?;
        for entry in entries {
            validate_entry(&schema, entry)?;
        }

        let rows_per_statement = insert_chunk_rows(schema.fields().len())?;
        let columns: Vec<String> = schema
            .fields()
            .iter()
            .map(|f| format!("\"{}\"", f.name))
            .collect();
        let row_placeholder = format!("({})", vec!["?"; columns.len()].join(", "));

        for chunk in entries.chunks(rows_per_statement) {
            let placeholders = vec![row_placeholder.clone(); chunk.len()].join(", ");
            let statement = format!(
                "INSERT INTO records ({}) VALUES {placeholders} ON CONFLICT DO NOTHING",
                columns.join(", ")
            );
            let mut query = sqlx::query(&statement);
            for entry in chunk {
                for field in schema.fields() {
                    let value = entry.get(&field.name).unwrap_or(&Value::Null);
                    query = bind_value(query, sql::hydrate(value)?);
                }
            }
            query
                .execute(&mut *conn)
                .await
                .map_err(|e| StoreError::database(format!("insert chunk: {e}")))?;
            tracing::debug!(rows = chunk.len(), "insert chunk");
        }
        Ok(())
    }
}

// =============================================================================
// Schema Tables
// =============================================================================

/// Rows per multi-row INSERT under the parameter cap.
///
/// A schema with more fields than the cap cannot bind even one row; that
/// surfaces as a database fault rather than a panic.
pub(crate) fn insert_chunk_rows(field_count: usize) -> StoreResult<usize> {
    assert!(field_count > 0, "schema has at least the index field");
    if field_count > SQLITE_PARAMS_COUNT_MAX {
        return Err(StoreError::database(format!(
            "schema has {field_count} fields; one row cannot fit the \
             {SQLITE_PARAMS_COUNT_MAX}-parameter cap"
        )));
    }
    Ok(SQLITE_PARAMS_COUNT_MAX / field_count)
}

/// Column affinity for one field.
fn affinity(ty: &FieldType) -> &'static str {
    match ty.kind {
        FieldKind::Boolean | FieldKind::Number | FieldKind::Date => "NUMERIC",
        FieldKind::String | FieldKind::Url | FieldKind::Embedded => "TEXT",
    }
}

/// Read the persisted schema row, if the table exists.
async fn read_stored_schema(conn: &mut SqliteConnection) -> StoreResult<Option<Schema>> {
    let tables: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema'",
    )
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| StoreError::database(format!("probe schema table: {e}")))?;
    if tables == 0 {
        return Ok(None);
    }

    let Some(row) = sqlx::query("SELECT * FROM \"schema\" LIMIT 1")
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| StoreError::database(format!("read schema row: {e}")))?
    else {
        return Ok(None);
    };

    let mut pairs = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let token: String = row
            .try_get(column.ordinal())
            .map_err(|e| StoreError::database(format!("schema token: {e}")))?;
        pairs.push((column.name().to_string(), token));
    }
    decode_schema(&pairs).map(Some)
}

/// Create both tables and persist the schema row in one transaction.
async fn create_tables(conn: &mut SqliteConnection, schema: &Schema) -> StoreResult<()> {
    let db = |e: sqlx::Error| StoreError::database(format!("initialize tables: {e}"));
    let mut tx = conn.begin().await.map_err(db)?;

    let schema_columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| format!("\"{}\" TEXT", f.name))
        .collect();
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS \"schema\" ({})",
        schema_columns.join(", ")
    ))
    .execute(&mut *tx)
    .await
    .map_err(db)?;

    let record_columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| format!("\"{}\" {}", f.name, affinity(&f.ty)))
        .collect();
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS records ({}, PRIMARY KEY (\"{}\"))",
        record_columns.join(", "),
        schema.index()
    ))
    .execute(&mut *tx)
    .await
    .map_err(db)?;

    let tokens = encode_schema(schema);
    let columns: Vec<String> = tokens.iter().map(|(n, _)| format!("\"{n}\"")).collect();
    let placeholders = vec!["?"; tokens.len()].join(", ");
    let insert = format!(
        "INSERT INTO \"schema\" ({}) SELECT {placeholders} \
         WHERE NOT EXISTS (SELECT 1 FROM \"schema\")",
        columns.join(", ")
    );
    let mut query = sqlx::query(&insert);
    for (_, token) in tokens {
        query = query.bind(token);
    }
    query.execute(&mut *tx).await.map_err(db)?;

    tx.commit().await.map_err(db)
}

// =============================================================================
// Row Mapping
// =============================================================================

fn bind_value(query: SqliteQuery<'_>, value: SqlValue) -> SqliteQuery<'_> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Integer(i) => query.bind(i),
        SqlValue::Real(r) => query.bind(r),
        SqlValue::Text(t) => query.bind(t),
    }
}

fn row_to_entry(schema: &Schema, row: &SqliteRow) -> StoreResult<Entry> {
    let db = |e: sqlx::Error| StoreError::database(format!("read column: {e}"));
    let mut entry = Entry::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let name = field.name.as_str();
        let sql = if field.ty.is_list
            || matches!(
                field.ty.kind,
                FieldKind::String | FieldKind::Url | FieldKind::Embedded
            ) {
            row.try_get::<Option<String>, _>(name)
                .map_err(db)?
                .map(SqlValue::Text)
        } else {
            match field.ty.kind {
                FieldKind::Boolean | FieldKind::Date => row
                    .try_get::<Option<i64>, _>(name)
                    .map_err(db)?
                    .map(SqlValue::Integer),
                // NUMERIC affinity may hand back an integer for a whole number.
                FieldKind::Number => match row.try_get::<Option<f64>, _>(name) {
                    Ok(value) => value.map(SqlValue::Real),
                    Err(_) => row
                        .try_get::<Option<i64>, _>(name)
                        .map_err(db)?
                        .map(SqlValue::Integer),
                },
                FieldKind::String | FieldKind::Url | FieldKind::Embedded => {
                    unreachable!("text kinds are read above")
                }
            }
        }
        .unwrap_or(SqlValue::Null);
        entry.insert(name.to_string(), sql::dehydrate(&field.ty, sql)?);
    }
    Ok(entry)
}

async fn close(conn: SqliteConnection) -> StoreResult<()> {
    conn.close()
        .await
        .map_err(|e| StoreError::database(format!("close: {e}")))
}

// =============================================================================
// EntryStore Implementation
// =============================================================================

#[async_trait]
impl EntryStore for SqliteStore {
    async fn fields(&self) -> StoreResult<Vec<String>> {
        let mut conn = self.connect().await?;
        let result = self.resolve_schema(&mut conn).await;
        let closed = close(conn).await;
        let schema = result?;
        closed?;
        Ok(schema.field_names())
    }

    #[tracing::instrument(skip(self))]
    async fn first(&self) -> StoreResult<Option<Entry>> {
        self.boundary(false).await
    }

    #[tracing::instrument(skip(self))]
    async fn last(&self) -> StoreResult<Option<Entry>> {
        self.boundary(true).await
    }

    async fn first_key(&self) -> StoreResult<Option<Value>> {
        let entry = self.first().await?;
        Ok(self
            .schema
            .get()
            .and_then(|s| project_key(s.index(), entry.as_ref())))
    }

    async fn last_key(&self) -> StoreResult<Option<Value>> {
        let entry = self.last().await?;
        Ok(self
            .schema
            .get()
            .and_then(|s| project_key(s.index(), entry.as_ref())))
    }

    #[tracing::instrument(skip(self, key))]
    async fn get(&self, key: &Value) -> StoreResult<Option<Entry>> {
        let mut conn = self.connect().await?;
        let result: StoreResult<Option<Entry>> = async {
            let schema = self.resolve_schema(&mut conn).await?;
            let statement = format!("SELECT * FROM records WHERE \"{}\" = ?", schema.index());
            let row = bind_value(sqlx::query(&statement), sql::hydrate(key)?)
                .fetch_optional(&mut conn)
                .await
                .map_err(|e| StoreError::database(format!("get: {e}")))?;
            row.map(|r| row_to_entry(&schema, &r)).transpose()
        }
        .await;
        let closed = close(conn).await;
        let entry = result?;
        closed?;
        Ok(entry)
    }

    #[tracing::instrument(skip(self, entries), fields(batch = entries.len()))]
    async fn put(&self, entries: Vec<Entry>) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let _slot = self.write_slot.lock().await;
        let mut conn = self.connect().await?;
        let result = self.put_inner(&mut conn, &entries).await;
        let closed = close(conn).await;
        result?;
        closed
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::schema::FieldType;

    use super::*;

    fn template() -> Schema {
        Schema::builder("timestamp", FieldKind::Date)
            .field("value", FieldType::new(FieldKind::String))
            .build()
            .unwrap()
    }

    fn entry(day: u32, value: &str) -> Entry {
        Entry::from([
            (
                "timestamp".to_string(),
                Value::Date(Utc.with_ymd_and_hms(2000, 1, day, 0, 0, 0).unwrap()),
            ),
            ("value".to_string(), Value::String(value.to_string())),
        ])
    }

    fn key(day: u32) -> Value {
        Value::Date(Utc.with_ymd_and_hms(2000, 1, day, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_chunk_arithmetic() {
        assert_eq!(insert_chunk_rows(2).unwrap(), 499);
        assert_eq!(insert_chunk_rows(1).unwrap(), 999);
        assert_eq!(insert_chunk_rows(3).unwrap(), 333);
        // 65,535 two-field entries fan out into ceil(65535 / 499) statements.
        assert_eq!(65_535_usize.div_ceil(insert_chunk_rows(2).unwrap()), 132);
    }

    #[test]
    fn test_chunk_rejects_oversized_schema() {
        assert!(matches!(
            insert_chunk_rows(SQLITE_PARAMS_COUNT_MAX + 1),
            Err(StoreError::Database { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_your_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::with_template(dir.path().join("store.db"), template());

        store.put(vec![entry(1, "a"), entry(2, "b")]).await.unwrap();

        assert_eq!(store.get(&key(1)).await.unwrap().unwrap(), entry(1, "a"));
        assert_eq!(store.get(&key(2)).await.unwrap().unwrap(), entry(2, "b"));
        assert_eq!(store.get(&key(3)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_first_last_by_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::with_template(dir.path().join("store.db"), template());

        // Insertion order does not matter; the index order does.
        store
            .put(vec![entry(7, "g"), entry(2, "b"), entry(5, "e")])
            .await
            .unwrap();

        assert_eq!(store.first().await.unwrap().unwrap(), entry(2, "b"));
        assert_eq!(store.last().await.unwrap().unwrap(), entry(7, "g"));
        assert_eq!(store.first_key().await.unwrap(), Some(key(2)));
        assert_eq!(store.last_key().await.unwrap(), Some(key(7)));
    }

    #[tokio::test]
    async fn test_duplicate_key_first_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::with_template(dir.path().join("store.db"), template());

        store.put(vec![entry(1, "first")]).await.unwrap();
        store.put(vec![entry(1, "second")]).await.unwrap();

        let got = store.get(&key(1)).await.unwrap().unwrap();
        assert_eq!(got.get("value"), Some(&Value::String("first".to_string())));
    }

    #[tokio::test]
    async fn test_duplicate_within_one_batch_first_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::with_template(dir.path().join("store.db"), template());

        store
            .put(vec![entry(1, "first"), entry(1, "second")])
            .await
            .unwrap();

        let got = store.get(&key(1)).await.unwrap().unwrap();
        assert_eq!(got.get("value"), Some(&Value::String("first".to_string())));
    }

    #[tokio::test]
    async fn test_put_larger_than_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::with_template(dir.path().join("store.db"), template());

        // Two fields per entry: 499 rows per statement, so this spans three.
        let entries: Vec<Entry> = (0..1200)
            .map(|i| {
                Entry::from([
                    (
                        "timestamp".to_string(),
                        Value::Date(
                            Utc.timestamp_millis_opt(946_684_800_000 + i64::from(i) * 1000)
                                .single()
                                .unwrap(),
                        ),
                    ),
                    ("value".to_string(), Value::String(format!("v{i}"))),
                ])
            })
            .collect();
        let first = entries[0].clone();
        let last = entries[1199].clone();

        store.put(entries).await.unwrap();

        assert_eq!(store.first().await.unwrap().unwrap(), first);
        assert_eq!(store.last().await.unwrap().unwrap(), last);
    }

    #[tokio::test]
    async fn test_empty_store_answers_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::with_template(dir.path().join("store.db"), template());

        assert_eq!(store.first().await.unwrap(), None);
        assert_eq!(store.last().await.unwrap(), None);
        assert_eq!(store.first_key().await.unwrap(), None);
        assert_eq!(store.last_key().await.unwrap(), None);
        assert_eq!(store.get(&key(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_schema_without_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("store.db"));
        assert!(matches!(
            store.fields().await,
            Err(StoreError::MissingSchema)
        ));
    }

    #[tokio::test]
    async fn test_schema_persists_across_stores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        let first = SqliteStore::with_template(&path, template());
        first.put(vec![entry(1, "a")]).await.unwrap();

        let second = SqliteStore::new(&path);
        assert_eq!(second.fields().await.unwrap(), vec!["timestamp", "value"]);
        assert_eq!(second.get(&key(1)).await.unwrap().unwrap(), entry(1, "a"));
    }

    #[tokio::test]
    async fn test_template_mismatch_fails_first_operation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        SqliteStore::with_template(&path, template())
            .put(vec![entry(1, "a")])
            .await
            .unwrap();

        let extra = Schema::builder("timestamp", FieldKind::Date)
            .field("value", FieldType::new(FieldKind::String))
            .field("additional", FieldType::new(FieldKind::String))
            .build()
            .unwrap();
        let mismatched = SqliteStore::with_template(&path, extra);

        assert!(matches!(
            mismatched.fields().await,
            Err(StoreError::SchemaMismatched { .. })
        ));
    }

    #[tokio::test]
    async fn test_rich_kinds_round_trip() {
        let schema = Schema::builder("id", FieldKind::Number)
            .field("flag", FieldType::new(FieldKind::Boolean))
            .field("link", FieldType::new(FieldKind::Url))
            .field("meta", FieldType::new(FieldKind::Embedded))
            .field("tags", FieldType::new(FieldKind::String).list())
            .field("note", FieldType::new(FieldKind::String).nullable())
            .build()
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::with_template(dir.path().join("store.db"), schema);

        let mut meta = serde_json::Map::new();
        meta.insert("k".to_string(), serde_json::Value::from(1));
        let entry = Entry::from([
            ("id".to_string(), Value::Number(1.5)),
            ("flag".to_string(), Value::Boolean(true)),
            (
                "link".to_string(),
                Value::Url("https://example.com/".to_string()),
            ),
            ("meta".to_string(), Value::Embedded(meta)),
            (
                "tags".to_string(),
                Value::List(vec![
                    Value::String("a".to_string()),
                    Value::String("b".to_string()),
                ]),
            ),
            ("note".to_string(), Value::Null),
        ]);

        store.put(vec![entry.clone()]).await.unwrap();
        let got = store.get(&Value::Number(1.5)).await.unwrap().unwrap();
        assert_eq!(got, entry);
    }
}
