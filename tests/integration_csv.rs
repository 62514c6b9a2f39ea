//! Integration tests for the CSV store over a local directory.
//!
//! End-to-end validation of the partitioned file layout: exact on-disk
//! bytes, multi-partition fan-out, append-vs-rewrite decisions, and schema
//! persistence across store instances.

use chrono::{TimeZone, Utc};
use tidemark::{
    CsvStore, Entry, EntryStore, FieldKind, FieldType, FixedSizePartitioner, LocalDirAdapter,
    Schema, SinglePartitioner, StoreError, Value, YearMonthPartitioner,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn template() -> Schema {
    Schema::builder("timestamp", FieldKind::Date)
        .field("value", FieldType::new(FieldKind::String))
        .build()
        .unwrap()
}

fn entry(date: (i32, u32, u32), value: &str) -> Entry {
    Entry::from([
        (
            "timestamp".to_string(),
            Value::Date(Utc.with_ymd_and_hms(date.0, date.1, date.2, 0, 0, 0).unwrap()),
        ),
        ("value".to_string(), Value::String(value.to_string())),
    ])
}

async fn store_at(root: &std::path::Path) -> CsvStore {
    init_tracing();
    let adapter = LocalDirAdapter::new(root).await.unwrap();
    CsvStore::with_template(adapter, YearMonthPartitioner::new(), template())
}

// =============================================================================
// Seed Scenarios
// =============================================================================

#[tokio::test]
async fn test_single_write_produces_exact_layout() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path()).await;

    store
        .put(vec![entry((2000, 1, 1), "2000-01-01")])
        .await
        .unwrap();

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["2000-01.csv", "schema.json"]);

    let bytes = std::fs::read_to_string(dir.path().join("2000-01.csv")).unwrap();
    assert_eq!(bytes, "timestamp,value\n946684800,2000-01-01\n");

    let key = Value::Date(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(
        store.get(&key).await.unwrap().unwrap(),
        entry((2000, 1, 1), "2000-01-01")
    );
}

#[tokio::test]
async fn test_multi_partition_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path()).await;

    store
        .put(vec![entry((2000, 1, 1), "2000-01-01")])
        .await
        .unwrap();
    store
        .put(vec![
            entry((2000, 1, 2), "2000-01-02"),
            entry((2000, 1, 3), "2000-01-03"),
            entry((2000, 2, 1), "2000-02-01"),
        ])
        .await
        .unwrap();

    let january = std::fs::read_to_string(dir.path().join("2000-01.csv")).unwrap();
    assert_eq!(
        january,
        "timestamp,value\n946684800,2000-01-01\n946771200,2000-01-02\n946857600,2000-01-03\n"
    );
    let february = std::fs::read_to_string(dir.path().join("2000-02.csv")).unwrap();
    assert_eq!(february, "timestamp,value\n949363200,2000-02-01\n");
}

#[tokio::test]
async fn test_out_of_order_append_forces_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path()).await;

    store
        .put(vec![
            entry((2000, 1, 1), "2000-01-01"),
            entry((2000, 1, 2), "2000-01-02"),
        ])
        .await
        .unwrap();

    let midday = Entry::from([
        (
            "timestamp".to_string(),
            Value::Date(Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap()),
        ),
        ("value".to_string(), Value::String("midway".to_string())),
    ]);
    store.put(vec![midday]).await.unwrap();

    let january = std::fs::read_to_string(dir.path().join("2000-01.csv")).unwrap();
    assert_eq!(
        january,
        "timestamp,value\n946684800,2000-01-01\n946728000,midway\n946771200,2000-01-02\n"
    );
}

#[tokio::test]
async fn test_first_last_over_two_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_at(dir.path()).await;

    store
        .put(vec![
            entry((2000, 1, 1), "a"),
            entry((2000, 1, 2), "b"),
            entry((2000, 2, 1), "c"),
            entry((2000, 2, 2), "d"),
        ])
        .await
        .unwrap();

    assert_eq!(
        store.first_key().await.unwrap(),
        Some(Value::Date(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()))
    );
    assert_eq!(
        store.last_key().await.unwrap(),
        Some(Value::Date(Utc.with_ymd_and_hms(2000, 2, 2, 0, 0, 0).unwrap()))
    );
    assert_eq!(store.first().await.unwrap().unwrap(), entry((2000, 1, 1), "a"));
    assert_eq!(store.last().await.unwrap().unwrap(), entry((2000, 2, 2), "d"));
}

#[tokio::test]
async fn test_schema_mismatch_on_reopen() {
    let dir = tempfile::tempdir().unwrap();
    store_at(dir.path())
        .await
        .put(vec![entry((2000, 1, 1), "x")])
        .await
        .unwrap();

    let extended = Schema::builder("timestamp", FieldKind::Date)
        .field("value", FieldType::new(FieldKind::String))
        .field("additional", FieldType::new(FieldKind::String))
        .build()
        .unwrap();
    let adapter = LocalDirAdapter::new(dir.path()).await.unwrap();
    let mismatched = CsvStore::with_template(adapter, YearMonthPartitioner::new(), extended);

    assert!(matches!(
        mismatched.fields().await,
        Err(StoreError::SchemaMismatched { .. })
    ));
}

// =============================================================================
// Schema Lifecycle
// =============================================================================

#[tokio::test]
async fn test_reopen_without_template_reports_same_schema() {
    let dir = tempfile::tempdir().unwrap();
    store_at(dir.path())
        .await
        .put(vec![entry((2000, 1, 1), "x")])
        .await
        .unwrap();

    let adapter = LocalDirAdapter::new(dir.path()).await.unwrap();
    let reopened = CsvStore::new(adapter, YearMonthPartitioner::new());
    assert_eq!(
        reopened.fields().await.unwrap(),
        vec!["timestamp", "value"]
    );

    let key = Value::Date(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap());
    assert_eq!(
        reopened.get(&key).await.unwrap().unwrap(),
        entry((2000, 1, 1), "x")
    );
}

#[tokio::test]
async fn test_missing_schema_on_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = LocalDirAdapter::new(dir.path()).await.unwrap();
    let store = CsvStore::new(adapter, YearMonthPartitioner::new());

    assert!(matches!(store.first().await, Err(StoreError::MissingSchema)));
    assert!(matches!(
        store.fields().await,
        Err(StoreError::MissingSchema)
    ));
}

// =============================================================================
// Other Partitioners
// =============================================================================

#[tokio::test]
async fn test_fixed_size_partitions_over_number_index() {
    let schema = Schema::builder("offset", FieldKind::Number)
        .field("label", FieldType::new(FieldKind::String))
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let adapter = LocalDirAdapter::new(dir.path()).await.unwrap();
    let store = CsvStore::with_template(adapter, FixedSizePartitioner::new(100.0), schema);

    let row = |offset: f64, label: &str| {
        Entry::from([
            ("offset".to_string(), Value::Number(offset)),
            ("label".to_string(), Value::String(label.to_string())),
        ])
    };
    store
        .put(vec![row(5.0, "a"), row(150.0, "b"), row(99.0, "c")])
        .await
        .unwrap();

    let zero = std::fs::read_to_string(dir.path().join("0.csv")).unwrap();
    assert_eq!(zero, "offset,label\n5,a\n99,c\n");
    let hundred = std::fs::read_to_string(dir.path().join("100.csv")).unwrap();
    assert_eq!(hundred, "offset,label\n150,b\n");

    assert_eq!(store.first_key().await.unwrap(), Some(Value::Number(5.0)));
    assert_eq!(store.last_key().await.unwrap(), Some(Value::Number(150.0)));
}

#[tokio::test]
async fn test_single_partition_holds_everything() {
    let schema = Schema::builder("name", FieldKind::String)
        .field("rank", FieldType::new(FieldKind::Number))
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let adapter = LocalDirAdapter::new(dir.path()).await.unwrap();
    let store = CsvStore::with_template(adapter, SinglePartitioner::new("data"), schema);

    let row = |name: &str, rank: f64| {
        Entry::from([
            ("name".to_string(), Value::String(name.to_string())),
            ("rank".to_string(), Value::Number(rank)),
        ])
    };
    store
        .put(vec![row("carol", 3.0), row("alice", 1.0), row("bob", 2.0)])
        .await
        .unwrap();

    let data = std::fs::read_to_string(dir.path().join("data.csv")).unwrap();
    assert_eq!(data, "name,rank\nalice,1\nbob,2\ncarol,3\n");

    assert_eq!(
        store.first_key().await.unwrap(),
        Some(Value::String("alice".to_string()))
    );
    assert_eq!(
        store.last_key().await.unwrap(),
        Some(Value::String("carol".to_string()))
    );
}

// =============================================================================
// Richer Schemas
// =============================================================================

#[tokio::test]
async fn test_lists_nullables_and_embedded_round_trip() {
    let schema = Schema::builder("id", FieldKind::Number)
        .field("tags", FieldType::new(FieldKind::String).list())
        .field("meta", FieldType::new(FieldKind::Embedded))
        .field("note", FieldType::new(FieldKind::String).nullable())
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let adapter = LocalDirAdapter::new(dir.path()).await.unwrap();
    let store = CsvStore::with_template(adapter, SinglePartitioner::new("data"), schema);

    let mut meta = serde_json::Map::new();
    meta.insert("k".to_string(), serde_json::Value::from("v"));
    let full = Entry::from([
        ("id".to_string(), Value::Number(1.0)),
        (
            "tags".to_string(),
            Value::List(vec![
                Value::String("a, with comma".to_string()),
                Value::String("b".to_string()),
            ]),
        ),
        ("meta".to_string(), Value::Embedded(meta)),
        ("note".to_string(), Value::Null),
    ]);
    store.put(vec![full.clone()]).await.unwrap();

    let got = store.get(&Value::Number(1.0)).await.unwrap().unwrap();
    assert_eq!(got, full);
}
