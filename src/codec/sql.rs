//! SQL value codec.
//!
//! Per-value encoding: `Boolean -> 0|1` integer, `Date ->
//! milliseconds-since-epoch` integer, `Number -> real`, `String/URL/Embedded
//! -> text`. Lists hydrate to a JSON-encoded array of element-native forms,
//! stored as text regardless of the column's affinity.

use chrono::{TimeZone, Utc};

use crate::error::{StoreError, StoreResult};
use crate::schema::FieldType;
use crate::value::{FieldKind, Value};

// =============================================================================
// SQL Value
// =============================================================================

/// A database-native value, ready to bind to one statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Integer affinity value
    Integer(i64),
    /// Real affinity value
    Real(f64),
    /// Text affinity value
    Text(String),
}

// =============================================================================
// Hydrate
// =============================================================================

/// Encode one value into its database-native form.
///
/// # Errors
///
/// [`StoreError::UnsupportedType`] when the value is neither a recognized
/// scalar nor a list of such, or when a number has no finite JSON form
/// inside a list.
pub fn hydrate(value: &Value) -> StoreResult<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Boolean(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => Ok(SqlValue::Real(*n)),
        Value::String(s) | Value::Url(s) => Ok(SqlValue::Text(s.clone())),
        Value::Date(d) => Ok(SqlValue::Integer(d.timestamp_millis())),
        Value::Embedded(map) => serde_json::to_string(map)
            .map(SqlValue::Text)
            .map_err(|e| StoreError::unsupported(format!("embedded does not serialize: {e}"))),
        Value::List(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                elements.push(hydrate_list_element(item)?);
            }
            Ok(SqlValue::Text(serde_json::Value::Array(elements).to_string()))
        }
    }
}

fn hydrate_list_element(value: &Value) -> StoreResult<serde_json::Value> {
    match value {
        Value::Boolean(b) => Ok(serde_json::Value::from(i64::from(*b))),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| StoreError::unsupported(format!("number {n} has no JSON form"))),
        Value::String(s) | Value::Url(s) => Ok(serde_json::Value::String(s.clone())),
        Value::Date(d) => Ok(serde_json::Value::from(d.timestamp_millis())),
        Value::Embedded(map) => Ok(serde_json::Value::Object(map.clone())),
        Value::Null | Value::List(_) => Err(StoreError::unsupported(format!(
            "{value:?} is not a scalar list element"
        ))),
    }
}

// =============================================================================
// Dehydrate
// =============================================================================

/// Decode one database value back into a value of the given triple.
///
/// # Errors
///
/// [`StoreError::Corrupt`] when the stored form does not match the triple.
pub fn dehydrate(ty: &FieldType, sql: SqlValue) -> StoreResult<Value> {
    if let SqlValue::Null = sql {
        if ty.is_nullable {
            return Ok(Value::Null);
        }
        return Err(StoreError::corrupt("NULL in a non-nullable column"));
    }
    if ty.is_list {
        let SqlValue::Text(text) = sql else {
            return Err(StoreError::corrupt(format!(
                "list column holds {sql:?}, expected text"
            )));
        };
        let elements: Vec<serde_json::Value> = serde_json::from_str(&text)
            .map_err(|e| StoreError::corrupt(format!("list column {text:?}: {e}")))?;
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            items.push(dehydrate_list_element(ty.kind, element)?);
        }
        return Ok(Value::List(items));
    }
    dehydrate_scalar(ty.kind, sql)
}

fn dehydrate_scalar(kind: FieldKind, sql: SqlValue) -> StoreResult<Value> {
    match (kind, sql) {
        (FieldKind::Boolean, SqlValue::Integer(i)) => Ok(Value::Boolean(i != 0)),
        (FieldKind::Number, SqlValue::Real(n)) => Ok(Value::Number(n)),
        #[allow(clippy::cast_precision_loss)]
        (FieldKind::Number, SqlValue::Integer(i)) => Ok(Value::Number(i as f64)),
        (FieldKind::Date, SqlValue::Integer(ms)) => Utc
            .timestamp_millis_opt(ms)
            .single()
            .map(Value::Date)
            .ok_or_else(|| StoreError::corrupt(format!("date column value {ms} is out of range"))),
        (FieldKind::String, SqlValue::Text(s)) => Ok(Value::String(s)),
        (FieldKind::Url, SqlValue::Text(s)) => Ok(Value::Url(s)),
        (FieldKind::Embedded, SqlValue::Text(s)) => {
            let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&s)
                .map_err(|e| StoreError::corrupt(format!("embedded column {s:?}: {e}")))?;
            Ok(Value::Embedded(map))
        }
        (kind, sql) => Err(StoreError::corrupt(format!(
            "column holds {sql:?}, expected {kind}"
        ))),
    }
}

fn dehydrate_list_element(kind: FieldKind, element: serde_json::Value) -> StoreResult<Value> {
    let fail = |element: &serde_json::Value| {
        StoreError::corrupt(format!("list element {element} does not decode as {kind}"))
    };
    match kind {
        FieldKind::Boolean => element
            .as_i64()
            .map(|i| Value::Boolean(i != 0))
            .ok_or_else(|| fail(&element)),
        FieldKind::Number => element
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| fail(&element)),
        FieldKind::Date => element
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(Value::Date)
            .ok_or_else(|| fail(&element)),
        FieldKind::String => element
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| fail(&element)),
        FieldKind::Url => element
            .as_str()
            .map(|s| Value::Url(s.to_string()))
            .ok_or_else(|| fail(&element)),
        FieldKind::Embedded => match element {
            serde_json::Value::Object(map) => Ok(Value::Embedded(map)),
            other => Err(fail(&other)),
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
