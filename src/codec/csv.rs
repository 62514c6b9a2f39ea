//! CSV text codec.
//!
//! Per-value encoding: `Boolean -> "0"|"1"`, `Number -> decimal`,
//! `String -> verbatim`, `Date -> seconds-since-epoch decimal` (fractional
//! seconds permitted), `URL -> canonical string`, `Embedded -> JSON`. Lists
//! hydrate to a JSON-encoded array of element-hydrated strings. The null
//! marker hydrates to the empty cell.

use chrono::{DateTime, TimeZone, Utc};

use crate::constants::TIME_MS_PER_SEC;
use crate::error::{StoreError, StoreResult};
use crate::schema::FieldType;
use crate::value::{FieldKind, Value};

// =============================================================================
// Hydrate
// =============================================================================

/// Encode one value as CSV cell text.
///
/// # Errors
///
/// [`StoreError::UnsupportedType`] when the value is neither a recognized
/// scalar nor a list of such.
pub fn hydrate(value: &Value) -> StoreResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::List(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                elements.push(hydrate_scalar(item)?);
            }
            serde_json::to_string(&elements)
                .map_err(|e| StoreError::unsupported(format!("list does not serialize: {e}")))
        }
        scalar => hydrate_scalar(scalar),
    }
}

fn hydrate_scalar(value: &Value) -> StoreResult<String> {
    match value {
        Value::Boolean(true) => Ok("1".to_string()),
        Value::Boolean(false) => Ok("0".to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) | Value::Url(s) => Ok(s.clone()),
        Value::Date(d) => Ok(hydrate_date(*d)),
        Value::Embedded(map) => serde_json::to_string(map)
            .map_err(|e| StoreError::unsupported(format!("embedded does not serialize: {e}"))),
        Value::Null | Value::List(_) => Err(StoreError::unsupported(format!(
            "{value:?} is not a scalar"
        ))),
    }
}

/// Seconds-since-epoch, integral when the instant is whole seconds.
fn hydrate_date(d: DateTime<Utc>) -> String {
    let ms = d.timestamp_millis();
    if ms % TIME_MS_PER_SEC == 0 {
        (ms / TIME_MS_PER_SEC).to_string()
    } else {
        #[allow(clippy::cast_precision_loss)]
        let seconds = ms as f64 / 1000.0;
        seconds.to_string()
    }
}

// =============================================================================
// Dehydrate
// =============================================================================

/// Decode one CSV cell back into a value of the given triple.
///
/// An empty cell in a nullable field reads as the null marker.
///
/// # Errors
///
/// [`StoreError::Corrupt`] when the text does not parse under the triple.
pub fn dehydrate(ty: &FieldType, text: &str) -> StoreResult<Value> {
    if ty.is_nullable && text.is_empty() {
        return Ok(Value::Null);
    }
    if ty.is_list {
        let elements: Vec<String> = serde_json::from_str(text)
            .map_err(|e| StoreError::corrupt(format!("list cell {text:?}: {e}")))?;
        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            items.push(dehydrate_scalar(ty.kind, &element)?);
        }
        return Ok(Value::List(items));
    }
    dehydrate_scalar(ty.kind, text)
}

fn dehydrate_scalar(kind: FieldKind, text: &str) -> StoreResult<Value> {
    match kind {
        FieldKind::Boolean => match text {
            "0" => Ok(Value::Boolean(false)),
            "1" => Ok(Value::Boolean(true)),
            other => Err(StoreError::corrupt(format!(
                "boolean cell must be 0 or 1, found {other:?}"
            ))),
        },
        FieldKind::Number => text
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|e| StoreError::corrupt(format!("number cell {text:?}: {e}"))),
        FieldKind::String => Ok(Value::String(text.to_string())),
        FieldKind::Url => Ok(Value::Url(text.to_string())),
        FieldKind::Date => dehydrate_date(text),
        FieldKind::Embedded => {
            let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(text)
                .map_err(|e| StoreError::corrupt(format!("embedded cell {text:?}: {e}")))?;
            Ok(Value::Embedded(map))
        }
    }
}

fn dehydrate_date(text: &str) -> StoreResult<Value> {
    let seconds = text
        .parse::<f64>()
        .map_err(|e| StoreError::corrupt(format!("date cell {text:?}: {e}")))?;
    #[allow(clippy::cast_possible_truncation)]
    let ms = (seconds * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(Value::Date)
        .ok_or_else(|| StoreError::corrupt(format!("date cell {text:?} is out of range")))
}

// =============================================================================
// Tests
// =============================================================================
