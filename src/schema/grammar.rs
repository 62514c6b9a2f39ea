//! The textual schema grammar.
//!
//! `encode_schema` and `decode_schema` are inverses over well-formed
//! schemas; `decode_token` rejects anything outside the grammar with
//! `TypeUndetermined`.

use crate::error::{StoreError, StoreResult};
use crate::value::FieldKind;

use super::types::{FieldType, Schema, SchemaField};

// =============================================================================
// Token Level
// =============================================================================

/// Encode one field's type triple as a grammar token.
#[must_use]
pub fn encode_token(ty: &FieldType, is_index: bool) -> String {
    let base = if ty.is_list {
        format!("[{}]", ty.kind.as_str())
    } else {
        ty.kind.as_str().to_string()
    };
    match (is_index, ty.is_nullable) {
        (true, _) => format!("*{base}"),
        (false, true) => format!("{base}?"),
        (false, false) => base,
    }
}

/// Decode one grammar token into a type triple and the index marker.
///
/// # Errors
///
/// [`StoreError::TypeUndetermined`] on anything outside the grammar,
/// including the forbidden `*`/`?` combination.
pub fn decode_token(token: &str) -> StoreResult<(FieldType, bool)> {
    let mut rest = token;

    let is_index = rest.starts_with('*');
    if is_index {
        rest = &rest[1..];
    }
    let is_nullable = rest.ends_with('?');
    if is_nullable {
        rest = &rest[..rest.len() - 1];
    }
    if is_index && is_nullable {
        return Err(StoreError::undetermined(token));
    }

    let is_list = rest.starts_with('[') && rest.ends_with(']') && rest.len() >= 2;
    if is_list {
        rest = &rest[1..rest.len() - 1];
    }

    let Some(kind) = FieldKind::parse(rest) else {
        return Err(StoreError::undetermined(token));
    };

    Ok((
        FieldType {
            kind,
            is_list,
            is_nullable,
        },
        is_index,
    ))
}

// =============================================================================
// Schema Level
// =============================================================================

/// Encode a schema as ordered `(field name, token)` pairs.
#[must_use]
pub fn encode_schema(schema: &Schema) -> Vec<(String, String)> {
    schema
        .fields()
        .iter()
        .map(|f| {
            (
                f.name.clone(),
                encode_token(&f.ty, f.name == schema.index()),
            )
        })
        .collect()
}

/// Encode a schema as a single JSON object, keys in declaration order.
///
/// This is the persisted `schema.json` form.
#[must_use]
pub fn encode_schema_json(schema: &Schema) -> String {
    let mut map = serde_json::Map::new();
    for (name, token) in encode_schema(schema) {
        map.insert(name, serde_json::Value::String(token));
    }
    serde_json::Value::Object(map).to_string()
}

/// Decode ordered `(field name, token)` pairs into a schema.
///
/// # Errors
///
/// [`StoreError::TypeUndetermined`] on a malformed token,
/// [`StoreError::NonCompliantKey`] on a bad field name, and
/// [`StoreError::Corrupt`] when the index marker does not appear exactly
/// once.
pub fn decode_schema(pairs: &[(String, String)]) -> StoreResult<Schema> {
    let mut index: Option<String> = None;
    let mut fields = Vec::with_capacity(pairs.len());

    for (name, token) in pairs {
        let (ty, is_index) = decode_token(token)?;
        if is_index {
            if index.is_some() {
                return Err(StoreError::corrupt(
                    "schema declares more than one index field",
                ));
            }
            index = Some(name.clone());
        }
        fields.push(SchemaField {
            name: name.clone(),
            ty,
        });
    }

    let Some(index) = index else {
        return Err(StoreError::corrupt("schema declares no index field"));
    };
    Schema::new(index, fields)
}

/// Decode the persisted `schema.json` form.
///
/// # Errors
///
/// [`StoreError::Corrupt`] when the text is not a JSON object of strings,
/// plus everything [`decode_schema`] rejects.
pub fn decode_schema_json(text: &str) -> StoreResult<Schema> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| StoreError::corrupt(format!("schema file is not valid JSON: {e}")))?;
    let serde_json::Value::Object(map) = value else {
        return Err(StoreError::corrupt("schema file is not a JSON object"));
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (name, token) in map {
        let serde_json::Value::String(token) = token else {
            return Err(StoreError::corrupt(format!(
                "schema entry {name:?} is not a string token"
            )));
        };
        pairs.push((name, token));
    }
    decode_schema(&pairs)
}

// =============================================================================
// Tests
// =============================================================================
