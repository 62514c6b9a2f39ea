//! Supported data values.
//!
//! The value space is a closed tagged union: six scalar kinds plus a list
//! and a nullable modifier. Anything outside it is rejected with
//! `UnsupportedType` before a backend ever sees it.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

// =============================================================================
// Field Kind
// =============================================================================

/// The six scalar kinds a field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// True or false
    Boolean,
    /// IEEE-754 double
    Number,
    /// UTF-8 text
    String,
    /// Absolute instant, millisecond resolution
    Date,
    /// Absolute URL, carried in canonical string form
    Url,
    /// Arbitrary JSON-serializable mapping
    Embedded,
}

impl FieldKind {
    /// Grammar spelling of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Number => "Number",
            Self::String => "String",
            Self::Date => "Date",
            Self::Url => "URL",
            Self::Embedded => "Embedded",
        }
    }

    /// Parse the grammar spelling.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Boolean" => Some(Self::Boolean),
            "Number" => Some(Self::Number),
            "String" => Some(Self::String),
            "Date" => Some(Self::Date),
            "URL" => Some(Self::Url),
            "Embedded" => Some(Self::Embedded),
            _ => None,
        }
    }

    /// Whether a field of this kind may carry the index marker.
    #[must_use]
    pub fn is_index_eligible(self) -> bool {
        matches!(self, Self::Number | Self::String | Self::Date | Self::Url)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Value
// =============================================================================

/// A runtime value held by one field of an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value in a nullable field
    Null,
    /// True or false
    Boolean(bool),
    /// IEEE-754 double
    Number(f64),
    /// UTF-8 text
    String(String),
    /// Absolute instant
    Date(DateTime<Utc>),
    /// Absolute URL in canonical string form
    Url(String),
    /// JSON-serializable mapping
    Embedded(serde_json::Map<String, serde_json::Value>),
    /// Ordered homogeneous sequence of scalars
    List(Vec<Value>),
}

impl Value {
    /// The scalar kind of this value, if it is a scalar.
    ///
    /// Returns `None` for `Null` and `List`; those are shaped by the schema,
    /// not by the value alone.
    #[must_use]
    pub fn scalar_kind(&self) -> Option<FieldKind> {
        match self {
            Self::Boolean(_) => Some(FieldKind::Boolean),
            Self::Number(_) => Some(FieldKind::Number),
            Self::String(_) => Some(FieldKind::String),
            Self::Date(_) => Some(FieldKind::Date),
            Self::Url(_) => Some(FieldKind::Url),
            Self::Embedded(_) => Some(FieldKind::Embedded),
            Self::Null | Self::List(_) => None,
        }
    }

    /// Compare two index values under their kind's natural order.
    ///
    /// Defined for the index-eligible kinds only; mismatched or ineligible
    /// kinds return `None`.
    #[must_use]
    pub fn key_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => Some(a.total_cmp(b)),
            (Self::String(a), Self::String(b)) | (Self::Url(a), Self::Url(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Render for diagnostics as a JSON value.
    ///
    /// Dates render as RFC 3339 so validation errors stay readable; this is
    /// not a storage encoding.
    #[must_use]
    pub fn to_diagnostic_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) | Self::Url(s) => serde_json::Value::String(s.clone()),
            Self::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            Self::Embedded(m) => serde_json::Value::Object(m.clone()),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_diagnostic_json).collect())
            }
        }
    }
}

// =============================================================================
// Entry
// =============================================================================

/// One record: a mapping from field name to value.
///
/// The value of the schema's index field is the entry's key.
pub type Entry = HashMap<String, Value>;

/// Render an entry as compact JSON with fields in name order.
#[must_use]
pub fn render_entry(entry: &Entry) -> String {
    let mut names: Vec<&String> = entry.keys().collect();
    names.sort();
    let mut map = serde_json::Map::new();
    for name in names {
        map.insert(name.clone(), entry[name].to_diagnostic_json());
    }
    serde_json::Value::Object(map).to_string()
}

// =============================================================================
// Field Names
// =============================================================================

/// Whether a field name matches `[A-Za-z0-9_]+`.
#[must_use]
pub fn is_compliant_key(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

// =============================================================================
// Tests
// =============================================================================
