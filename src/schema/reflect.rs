//! Schema reflection and validation.
//!
//! Two derivation paths produce a schema-shaped result: from a declared
//! template (the builder in [`types`](super::types)) and from a concrete
//! entry (here), the latter carrying no index marker and used only to
//! validate against a known schema.

use crate::error::{StoreError, StoreResult};
use crate::value::{is_compliant_key, render_entry, Entry, Value};

use super::diff::SchemaDiff;
use super::grammar::{encode_schema, encode_token};
use super::types::{FieldType, Schema};

// =============================================================================
// Value Classification
// =============================================================================

/// The derived shape of one runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Derived {
    /// The null marker
    Null,
    /// A list with no elements; its kind comes from the schema
    EmptyList,
    /// A fully determined triple
    Typed(FieldType),
}

impl Derived {
    /// Token-like rendering for diagnostics.
    fn render(self) -> String {
        match self {
            Self::Null => "Null".to_string(),
            Self::EmptyList => "[]".to_string(),
            Self::Typed(ty) => encode_token(&ty, false),
        }
    }
}

/// Classify a runtime value into a derived shape.
///
/// # Errors
///
/// [`StoreError::UnsupportedType`] when the value is neither a recognized
/// scalar nor a homogeneous list of scalars.
fn derive_value(name: &str, value: &Value) -> StoreResult<Derived> {
    match value {
        Value::Null => Ok(Derived::Null),
        Value::List(items) => {
            let mut kind = None;
            for item in items {
                let Some(item_kind) = item.scalar_kind() else {
                    return Err(StoreError::unsupported(format!(
                        "field {name:?}: lists hold scalars, found {item:?}"
                    )));
                };
                match kind {
                    None => kind = Some(item_kind),
                    Some(k) if k == item_kind => {}
                    Some(k) => {
                        return Err(StoreError::unsupported(format!(
                            "field {name:?}: list mixes {k} and {item_kind}"
                        )));
                    }
                }
            }
            match kind {
                None => Ok(Derived::EmptyList),
                Some(kind) => Ok(Derived::Typed(FieldType::new(kind).list())),
            }
        }
        scalar => {
            let kind = scalar
                .scalar_kind()
                .unwrap_or_else(|| unreachable!("all non-null, non-list values are scalars"));
            Ok(Derived::Typed(FieldType::new(kind)))
        }
    }
}

// =============================================================================
// Entry Validation
// =============================================================================

/// Validate one entry against a resolved schema.
///
/// Structural equality of the derived and expected type maps, with one
/// relaxation: a nullable expected field accepts either a present value of
/// the declared kind or the absent/null marker.
///
/// # Errors
///
/// - [`StoreError::NonCompliantKey`] when an entry key violates the name rule
/// - [`StoreError::UnsupportedType`] when a value cannot be classified
/// - [`StoreError::Validation`] with a structural diff otherwise
pub fn validate_entry(schema: &Schema, entry: &Entry) -> StoreResult<()> {
    for name in entry.keys() {
        if !is_compliant_key(name) {
            return Err(StoreError::non_compliant_key(name));
        }
    }

    let mut diff = SchemaDiff::default();

    for field in schema.fields() {
        let expected = encode_token(&field.ty, field.name == schema.index());
        match entry.get(&field.name) {
            None => {
                if !field.ty.is_nullable {
                    diff.push_missing(&field.name, expected);
                }
            }
            Some(value) => {
                let derived = derive_value(&field.name, value)?;
                let accepted = match derived {
                    Derived::Null => field.ty.is_nullable,
                    Derived::EmptyList => field.ty.is_list,
                    Derived::Typed(ty) => {
                        ty.kind == field.ty.kind && ty.is_list == field.ty.is_list
                    }
                };
                if !accepted {
                    diff.push_changed(&field.name, expected, derived.render());
                }
            }
        }
    }

    for (name, value) in entry {
        if schema.field(name).is_none() {
            let derived = derive_value(name, value)?;
            diff.push_unexpected(name, derived.render());
        }
    }

    if diff.is_empty() {
        Ok(())
    } else {
        Err(StoreError::Validation {
            diff,
            entry: render_entry(entry),
        })
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Order-insensitive structural equality of two schemas.
#[must_use]
pub fn schemas_equal(a: &Schema, b: &Schema) -> bool {
    schema_diff(a, b).is_empty()
}

/// Structural diff of two schemas, computed over their grammar tokens.
///
/// Index divergence shows up as a changed token because the tokens carry
/// the `*` marker.
#[must_use]
pub fn schema_diff(expected: &Schema, actual: &Schema) -> SchemaDiff {
    SchemaDiff::between(&encode_schema(expected), &encode_schema(actual))
}

/// Resolve the schema a store will use for its lifetime.
///
/// # Errors
///
/// - [`StoreError::MissingSchema`] when neither side exists
/// - [`StoreError::SchemaMismatched`] when both exist and differ
pub fn reconcile(stored: Option<Schema>, template: Option<&Schema>) -> StoreResult<Schema> {
    match (stored, template) {
        (None, None) => Err(StoreError::MissingSchema),
        (Some(stored), None) => Ok(stored),
        (None, Some(template)) => Ok(template.clone()),
        (Some(stored), Some(template)) => {
            let diff = schema_diff(&stored, template);
            if diff.is_empty() {
                Ok(stored)
            } else {
                Err(StoreError::SchemaMismatched { diff })
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
