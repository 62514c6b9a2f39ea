//! Schema — grammar, reflection, and validation.
//!
//! A schema is the structural description of the entries a store holds:
//! field names, kinds, list and nullable modifiers, and which field is the
//! index. It is resolved once per store lifetime by reconciling a persisted
//! schema with a declared template, then every entry is validated against it
//! before a backend sees the data.
//!
//! The textual grammar encodes one field per token:
//!
//! ```text
//! token := "*"? ("[" base "]" | base) "?"?
//! base  := "Boolean" | "Number" | "String" | "Date" | "URL" | "Embedded"
//! ```
//!
//! `*` marks the index (exactly one per schema), `[...]` a list, trailing `?`
//! nullable. `*` and `?` are mutually exclusive.

mod diff;
mod grammar;
mod reflect;
mod types;

pub use diff::{ChangedField, SchemaDiff};
pub use grammar::{decode_schema, decode_schema_json, decode_token, encode_schema, encode_schema_json, encode_token};
pub use reflect::{reconcile, schema_diff, schemas_equal, validate_entry};
pub use types::{FieldType, Schema, SchemaBuilder, SchemaField};
