//! Store errors.
//!
//! One taxonomy for the whole crate, surfaced to callers verbatim. There is
//! no retry and no fallback at this layer.

use thiserror::Error;

use crate::schema::SchemaDiff;

/// Errors from store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Neither a template nor a persisted schema is available.
    #[error("no schema available: supply a template or open a store that has one persisted")]
    MissingSchema,

    /// Declared template and persisted schema differ.
    #[error("declared template does not match the stored schema:\n{diff}")]
    SchemaMismatched {
        /// Structural difference between the two schemas
        diff: SchemaDiff,
    },

    /// Submitted entry does not conform to the schema.
    #[error("entry does not conform to the schema:\n{diff}\nentry: {entry}")]
    Validation {
        /// Structural difference between the derived and expected type maps
        diff: SchemaDiff,
        /// Offending entry, rendered as JSON
        entry: String,
    },

    /// A value cannot be hydrated into any backend-native form.
    #[error("unsupported value: {detail}")]
    UnsupportedType {
        /// What was seen and where
        detail: String,
    },

    /// A declared field kind could not be resolved.
    #[error("cannot resolve declared type {token:?}")]
    TypeUndetermined {
        /// The grammar token that failed to parse
        token: String,
    },

    /// A field name violates the `[A-Za-z0-9_]+` rule.
    #[error("field name {name:?} must match [A-Za-z0-9_]+")]
    NonCompliantKey {
        /// The offending field name
        name: String,
    },

    /// Storage adapter fault.
    #[error("storage fault: {message}")]
    Storage {
        /// Fault description from the adapter
        message: String,
    },

    /// Embedded database fault.
    #[error("database fault: {message}")]
    Database {
        /// Fault description from the driver
        message: String,
    },

    /// Persisted data that cannot be parsed back.
    #[error("corrupt data: {message}")]
    Corrupt {
        /// What failed to parse
        message: String,
    },
}

impl StoreError {
    /// Create an unsupported-type error.
    #[must_use]
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::UnsupportedType {
            detail: detail.into(),
        }
    }

    /// Create a type-undetermined error.
    #[must_use]
    pub fn undetermined(token: impl Into<String>) -> Self {
        Self::TypeUndetermined {
            token: token.into(),
        }
    }

    /// Create a non-compliant key error.
    #[must_use]
    pub fn non_compliant_key(name: impl Into<String>) -> Self {
        Self::NonCompliantKey { name: name.into() }
    }

    /// Create a storage fault.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a database fault.
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create a corrupt-data error.
    #[must_use]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
