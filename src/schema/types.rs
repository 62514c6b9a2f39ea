//! Schema data types and the template builder.

use crate::error::{StoreError, StoreResult};
use crate::value::{is_compliant_key, FieldKind};

// =============================================================================
// Field Type
// =============================================================================

/// The type triple of one field: base kind plus list and nullable modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldType {
    /// Base scalar kind
    pub kind: FieldKind,
    /// Whether the field holds an ordered homogeneous sequence
    pub is_list: bool,
    /// Whether the value may be absent
    pub is_nullable: bool,
}

impl FieldType {
    /// A plain scalar field of the given kind.
    #[must_use]
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            is_list: false,
            is_nullable: false,
        }
    }

    /// Mark this field as a list.
    #[must_use]
    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Mark this field as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }
}

// =============================================================================
// Schema
// =============================================================================

/// One named, typed field of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    /// Field name, `[A-Za-z0-9_]+`
    pub name: String,
    /// The field's type triple
    pub ty: FieldType,
}

/// The structural description of a store's entries.
///
/// Field order is declaration order; it drives column order on the CSV
/// backend and column definitions on the relational backend. Structural
/// equality between schemas is order-insensitive; see
/// [`schemas_equal`](crate::schema::schemas_equal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    index: String,
    fields: Vec<SchemaField>,
}

impl Schema {
    /// Build a schema from an index name and a field list.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NonCompliantKey`] when a field name violates the name rule
    /// - [`StoreError::TypeUndetermined`] when the index field's type cannot
    ///   carry the index marker (ineligible kind, list, or nullable)
    /// - [`StoreError::Corrupt`] on duplicate field names or when the index
    ///   field is not in the field list
    pub fn new(index: impl Into<String>, fields: Vec<SchemaField>) -> StoreResult<Self> {
        let index = index.into();

        for field in &fields {
            if !is_compliant_key(&field.name) {
                return Err(StoreError::non_compliant_key(&field.name));
            }
        }
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(StoreError::corrupt(format!(
                    "duplicate field {:?} in schema",
                    field.name
                )));
            }
        }

        let Some(index_field) = fields.iter().find(|f| f.name == index) else {
            return Err(StoreError::corrupt(format!(
                "index field {index:?} is not declared in the schema"
            )));
        };
        let ty = index_field.ty;
        if !ty.kind.is_index_eligible() || ty.is_list || ty.is_nullable {
            return Err(StoreError::undetermined(super::encode_token(&ty, true)));
        }

        Ok(Self { index, fields })
    }

    /// Start declaring a template: the index field comes first.
    #[must_use]
    pub fn builder(index: impl Into<String>, kind: FieldKind) -> SchemaBuilder {
        let index = index.into();
        SchemaBuilder {
            index: index.clone(),
            fields: vec![SchemaField {
                name: index,
                ty: FieldType::new(kind),
            }],
        }
    }

    /// Name of the index field.
    #[must_use]
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Type triple of the index field.
    #[must_use]
    pub fn index_type(&self) -> FieldType {
        self.fields
            .iter()
            .find(|f| f.name == self.index)
            .map(|f| f.ty)
            .unwrap_or_else(|| unreachable!("index field is validated at construction"))
    }

    /// All fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Field names in declaration order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Look up one field's type triple.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldType> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.ty)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Declares an entry template field by field.
///
/// # Example
///
/// ```
/// use tidemark::{FieldKind, FieldType, Schema};
///
/// let template = Schema::builder("timestamp", FieldKind::Date)
///     .field("value", FieldType::new(FieldKind::String))
///     .field("tags", FieldType::new(FieldKind::String).list().nullable())
///     .build()
///     .unwrap();
/// assert_eq!(template.index(), "timestamp");
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    index: String,
    fields: Vec<SchemaField>,
}

impl SchemaBuilder {
    /// Declare one more field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(SchemaField {
            name: name.into(),
            ty,
        });
        self
    }

    /// Validate and produce the schema.
    ///
    /// # Errors
    ///
    /// Same as [`Schema::new`].
    pub fn build(self) -> StoreResult<Schema> {
        Schema::new(self.index, self.fields)
    }
}

// =============================================================================
// Tests
// =============================================================================
