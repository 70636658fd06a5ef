//! Validated table schemas

use std::sync::Arc;

use crate::types::FieldTypeDescriptor;

/// A named field with its resolved type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub descriptor: Arc<FieldTypeDescriptor>,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, descriptor: Arc<FieldTypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }

    /// Fixed width in bytes, `None` for dynamic fields
    pub fn fixed_width(&self) -> Option<usize> {
        self.descriptor.width.fixed()
    }
}

/// Validated form of a table declaration
///
/// Field names are unique, every key name refers to a declared fixed-width
/// field, and both field and key order follow the declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    fields: Vec<SchemaField>,
    key: Vec<String>,
    offchain_only: bool,
}

impl TableSchema {
    /// Only the validator constructs schemas
    pub(crate) fn new(name: String, fields: Vec<SchemaField>, key: Vec<String>, offchain_only: bool) -> Self {
        Self {
            name,
            fields,
            key,
            offchain_only,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Key field names in key-byte order
    pub fn key(&self) -> &[String] {
        &self.key
    }

    pub fn offchain_only(&self) -> bool {
        self.offchain_only
    }

    /// A table without key fields holds exactly one row
    pub fn is_singleton(&self) -> bool {
        self.key.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.key.iter().any(|k| k == name)
    }

    /// Fields that are not part of the key, in declaration order
    pub fn value_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(move |f| !self.is_key(&f.name))
    }
}
