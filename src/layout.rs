//! Layout Planner
//!
//! Partitions a [`TableSchema`] into key fields, fixed-width value fields and
//! dynamic value fields, and assigns byte offsets and ordinals.
//!
//! ```text
//! key bytes:   [key 0][key 1]...                      (key-list order)
//! value bytes: [fixed block][lengths header][dyn 0][dyn 1]...
//!               ^ offsets      ^ only if any dynamic field
//! ```
//!
//! Fixed fields are packed without padding in declaration order. Value slots
//! number the fixed fields first and the dynamic fields after them.

use alloy_primitives::B256;
use tracing::debug;

use crate::config::{ValidationConfig, MAX_DYNAMIC_FIELDS, MAX_FIELDS};
use crate::error::{Result, SchemaError};
use crate::schema::{SchemaField, TableSchema};

/// A key field and where it sits inside the key bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySlot {
    pub field: SchemaField,
    pub offset: usize,
    pub width: usize,
}

/// A fixed-width value field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSlot {
    pub field: SchemaField,
    /// Value slot index
    pub slot: usize,
    /// Byte offset inside the fixed block
    pub offset: usize,
    pub width: usize,
}

/// A dynamic value field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicSlot {
    pub field: SchemaField,
    /// Value slot index
    pub slot: usize,
    /// Position in the lengths header and payload sequence
    pub ordinal: usize,
}

/// Where a named field lives in an encoded record
#[derive(Debug, Clone, Copy)]
pub enum FieldPosition<'a> {
    Key(&'a KeySlot),
    Fixed(&'a FixedSlot),
    Dynamic(&'a DynamicSlot),
}

/// Storage plan for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    table: String,
    key_fields: Vec<KeySlot>,
    fixed_fields: Vec<FixedSlot>,
    dynamic_fields: Vec<DynamicSlot>,
    key_length: usize,
    static_length: usize,
}

/// Plan a layout with the default limits
pub fn plan(schema: &TableSchema) -> Result<StorageLayout> {
    plan_with_limits(schema, &ValidationConfig::default())
}

/// Plan a layout, enforcing the given field-count and size limits
///
/// Limits above what the layout word and lengths header can describe are
/// capped at the encoding's own bounds.
pub fn plan_with_limits(schema: &TableSchema, limits: &ValidationConfig) -> Result<StorageLayout> {
    let table = schema.name();
    if schema.fields().is_empty() {
        return Err(SchemaError::EmptySchema(table.to_string()));
    }

    let mut key_fields = Vec::with_capacity(schema.key().len());
    let mut key_length = 0;
    for name in schema.key() {
        // The validator guarantees key fields exist and are fixed-width
        let (field, width) = schema
            .field(name)
            .and_then(|f| f.fixed_width().map(|w| (f, w)))
            .ok_or_else(|| SchemaError::UnknownKeyField {
                table: table.to_string(),
                field: name.clone(),
            })?;
        key_fields.push(KeySlot {
            field: field.clone(),
            offset: key_length,
            width,
        });
        key_length += width;
    }

    let mut fixed_fields = Vec::new();
    let mut dynamic = Vec::new();
    let mut static_length = 0;
    for field in schema.value_fields() {
        match field.fixed_width() {
            Some(width) => {
                fixed_fields.push(FixedSlot {
                    field: field.clone(),
                    slot: fixed_fields.len(),
                    offset: static_length,
                    width,
                });
                static_length += width;
            }
            None => dynamic.push(field.clone()),
        }
    }

    let fixed_count = fixed_fields.len();
    let dynamic_fields: Vec<_> = dynamic
        .into_iter()
        .enumerate()
        .map(|(ordinal, field)| DynamicSlot {
            field,
            slot: fixed_count + ordinal,
            ordinal,
        })
        .collect();

    let limit = |reason: String| SchemaError::LayoutLimit {
        table: table.to_string(),
        reason,
    };
    let max_key_fields = limits.max_key_fields.min(MAX_FIELDS);
    let max_value_fields = limits.max_value_fields.min(MAX_FIELDS);
    let max_dynamic_fields = limits.max_dynamic_fields.min(MAX_DYNAMIC_FIELDS);
    let max_static_length = limits.max_static_length.min(u16::MAX as usize);

    if key_fields.len() > max_key_fields {
        return Err(limit(format!(
            "{} key fields exceeds limit of {}",
            key_fields.len(),
            max_key_fields
        )));
    }
    let value_count = fixed_count + dynamic_fields.len();
    if value_count > max_value_fields {
        return Err(limit(format!(
            "{} value fields exceeds limit of {}",
            value_count, max_value_fields
        )));
    }
    if dynamic_fields.len() > max_dynamic_fields {
        return Err(limit(format!(
            "{} dynamic fields exceeds limit of {}",
            dynamic_fields.len(),
            max_dynamic_fields
        )));
    }
    if static_length > max_static_length {
        return Err(limit(format!(
            "fixed block of {} bytes exceeds limit of {}",
            static_length, max_static_length
        )));
    }

    debug!(
        table,
        keys = key_fields.len(),
        fixed = fixed_count,
        dynamic = dynamic_fields.len(),
        static_length,
        "planned storage layout"
    );

    Ok(StorageLayout {
        table: table.to_string(),
        key_fields,
        fixed_fields,
        dynamic_fields,
        key_length,
        static_length,
    })
}

impl StorageLayout {
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Key fields in key-byte order
    pub fn key_fields(&self) -> &[KeySlot] {
        &self.key_fields
    }

    pub fn fixed_fields(&self) -> &[FixedSlot] {
        &self.fixed_fields
    }

    pub fn dynamic_fields(&self) -> &[DynamicSlot] {
        &self.dynamic_fields
    }

    /// Exact length of encoded key bytes
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    /// Length of the fixed block at the start of value bytes
    pub fn static_length(&self) -> usize {
        self.static_length
    }

    pub fn has_dynamic_fields(&self) -> bool {
        !self.dynamic_fields.is_empty()
    }

    /// A layout without key fields stores a single row
    pub fn is_singleton(&self) -> bool {
        self.key_fields.is_empty()
    }

    /// Total number of fields across key, fixed and dynamic partitions
    pub fn field_count(&self) -> usize {
        self.key_fields.len() + self.fixed_fields.len() + self.dynamic_fields.len()
    }

    /// Find a field by name
    pub fn position(&self, name: &str) -> Option<FieldPosition<'_>> {
        if let Some(slot) = self.key_fields.iter().find(|s| s.field.name == name) {
            return Some(FieldPosition::Key(slot));
        }
        if let Some(slot) = self.fixed_fields.iter().find(|s| s.field.name == name) {
            return Some(FieldPosition::Fixed(slot));
        }
        self.dynamic_fields
            .iter()
            .find(|s| s.field.name == name)
            .map(FieldPosition::Dynamic)
    }

    /// Packed field layout word
    ///
    /// `[0..2]` fixed block length, `[2]` fixed count, `[3]` dynamic count,
    /// `[4..]` width of each fixed field.
    pub fn field_layout(&self) -> B256 {
        let widths = self.fixed_fields.iter().map(|s| s.width as u8);
        pack_word(self.static_length, self.fixed_fields.len(), self.dynamic_fields.len(), widths)
    }

    /// Schema word of the value fields: counts followed by type ids in slot order
    pub fn value_schema(&self) -> B256 {
        let ids = self
            .fixed_fields
            .iter()
            .map(|s| &s.field)
            .chain(self.dynamic_fields.iter().map(|s| &s.field))
            .map(|f| f.descriptor.type_id);
        pack_word(self.static_length, self.fixed_fields.len(), self.dynamic_fields.len(), ids)
    }

    /// Schema word of the key fields
    pub fn key_schema(&self) -> B256 {
        let ids = self.key_fields.iter().map(|s| s.field.descriptor.type_id);
        pack_word(self.key_length, self.key_fields.len(), 0, ids)
    }
}

fn pack_word(length: usize, fixed: usize, dynamic: usize, entries: impl Iterator<Item = u8>) -> B256 {
    let mut word = [0u8; 32];
    word[0..2].copy_from_slice(&(length as u16).to_be_bytes());
    word[2] = fixed as u8;
    word[3] = dynamic as u8;
    for (slot, entry) in word[4..].iter_mut().zip(entries) {
        *slot = entry;
    }
    B256::from(word)
}
