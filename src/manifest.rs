//! World manifest
//!
//! A serializable summary of every table layout in a world, with SHA256
//! fingerprints. Backends persist the manifest next to their data and compare
//! fingerprints on startup to detect layout drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::layout::StorageLayout;
use crate::resource::ResourceId;
use crate::schema::TableSchema;

/// One field as it appears in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestField {
    pub name: String,
    pub type_name: String,
}

/// Layout summary of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableManifest {
    pub name: String,
    pub resource_id: String,
    pub offchain_only: bool,
    pub key: Vec<ManifestField>,
    /// Value fields in slot order
    pub values: Vec<ManifestField>,
    pub field_layout: String,
    pub key_schema: String,
    pub value_schema: String,
    pub checksum: Checksum,
}

impl TableManifest {
    pub fn new(id: &ResourceId, schema: &TableSchema, layout: &StorageLayout) -> Self {
        let field = |f: &crate::schema::SchemaField| ManifestField {
            name: f.name.clone(),
            type_name: f.descriptor.name.clone(),
        };

        let field_layout = layout.field_layout();
        let key_schema = layout.key_schema();
        let value_schema = layout.value_schema();
        let checksum = Checksum::from_parts([
            id.as_word().as_slice(),
            field_layout.as_slice(),
            key_schema.as_slice(),
            value_schema.as_slice(),
        ]);

        Self {
            name: schema.name().to_string(),
            resource_id: id.to_string(),
            offchain_only: schema.offchain_only(),
            key: layout.key_fields().iter().map(|s| field(&s.field)).collect(),
            values: layout
                .fixed_fields()
                .iter()
                .map(|s| field(&s.field))
                .chain(layout.dynamic_fields().iter().map(|s| field(&s.field)))
                .collect(),
            field_layout: field_layout.to_string(),
            key_schema: key_schema.to_string(),
            value_schema: value_schema.to_string(),
            checksum,
        }
    }
}

/// Manifest of a whole world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldManifest {
    pub namespace: String,
    pub generated_at: DateTime<Utc>,
    pub tables: Vec<TableManifest>,
    /// Hash of all table checksums in registration order
    pub checksum: Checksum,
}

impl WorldManifest {
    pub fn new(namespace: impl Into<String>, tables: Vec<TableManifest>) -> Self {
        let checksum = Checksum::from_parts(tables.iter().map(|t| t.checksum.as_str().as_bytes()));
        Self {
            namespace: namespace.into(),
            generated_at: Utc::now(),
            tables,
            checksum,
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableManifest> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// True when both manifests describe identical layouts
    pub fn same_layout(&self, other: &WorldManifest) -> bool {
        self.checksum == other.checksum
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
