//! Schema Validator
//!
//! Turns a raw [`TableDeclaration`] into a [`TableSchema`]:
//! 1. **Names**: table and field names must be identifiers and not reserved
//! 2. **Uniqueness**: no two fields (or key entries) share a name
//! 3. **Types**: every type name resolves in the registry
//! 4. **Keys**: every key name is a declared, fixed-width field
//!
//! Validation is pure; it never touches the registry beyond lookups.

use std::collections::HashSet;

use regex::Regex;

use crate::config::ValidationConfig;
use crate::declaration::TableDeclaration;
use crate::error::{Result, SchemaError};
use crate::schema::{SchemaField, TableSchema};
use crate::types::TypeRegistry;

/// Identifiers generated table libraries use for their own parameters
pub const RESERVED_NAMES: &[&str] = &["_tableId", "_keyTuple", "_fieldLayout", "_store"];

/// The table schema validator
pub struct SchemaValidator {
    identifier: Regex,
    reserved: HashSet<String>,
    identifier_names: bool,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl SchemaValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        let reserved = RESERVED_NAMES
            .iter()
            .map(|s| s.to_string())
            .chain(config.reserved_names.iter().cloned())
            .collect();

        Self {
            identifier: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap(),
            reserved,
            identifier_names: config.identifier_names,
        }
    }

    /// Validate a declaration against the registry
    pub fn validate(&self, registry: &TypeRegistry, decl: &TableDeclaration) -> Result<TableSchema> {
        let table = decl.name.as_str();
        self.check_name(table)?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            self.check_name(&field.name)?;
            if self.reserved.contains(&field.name) {
                return Err(SchemaError::ReservedName {
                    table: table.to_string(),
                    field: field.name.clone(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    table: table.to_string(),
                    field: field.name.clone(),
                });
            }

            let descriptor = registry
                .resolve(&field.type_name)
                .map_err(|e| e.in_field(table, &field.name))?;
            fields.push(SchemaField::new(field.name.clone(), descriptor));
        }

        let mut key_seen = HashSet::new();
        for key in &decl.key {
            let field = fields
                .iter()
                .find(|f| &f.name == key)
                .ok_or_else(|| SchemaError::UnknownKeyField {
                    table: table.to_string(),
                    field: key.clone(),
                })?;
            if !key_seen.insert(key.as_str()) {
                return Err(SchemaError::DuplicateKeyField {
                    table: table.to_string(),
                    field: key.clone(),
                });
            }
            if !field.descriptor.is_fixed() {
                return Err(SchemaError::DynamicKeyField {
                    table: table.to_string(),
                    field: key.clone(),
                    type_name: field.descriptor.name.clone(),
                });
            }
        }

        Ok(TableSchema::new(
            decl.name.clone(),
            fields,
            decl.key.clone(),
            decl.offchain_only,
        ))
    }

    /// Check a world namespace; the empty root namespace is allowed
    pub fn check_namespace(&self, namespace: &str) -> Result<()> {
        if namespace.is_empty() {
            return Ok(());
        }
        self.check_name(namespace)
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(SchemaError::InvalidName {
                name: name.to_string(),
                reason: "name is empty".to_string(),
            });
        }
        if self.identifier_names && !self.identifier.is_match(name) {
            return Err(SchemaError::InvalidName {
                name: name.to_string(),
                reason: "not an identifier".to_string(),
            });
        }
        Ok(())
    }
}
