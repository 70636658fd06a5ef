//! Error types for schema compilation and row encoding

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema compiler and codec errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown type '{type_name}'{}", location(.table, .field))]
    UnknownType {
        type_name: String,
        table: Option<String>,
        field: Option<String>,
    },

    #[error("Type already registered: {0}")]
    DuplicateType(String),

    #[error("Invalid enum {name}: {reason}")]
    InvalidEnum { name: String, reason: String },

    #[error("Duplicate field '{field}' in table {table}")]
    DuplicateField { table: String, field: String },

    #[error("Key field '{field}' listed more than once in table {table}")]
    DuplicateKeyField { table: String, field: String },

    #[error("Key field '{field}' is not declared in table {table}")]
    UnknownKeyField { table: String, field: String },

    #[error("Key field '{field}' in table {table} has variable-width type {type_name}")]
    DynamicKeyField {
        table: String,
        field: String,
        type_name: String,
    },

    #[error("Field name '{field}' in table {table} is reserved")]
    ReservedName { table: String, field: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Table {0} declares no fields")]
    EmptySchema(String),

    #[error("Layout limit exceeded in table {table}: {reason}")]
    LayoutLimit { table: String, reason: String },

    #[error("Table already registered: {0}")]
    DuplicateTable(String),

    #[error("Unknown table: {name}{}", suggestion_hint(.suggestion))]
    UnknownTable {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Missing value for key field '{field}' in table {table}")]
    MissingKeyField { table: String, field: String },

    #[error("Field '{field}' is not part of table {table}")]
    UnknownField { table: String, field: String },

    #[error("Type mismatch for {table}.{field}: expected {expected}, got {found}")]
    TypeMismatch {
        table: String,
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("Invalid value for {table}.{field}: {reason}")]
    InvalidValue {
        table: String,
        field: String,
        reason: String,
    },

    #[error("Malformed record for table {table}: {reason}")]
    MalformedRecord { table: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SchemaError {
    /// Attach table/field context to an `UnknownType` raised by the registry.
    pub(crate) fn in_field(self, table: &str, field: &str) -> Self {
        match self {
            SchemaError::UnknownType { type_name, .. } => SchemaError::UnknownType {
                type_name,
                table: Some(table.to_string()),
                field: Some(field.to_string()),
            },
            other => other,
        }
    }

    pub(crate) fn malformed(table: &str, reason: impl Into<String>) -> Self {
        SchemaError::MalformedRecord {
            table: table.to_string(),
            reason: reason.into(),
        }
    }
}

fn location(table: &Option<String>, field: &Option<String>) -> String {
    match (table, field) {
        (Some(table), Some(field)) => format!(" for field {}.{}", table, field),
        (Some(table), None) => format!(" in table {}", table),
        _ => String::new(),
    }
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean {}?)", s))
        .unwrap_or_default()
}
