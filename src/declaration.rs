//! Declaration types
//!
//! The raw, externally supplied description of a world: tables with ordered
//! `field: type` pairs and a key list, plus enums. Nothing here is validated;
//! see [`crate::validate`] for that.

use serde::{Deserialize, Serialize};

/// A single `name: type` pair inside a table declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub name: String,
    pub type_name: String,
}

impl FieldDeclaration {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A raw table declaration
///
/// An empty `key` declares a singleton table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDeclaration {
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<FieldDeclaration>,
    /// Key field names in key-byte order
    #[serde(default)]
    pub key: Vec<String>,
    /// Rows are emitted to indexers but not kept in storage
    #[serde(default)]
    pub offchain_only: bool,
}

impl TableDeclaration {
    /// Start a declaration with no fields and an empty key
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            key: Vec::new(),
            offchain_only: false,
        }
    }

    /// Append a field
    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(FieldDeclaration::new(name, type_name));
        self
    }

    /// Set the key field list
    pub fn key<I, S>(mut self, key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = key.into_iter().map(Into::into).collect();
        self
    }

    pub fn offchain_only(mut self, offchain_only: bool) -> Self {
        self.offchain_only = offchain_only;
        self
    }
}

/// An enum whose values are stored as a single byte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDeclaration {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumDeclaration {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }
}

/// A whole world: namespace, enums, user types and tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldDeclaration {
    /// Overrides the configured namespace when set
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub enums: Vec<EnumDeclaration>,
    /// `(name, target type)` aliases
    #[serde(default)]
    pub user_types: Vec<(String, String)>,
    #[serde(default)]
    pub tables: Vec<TableDeclaration>,
}

impl WorldDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn enum_type(mut self, decl: EnumDeclaration) -> Self {
        self.enums.push(decl);
        self
    }

    pub fn user_type(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.user_types.push((name.into(), target.into()));
        self
    }

    pub fn table(mut self, decl: TableDeclaration) -> Self {
        self.tables.push(decl);
        self
    }
}
