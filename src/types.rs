//! Field Type Registry
//!
//! Maps type names (`bool`, `uint256`, `address`, `bytes`, `uint32[]`, ...) to
//! canonical descriptors: byte width, numeric type id and default encoding.
//!
//! Base types are registered up front. Array types are derived on lookup from
//! any registered fixed-width element type, so `resolve` never mutates the
//! registry. Enums and user type aliases are added at configuration time,
//! before the registry is handed to a `WorldBuilder`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::declaration::EnumDeclaration;
use crate::error::{Result, SchemaError};

/// Width of a field's encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteWidth {
    /// Constant number of bytes, known from the type alone
    Fixed(usize),
    /// Length varies per row and is recorded in the dynamic header
    Variable,
}

impl ByteWidth {
    pub fn fixed(&self) -> Option<usize> {
        match self {
            ByteWidth::Fixed(n) => Some(*n),
            ByteWidth::Variable => None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, ByteWidth::Fixed(_))
    }
}

/// Structural kind of a field type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    Uint { bits: u16 },
    Int { bits: u16 },
    FixedBytes { len: usize },
    Address,
    /// One-byte enum; values must be below `variants`
    Enum { name: String, variants: usize },
    Bytes,
    String,
    /// Array of a fixed-width element; `len` pins the element count
    Array {
        element: Box<FieldKind>,
        len: Option<usize>,
    },
}

impl FieldKind {
    /// Encoded width of this kind
    pub fn width(&self) -> ByteWidth {
        match self {
            FieldKind::Bool => ByteWidth::Fixed(1),
            FieldKind::Uint { bits } | FieldKind::Int { bits } => ByteWidth::Fixed(*bits as usize / 8),
            FieldKind::FixedBytes { len } => ByteWidth::Fixed(*len),
            FieldKind::Address => ByteWidth::Fixed(ADDRESS_WIDTH),
            FieldKind::Enum { .. } => ByteWidth::Fixed(1),
            FieldKind::Bytes | FieldKind::String | FieldKind::Array { .. } => ByteWidth::Variable,
        }
    }

    /// Numeric type tag used in schema words
    pub fn type_id(&self) -> u8 {
        match self {
            FieldKind::Uint { bits } => (bits / 8 - 1) as u8,
            FieldKind::Int { bits } => (32 + bits / 8 - 1) as u8,
            FieldKind::FixedBytes { len } => (64 + len - 1) as u8,
            FieldKind::Bool => 96,
            FieldKind::Address => 97,
            FieldKind::Enum { .. } => 0,
            FieldKind::Array { element, .. } => 98 + element.type_id(),
            FieldKind::Bytes => 196,
            FieldKind::String => 197,
        }
    }
}

/// Width of an address in bytes (160 bits)
pub const ADDRESS_WIDTH: usize = 20;

/// Canonical description of a field type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTypeDescriptor {
    /// Name the type is looked up by
    pub name: String,
    pub kind: FieldKind,
    pub width: ByteWidth,
    /// Encoding used when a row omits a value field
    pub default_value: Vec<u8>,
    pub type_id: u8,
}

impl FieldTypeDescriptor {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let width = kind.width();
        let default_value = match width {
            ByteWidth::Fixed(n) => vec![0u8; n],
            ByteWidth::Variable => Vec::new(),
        };
        Self {
            name: name.into(),
            type_id: kind.type_id(),
            kind,
            width,
            default_value,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.width.is_fixed()
    }
}

impl fmt::Display for FieldTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Registry of named field types
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<FieldTypeDescriptor>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl TypeRegistry {
    /// Create a registry with no types at all
    pub fn empty() -> Self {
        Self { types: HashMap::new() }
    }

    /// Create a registry holding every built-in type
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.insert(FieldTypeDescriptor::new("bool", FieldKind::Bool));
        registry.insert(FieldTypeDescriptor::new("address", FieldKind::Address));
        for bits in (8..=256u16).step_by(8) {
            registry.insert(FieldTypeDescriptor::new(format!("uint{}", bits), FieldKind::Uint { bits }));
            registry.insert(FieldTypeDescriptor::new(format!("int{}", bits), FieldKind::Int { bits }));
        }
        for len in 1..=32usize {
            registry.insert(FieldTypeDescriptor::new(format!("bytes{}", len), FieldKind::FixedBytes { len }));
        }
        registry.insert(FieldTypeDescriptor::new("bytes", FieldKind::Bytes));
        registry.insert(FieldTypeDescriptor::new("string", FieldKind::String));
        registry
    }

    fn insert(&mut self, descriptor: FieldTypeDescriptor) {
        self.types.insert(descriptor.name.clone(), Arc::new(descriptor));
    }

    /// Register a one-byte enum type
    pub fn register_enum(&mut self, decl: &EnumDeclaration) -> Result<()> {
        if self.resolve(&decl.name).is_ok() {
            return Err(SchemaError::DuplicateType(decl.name.clone()));
        }
        if decl.variants.is_empty() || decl.variants.len() > 256 {
            return Err(SchemaError::InvalidEnum {
                name: decl.name.clone(),
                reason: format!("enum must have between 1 and 256 variants, got {}", decl.variants.len()),
            });
        }
        debug!(name = %decl.name, variants = decl.variants.len(), "registered enum type");
        self.insert(FieldTypeDescriptor::new(
            decl.name.clone(),
            FieldKind::Enum {
                name: decl.name.clone(),
                variants: decl.variants.len(),
            },
        ));
        Ok(())
    }

    /// Register a user type that stores exactly like `target`
    pub fn register_alias(&mut self, name: &str, target: &str) -> Result<()> {
        if self.resolve(name).is_ok() {
            return Err(SchemaError::DuplicateType(name.to_string()));
        }
        let target = self.resolve(target)?;
        debug!(name, target = %target.name, "registered type alias");
        self.insert(FieldTypeDescriptor::new(name, target.kind.clone()));
        Ok(())
    }

    /// Look up a type by name
    pub fn resolve(&self, type_name: &str) -> Result<Arc<FieldTypeDescriptor>> {
        if let Some(descriptor) = self.types.get(type_name) {
            return Ok(Arc::clone(descriptor));
        }
        self.resolve_array(type_name)
            .map(Arc::new)
            .ok_or_else(|| SchemaError::UnknownType {
                type_name: type_name.to_string(),
                table: None,
                field: None,
            })
    }

    /// Derive `T[]` / `T[N]` from a registered fixed-width element type
    fn resolve_array(&self, type_name: &str) -> Option<FieldTypeDescriptor> {
        let inner = type_name.strip_suffix(']')?;
        let open = inner.rfind('[')?;
        let (element_name, len) = (&inner[..open], &inner[open + 1..]);

        let len = if len.is_empty() {
            None
        } else {
            let n: usize = len.parse().ok()?;
            if n == 0 {
                return None;
            }
            Some(n)
        };

        let element = self.types.get(element_name)?;
        if !element.is_fixed() {
            return None;
        }

        Some(FieldTypeDescriptor::new(
            type_name,
            FieldKind::Array {
                element: Box::new(element.kind.clone()),
                len,
            },
        ))
    }

    /// Number of registered (non-derived) types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_widths() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.resolve("bool").unwrap().width, ByteWidth::Fixed(1));
        assert_eq!(registry.resolve("address").unwrap().width, ByteWidth::Fixed(20));
        assert_eq!(registry.resolve("uint256").unwrap().width, ByteWidth::Fixed(32));
        assert_eq!(registry.resolve("int24").unwrap().width, ByteWidth::Fixed(3));
        assert_eq!(registry.resolve("bytes4").unwrap().width, ByteWidth::Fixed(4));
        assert_eq!(registry.resolve("string").unwrap().width, ByteWidth::Variable);
        assert_eq!(registry.resolve("bytes").unwrap().width, ByteWidth::Variable);
    }

    #[test]
    fn test_type_ids() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.resolve("uint8").unwrap().type_id, 0);
        assert_eq!(registry.resolve("uint256").unwrap().type_id, 31);
        assert_eq!(registry.resolve("int8").unwrap().type_id, 32);
        assert_eq!(registry.resolve("bytes32").unwrap().type_id, 95);
        assert_eq!(registry.resolve("bool").unwrap().type_id, 96);
        assert_eq!(registry.resolve("address").unwrap().type_id, 97);
        assert_eq!(registry.resolve("uint8[]").unwrap().type_id, 98);
        assert_eq!(registry.resolve("address[]").unwrap().type_id, 195);
        assert_eq!(registry.resolve("bytes").unwrap().type_id, 196);
        assert_eq!(registry.resolve("string").unwrap().type_id, 197);
    }

    #[test]
    fn test_defaults_are_zeroed() {
        let registry = TypeRegistry::standard();
        assert_eq!(registry.resolve("address").unwrap().default_value, vec![0u8; 20]);
        assert!(registry.resolve("string").unwrap().default_value.is_empty());
    }

    #[test]
    fn test_array_resolution() {
        let registry = TypeRegistry::standard();
        let dynamic = registry.resolve("uint32[]").unwrap();
        assert_eq!(dynamic.width, ByteWidth::Variable);
        assert!(matches!(dynamic.kind, FieldKind::Array { len: None, .. }));

        let pinned = registry.resolve("address[3]").unwrap();
        assert!(matches!(pinned.kind, FieldKind::Array { len: Some(3), .. }));

        assert!(registry.resolve("string[]").is_err());
        assert!(registry.resolve("uint32[][]").is_err());
        assert!(registry.resolve("uint32[0]").is_err());
        assert!(registry.resolve("uint32[x]").is_err());
    }

    #[test]
    fn test_unknown_type() {
        let registry = TypeRegistry::standard();
        assert!(matches!(
            registry.resolve("uint7"),
            Err(SchemaError::UnknownType { type_name, .. }) if type_name == "uint7"
        ));
        assert!(registry.resolve("bytes33").is_err());
    }

    #[test]
    fn test_register_enum_and_alias() {
        let mut registry = TypeRegistry::standard();
        registry
            .register_enum(&EnumDeclaration::new("Direction", ["North", "East", "South", "West"]))
            .unwrap();
        let direction = registry.resolve("Direction").unwrap();
        assert_eq!(direction.width, ByteWidth::Fixed(1));
        assert_eq!(direction.type_id, 0);

        registry.register_alias("Balance", "uint128").unwrap();
        assert_eq!(registry.resolve("Balance").unwrap().width, ByteWidth::Fixed(16));

        // Enum arrays derive like any fixed-width element
        assert!(registry.resolve("Direction[]").is_ok());

        assert!(matches!(
            registry.register_alias("uint8", "uint16"),
            Err(SchemaError::DuplicateType(_))
        ));
        assert!(matches!(
            registry.register_enum(&EnumDeclaration::new("Empty", Vec::<String>::new())),
            Err(SchemaError::InvalidEnum { .. })
        ));
        let too_many: Vec<String> = (0..257).map(|i| format!("V{}", i)).collect();
        assert!(matches!(
            registry.register_enum(&EnumDeclaration::new("Huge", too_many)),
            Err(SchemaError::InvalidEnum { ref name, .. }) if name == "Huge"
        ));
    }
}
