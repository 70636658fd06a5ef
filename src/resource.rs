//! Table resource identifiers
//!
//! Every table is addressed by a 32-byte id:
//!
//! ```text
//! [0..2]   resource type  ("tb" stored table, "ot" offchain table)
//! [2..16]  namespace      (right-padded with zeros)
//! [16..32] table name     (truncated to 16 bytes, right-padded)
//! ```

use std::fmt;

use alloy_primitives::B256;

use crate::error::{Result, SchemaError};

pub const TABLE_TYPE: [u8; 2] = *b"tb";
pub const OFFCHAIN_TABLE_TYPE: [u8; 2] = *b"ot";

pub const NAMESPACE_BYTES: usize = 14;
pub const NAME_BYTES: usize = 16;

/// 32-byte resource id of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(B256);

impl ResourceId {
    /// Build the id of a table; names longer than 16 bytes are truncated
    pub fn table(namespace: &str, name: &str, offchain_only: bool) -> Result<Self> {
        if namespace.len() > NAMESPACE_BYTES {
            return Err(SchemaError::InvalidName {
                name: namespace.to_string(),
                reason: format!("namespace longer than {} bytes", NAMESPACE_BYTES),
            });
        }

        let mut word = [0u8; 32];
        word[0..2].copy_from_slice(if offchain_only { &OFFCHAIN_TABLE_TYPE } else { &TABLE_TYPE });
        word[2..2 + namespace.len()].copy_from_slice(namespace.as_bytes());
        let name = &name.as_bytes()[..name.len().min(NAME_BYTES)];
        word[16..16 + name.len()].copy_from_slice(name);
        Ok(Self(B256::from(word)))
    }

    pub fn resource_type(&self) -> [u8; 2] {
        [self.0[0], self.0[1]]
    }

    pub fn is_offchain(&self) -> bool {
        self.resource_type() == OFFCHAIN_TABLE_TYPE
    }

    /// Namespace with padding stripped
    pub fn namespace(&self) -> String {
        trim_padding(&self.0[2..16])
    }

    /// Table name (possibly truncated) with padding stripped
    pub fn name(&self) -> String {
        trim_padding(&self.0[16..32])
    }

    pub fn as_word(&self) -> &B256 {
        &self.0
    }
}

fn trim_padding(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|b| *b != 0).map(|i| i + 1).unwrap_or(0);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_namespace_table() {
        let id = ResourceId::table("", "EntryPoint", false).unwrap();
        assert_eq!(id.resource_type(), *b"tb");
        assert_eq!(id.namespace(), "");
        assert_eq!(id.name(), "EntryPoint");
        assert_eq!(&id.as_word()[16..26], b"EntryPoint");
        assert!(id.as_word()[2..16].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_offchain_and_namespace() {
        let id = ResourceId::table("app", "Events", true).unwrap();
        assert!(id.is_offchain());
        assert_eq!(id.namespace(), "app");
    }

    #[test]
    fn test_name_truncated() {
        let id = ResourceId::table("", "AVeryLongTableNameIndeed", false).unwrap();
        assert_eq!(id.name(), "AVeryLongTableNa");
    }

    #[test]
    fn test_namespace_too_long() {
        assert!(matches!(
            ResourceId::table("fifteen_letters", "T", false),
            Err(SchemaError::InvalidName { .. })
        ));
    }
}
