//! World Schemas
//!
//! Schema compiler and row codec for key/value world tables. Table
//! declarations are validated against a registry of field types, planned into
//! a compact storage layout, gathered into an immutable `World`, and used to
//! encode typed rows into `{key, value}` byte records and back.
//!
//! ## Record layout
//!
//! ```text
//! key   = key fields, each at its fixed width, in key-list order
//! value = fixed-width value fields
//!       | 32-byte lengths header   (only with dynamic fields)
//!       | dynamic payloads         (in declaration order)
//! ```
//!
//! ## Example
//!
//! ```
//! use world_schemas::{Row, TableDeclaration, TypeRegistry, WorldBuilder};
//! use alloy_primitives::Address;
//!
//! let world = WorldBuilder::new(TypeRegistry::standard())
//!     .register(TableDeclaration::new("EntryPoint").field("addr", "address"))?
//!     .build();
//!
//! let row = Row::new().with("addr", Address::with_last_byte(1));
//! let record = world.encode("EntryPoint", &row)?;
//! assert!(record.key.is_empty());
//! assert_eq!(record.value.len(), 20);
//! # Ok::<(), world_schemas::SchemaError>(())
//! ```

pub mod checksum;
pub mod codec;
pub mod config;
pub mod declaration;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod resource;
pub mod schema;
pub mod types;
pub mod validate;
pub mod value;
pub mod world;

pub use checksum::Checksum;
pub use codec::{Codec, EncodedLengths, EncodedRecord};
pub use config::{CodecConfig, ValidationConfig, WorldConfig};
pub use declaration::{EnumDeclaration, FieldDeclaration, TableDeclaration, WorldDeclaration};
pub use error::{Result, SchemaError};
pub use layout::{plan, FieldPosition, StorageLayout};
pub use manifest::{TableManifest, WorldManifest};
pub use resource::ResourceId;
pub use schema::{SchemaField, TableSchema};
pub use types::{ByteWidth, FieldKind, FieldTypeDescriptor, TypeRegistry};
pub use validate::SchemaValidator;
pub use value::{Row, Value};
pub use world::{Table, World, WorldBuilder};
