//! Configuration for world construction and the row codec
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (world.toml)
//! - Environment variables (WORLD__*)
//!
//! ## Example config file (world.toml):
//! ```toml
//! [world]
//! namespace = "app"
//!
//! [validation]
//! reserved_names = ["owner"]
//! max_value_fields = 28
//! max_dynamic_fields = 5
//!
//! [codec]
//! max_dynamic_length = 1048576
//! strict_bool = true
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Hard upper bound of a dynamic field length (five-byte length slot)
pub const MAX_DYNAMIC_LENGTH: u64 = (1 << 40) - 1;

/// Most dynamic fields a header can describe
pub const MAX_DYNAMIC_FIELDS: usize = 5;

/// Most fields a layout word can describe
pub const MAX_FIELDS: usize = 28;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// World settings
    #[serde(default)]
    pub world: NamespaceConfig,

    /// Schema validation and layout limits
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Codec limits
    #[serde(default)]
    pub codec: CodecConfig,
}

/// World settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Namespace the tables are registered under (empty = root)
    #[serde(default)]
    pub namespace: String,
}

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Extra field names to reject on top of the built-in reserved set
    #[serde(default)]
    pub reserved_names: Vec<String>,

    /// Require table and field names to be identifiers
    #[serde(default = "default_true")]
    pub identifier_names: bool,

    #[serde(default = "default_max_fields")]
    pub max_key_fields: usize,

    #[serde(default = "default_max_fields")]
    pub max_value_fields: usize,

    #[serde(default = "default_max_dynamic_fields")]
    pub max_dynamic_fields: usize,

    /// Upper bound for the fixed-width block of a value
    #[serde(default = "default_max_static_length")]
    pub max_static_length: usize,
}

/// Codec configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Longest accepted dynamic field payload in bytes
    #[serde(default = "default_max_dynamic_length")]
    pub max_dynamic_length: u64,

    /// Reject bool bytes other than 0 and 1 when decoding
    #[serde(default = "default_true")]
    pub strict_bool: bool,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_fields() -> usize {
    MAX_FIELDS
}

fn default_max_dynamic_fields() -> usize {
    MAX_DYNAMIC_FIELDS
}

fn default_max_static_length() -> usize {
    u16::MAX as usize
}

fn default_max_dynamic_length() -> u64 {
    MAX_DYNAMIC_LENGTH
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            reserved_names: Vec::new(),
            identifier_names: true,
            max_key_fields: MAX_FIELDS,
            max_value_fields: MAX_FIELDS,
            max_dynamic_fields: MAX_DYNAMIC_FIELDS,
            max_static_length: default_max_static_length(),
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_dynamic_length: MAX_DYNAMIC_LENGTH,
            strict_bool: true,
        }
    }
}

impl WorldConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the defaults
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        for location in ["world.toml", ".world.toml", "config/world.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "world-schemas") {
            let xdg_config = dirs.config_dir().join("world.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Environment variables (WORLD__CODEC__STRICT_BOOL=false)
        builder = builder.add_source(
            Environment::with_prefix("WORLD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: WorldConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Check limits against what the encoding can represent
    pub fn validate(&self) -> Result<()> {
        let v = &self.validation;
        if v.max_value_fields == 0 || v.max_value_fields > MAX_FIELDS {
            return Err(SchemaError::InvalidConfig(format!(
                "max_value_fields must be in [1, {}]",
                MAX_FIELDS
            )));
        }
        if v.max_key_fields > MAX_FIELDS {
            return Err(SchemaError::InvalidConfig(format!(
                "max_key_fields must be <= {}",
                MAX_FIELDS
            )));
        }
        if v.max_dynamic_fields > MAX_DYNAMIC_FIELDS {
            return Err(SchemaError::InvalidConfig(format!(
                "max_dynamic_fields must be <= {}",
                MAX_DYNAMIC_FIELDS
            )));
        }
        if v.max_static_length == 0 || v.max_static_length > u16::MAX as usize {
            return Err(SchemaError::InvalidConfig(format!(
                "max_static_length must be in [1, {}]",
                u16::MAX
            )));
        }
        if self.codec.max_dynamic_length == 0 || self.codec.max_dynamic_length > MAX_DYNAMIC_LENGTH {
            return Err(SchemaError::InvalidConfig(format!(
                "max_dynamic_length must be in [1, {}]",
                MAX_DYNAMIC_LENGTH
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.world.namespace.is_empty());
        assert!(config.codec.strict_bool);
    }

    #[test]
    fn test_serialize_config() {
        let config = WorldConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[world]"));
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("[codec]"));
    }

    #[test]
    fn test_rejects_unrepresentable_limits() {
        let mut config = WorldConfig::default();
        config.validation.max_dynamic_fields = 6;
        assert!(matches!(config.validate(), Err(SchemaError::InvalidConfig(_))));

        let mut config = WorldConfig::default();
        config.codec.max_dynamic_length = MAX_DYNAMIC_LENGTH + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
            [world]
            namespace = "app"

            [codec]
            strict_bool = false
            "#,
        )
        .unwrap();

        let config = WorldConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.world.namespace, "app");
        assert!(!config.codec.strict_bool);
        assert_eq!(config.validation.max_dynamic_fields, MAX_DYNAMIC_FIELDS);
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = WorldConfig::default();
        config.validation.reserved_names = vec!["owner".to_string()];
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = WorldConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.validation.reserved_names, vec!["owner".to_string()]);
    }
}
