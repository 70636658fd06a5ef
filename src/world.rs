//! World registry
//!
//! A `World` is the immutable set of validated tables of one namespace, each
//! with its storage layout and resource id. Worlds are assembled through a
//! `WorldBuilder`, which validates and plans every table as it is registered.
//! Any failure consumes the builder, so a batch either registers completely or
//! not at all.

use std::collections::HashMap;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tracing::{debug, info};

use crate::codec::{Codec, EncodedRecord};
use crate::config::WorldConfig;
use crate::declaration::{TableDeclaration, WorldDeclaration};
use crate::error::{Result, SchemaError};
use crate::layout::{self, StorageLayout};
use crate::manifest::{TableManifest, WorldManifest};
use crate::resource::ResourceId;
use crate::schema::TableSchema;
use crate::types::TypeRegistry;
use crate::validate::SchemaValidator;
use crate::value::Row;

/// A registered table
#[derive(Debug, Clone)]
pub struct Table {
    id: ResourceId,
    schema: TableSchema,
    layout: StorageLayout,
}

impl Table {
    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }
}

/// Accumulates tables for a world
pub struct WorldBuilder {
    registry: TypeRegistry,
    config: WorldConfig,
    validator: SchemaValidator,
    namespace: String,
    tables: Vec<Table>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<ResourceId, usize>,
}

impl WorldBuilder {
    pub fn new(registry: TypeRegistry) -> Self {
        Self::assemble(registry, WorldConfig::default(), String::new())
    }

    /// Start a world with explicit limits
    ///
    /// The configuration is validated here, so limits the encoding cannot
    /// represent never reach the planner or the codec.
    pub fn with_config(registry: TypeRegistry, config: WorldConfig) -> Result<Self> {
        config.validate()?;
        let namespace = config.world.namespace.clone();
        let builder = Self::assemble(registry, config, String::new());
        builder.namespace(namespace)
    }

    fn assemble(registry: TypeRegistry, config: WorldConfig, namespace: String) -> Self {
        let validator = SchemaValidator::new(&config.validation);
        Self {
            registry,
            config,
            validator,
            namespace,
            tables: Vec::new(),
            by_name: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Set the namespace; only allowed before the first table is registered
    pub fn namespace(mut self, namespace: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        if !self.tables.is_empty() && namespace != self.namespace {
            return Err(SchemaError::InvalidName {
                name: namespace,
                reason: "namespace changed after tables were registered".to_string(),
            });
        }
        self.validator.check_namespace(&namespace)?;
        // Length limit of the resource id
        ResourceId::table(&namespace, "", false)?;
        self.namespace = namespace;
        Ok(self)
    }

    /// Validate, plan and add one table
    pub fn register(mut self, decl: TableDeclaration) -> Result<Self> {
        if self.by_name.contains_key(&decl.name) {
            return Err(SchemaError::DuplicateTable(decl.name));
        }

        let schema = self.validator.validate(&self.registry, &decl)?;
        let layout = layout::plan_with_limits(&schema, &self.config.validation)?;
        let id = ResourceId::table(&self.namespace, schema.name(), schema.offchain_only())?;

        if let Some(&existing) = self.by_id.get(&id) {
            debug!(
                table = schema.name(),
                existing = self.tables[existing].name(),
                "resource id collision"
            );
            return Err(SchemaError::DuplicateTable(decl.name));
        }

        debug!(table = schema.name(), id = %id, "registered table");
        let index = self.tables.len();
        self.by_name.insert(schema.name().to_string(), index);
        self.by_id.insert(id, index);
        self.tables.push(Table { id, schema, layout });
        Ok(self)
    }

    pub fn register_all(self, decls: impl IntoIterator<Item = TableDeclaration>) -> Result<Self> {
        decls.into_iter().try_fold(self, WorldBuilder::register)
    }

    pub fn build(self) -> World {
        info!(
            namespace = %self.namespace,
            tables = self.tables.len(),
            "world built"
        );
        World {
            namespace: self.namespace,
            registry: self.registry,
            codec: Codec::new(self.config.codec),
            config: self.config,
            tables: self.tables,
            by_name: self.by_name,
            by_id: self.by_id,
        }
    }
}

/// An immutable set of tables
#[derive(Debug)]
pub struct World {
    namespace: String,
    registry: TypeRegistry,
    config: WorldConfig,
    codec: Codec,
    tables: Vec<Table>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<ResourceId, usize>,
}

impl World {
    /// Build a world from a declaration batch
    ///
    /// Enums and user types are registered first, then every table. The
    /// declaration's namespace, when present, overrides the configured one.
    pub fn from_declaration(decl: WorldDeclaration, config: WorldConfig) -> Result<Self> {
        let mut registry = TypeRegistry::standard();
        for enum_decl in &decl.enums {
            registry.register_enum(enum_decl)?;
        }
        for (name, target) in &decl.user_types {
            registry.register_alias(name, target)?;
        }

        let mut builder = WorldBuilder::with_config(registry, config)?;
        if let Some(namespace) = decl.namespace {
            builder = builder.namespace(namespace)?;
        }
        Ok(builder.register_all(decl.tables)?.build())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Codec configured from this world's limits
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Look up a table by name
    pub fn get(&self, name: &str) -> Result<(&TableSchema, &StorageLayout)> {
        let table = self.table(name)?;
        Ok((&table.schema, &table.layout))
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        match self.by_name.get(name) {
            Some(&index) => Ok(&self.tables[index]),
            None => Err(SchemaError::UnknownTable {
                name: name.to_string(),
                suggestion: self.suggest(name),
            }),
        }
    }

    pub fn get_by_id(&self, id: &ResourceId) -> Option<&Table> {
        self.by_id.get(id).map(|&index| &self.tables[index])
    }

    /// Tables in registration order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn encode(&self, table: &str, row: &Row) -> Result<EncodedRecord> {
        let (_, layout) = self.get(table)?;
        self.codec.encode(layout, row)
    }

    pub fn decode(&self, table: &str, record: &EncodedRecord) -> Result<Row> {
        let (_, layout) = self.get(table)?;
        self.codec.decode(layout, record)
    }

    pub fn manifest(&self) -> WorldManifest {
        let tables = self
            .tables
            .iter()
            .map(|t| TableManifest::new(&t.id, &t.schema, &t.layout))
            .collect();
        WorldManifest::new(self.namespace.clone(), tables)
    }

    /// Closest registered name, if any scores at all
    fn suggest(&self, query: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default().ignore_case();
        self.tables
            .iter()
            .filter_map(|t| {
                let score = matcher
                    .fuzzy_match(t.name(), query)
                    .or_else(|| matcher.fuzzy_match(query, t.name()))?;
                Some((score, t.name()))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, name)| name.to_string())
    }
}
