//! World Integration Tests
//!
//! End-to-end checks from declarations through layouts to encoded records.

use std::collections::HashSet;

use alloy_primitives::{Address, U256};
use world_schemas::{
    EnumDeclaration, EncodedRecord, FieldPosition, Row, SchemaError, TableDeclaration,
    TypeRegistry, Value, World, WorldBuilder, WorldConfig, WorldDeclaration,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn entry_point() -> TableDeclaration {
    TableDeclaration::new("EntryPoint").field("addr", "address")
}

fn game_world() -> World {
    let decl = WorldDeclaration::new()
        .namespace("game")
        .enum_type(EnumDeclaration::new("Terrain", ["Grass", "Water", "Rock"]))
        .table(entry_point())
        .table(
            TableDeclaration::new("Tile")
                .field("x", "int32")
                .field("y", "int32")
                .field("terrain", "Terrain")
                .field("label", "string")
                .field("walkable", "bool")
                .field("visitors", "address[]")
                .key(["x", "y"]),
        )
        .table(
            TableDeclaration::new("Inventory")
                .field("owner", "address")
                .field("item", "uint32")
                .field("amount", "uint128")
                .field("meta", "bytes")
                .key(["owner", "item"]),
        );
    World::from_declaration(decl, WorldConfig::default()).unwrap()
}

// =============================================================================
// Canonical Single-Table World
// =============================================================================

#[test]
fn test_entry_point_scenario() {
    init_tracing();

    let world = WorldBuilder::new(TypeRegistry::standard())
        .register(entry_point())
        .unwrap()
        .build();

    let (schema, layout) = world.get("EntryPoint").unwrap();
    // Empty key is treated as a singleton table
    assert!(schema.is_singleton());
    assert!(layout.key_fields().is_empty());
    assert_eq!(layout.fixed_fields().len(), 1);
    assert_eq!(layout.fixed_fields()[0].offset, 0);
    assert_eq!(layout.fixed_fields()[0].width, 20);
    assert!(layout.dynamic_fields().is_empty());

    let addr = Address::with_last_byte(1);
    let row = Row::new().with("addr", addr);
    let record = world.encode("EntryPoint", &row).unwrap();

    assert!(record.key.is_empty());
    let mut expected = vec![0u8; 20];
    expected[19] = 1;
    assert_eq!(record.value, expected);

    assert_eq!(world.decode("EntryPoint", &record).unwrap(), row);
}

#[test]
fn test_duplicate_entry_point_leaves_no_world() {
    let result = WorldBuilder::new(TypeRegistry::standard())
        .register_all([entry_point(), entry_point()])
        .map(WorldBuilder::build);

    match result {
        Err(SchemaError::DuplicateTable(name)) => assert_eq!(name, "EntryPoint"),
        Err(other) => panic!("expected DuplicateTable, got {}", other),
        Ok(_) => panic!("world built despite duplicate table"),
    }
}

#[test]
fn test_from_declaration_is_all_or_nothing() {
    let decl = WorldDeclaration::new()
        .table(entry_point())
        .table(TableDeclaration::new("Broken").field("v", "uint7"));

    let err = World::from_declaration(decl, WorldConfig::default()).unwrap_err();
    assert!(matches!(err, SchemaError::UnknownType { ref type_name, .. } if type_name == "uint7"));
}

// =============================================================================
// Validation Errors
// =============================================================================

#[test]
fn test_unknown_key_field() {
    let result = WorldBuilder::new(TypeRegistry::standard())
        .register(entry_point().key(["owner"]));
    assert!(matches!(result, Err(SchemaError::UnknownKeyField { .. })));
}

#[test]
fn test_duplicate_field() {
    let result = WorldBuilder::new(TypeRegistry::standard())
        .register(entry_point().field("addr", "uint256"));
    assert!(matches!(result, Err(SchemaError::DuplicateField { .. })));
}

// =============================================================================
// Layout Properties
// =============================================================================

#[test]
fn test_layout_partitions_fields() {
    let world = game_world();

    for table in world.tables() {
        let layout = table.layout();
        let mut seen = HashSet::new();
        let placed = layout
            .key_fields()
            .iter()
            .map(|s| s.field.name.clone())
            .chain(layout.fixed_fields().iter().map(|s| s.field.name.clone()))
            .chain(layout.dynamic_fields().iter().map(|s| s.field.name.clone()));
        for name in placed {
            assert!(seen.insert(name.clone()), "{} placed twice in {}", name, table.name());
        }

        let declared: HashSet<String> = table.schema().fields().iter().map(|f| f.name.clone()).collect();
        assert_eq!(seen, declared, "partition of {}", table.name());
    }
}

#[test]
fn test_fixed_offsets_are_packed() {
    let world = game_world();

    for table in world.tables() {
        let layout = table.layout();
        let mut next = 0;
        for slot in layout.fixed_fields() {
            assert_eq!(slot.offset, next, "gap before {}", slot.field.name);
            next += slot.width;
        }
        assert_eq!(next, layout.static_length());
    }
}

#[test]
fn test_positions_cover_every_field() {
    let world = game_world();
    let (schema, layout) = world.get("Tile").unwrap();

    for field in schema.fields() {
        let position = layout.position(&field.name).unwrap();
        match position {
            FieldPosition::Key(_) => assert!(schema.is_key(&field.name)),
            FieldPosition::Fixed(_) => assert!(field.fixed_width().is_some()),
            FieldPosition::Dynamic(_) => assert!(field.fixed_width().is_none()),
        }
    }
}

// =============================================================================
// Round Trips
// =============================================================================

#[test]
fn test_tile_round_trip() {
    init_tracing();
    let world = game_world();

    let row = Row::new()
        .with("x", Value::int(-7))
        .with("y", Value::int(12))
        .with("terrain", U256::from(2u64))
        .with("label", "mountain pass")
        .with("walkable", false)
        .with(
            "visitors",
            Value::Array(vec![
                Value::Address(Address::with_last_byte(1)),
                Value::Address(Address::with_last_byte(2)),
            ]),
        );

    let record = world.encode("Tile", &row).unwrap();
    assert_eq!(record.key.len(), 8);

    let (_, layout) = world.get("Tile").unwrap();
    assert_eq!(layout.static_length(), 2);
    // fixed block + header + label + two addresses
    assert_eq!(record.value.len(), 2 + 32 + 13 + 40);

    assert_eq!(world.decode("Tile", &record).unwrap(), row);
}

#[test]
fn test_inventory_round_trip_with_defaults() {
    let world = game_world();
    let owner = Address::with_last_byte(9);

    let row = Row::new().with("owner", owner).with("item", 3u64);
    let record = world.encode("Inventory", &row).unwrap();
    let decoded = world.decode("Inventory", &record).unwrap();

    assert_eq!(decoded.get("owner"), Some(&Value::Address(owner)));
    assert_eq!(decoded.get("amount"), Some(&Value::Uint(U256::ZERO)));
    assert_eq!(decoded.get("meta"), Some(&Value::Bytes(Vec::new())));
}

#[test]
fn test_enum_out_of_range_rejected() {
    let world = game_world();
    let row = Row::new()
        .with("x", Value::int(0))
        .with("y", Value::int(0))
        .with("terrain", U256::from(3u64));
    assert!(matches!(
        world.encode("Tile", &row),
        Err(SchemaError::InvalidValue { ref field, .. }) if field == "terrain"
    ));
}

#[test]
fn test_malformed_record_rejected() {
    let world = game_world();
    let record = EncodedRecord {
        key: Vec::new(),
        value: vec![0u8; 19],
    };
    assert!(matches!(
        world.decode("EntryPoint", &record),
        Err(SchemaError::MalformedRecord { .. })
    ));
}

// =============================================================================
// Manifest
// =============================================================================

#[test]
fn test_manifest_fingerprints_stable() {
    let a = game_world().manifest();
    let b = game_world().manifest();
    assert!(a.same_layout(&b));
    assert_eq!(a.tables.len(), 3);
    assert_eq!(a.table("Tile").unwrap().key.len(), 2);

    let json = a.to_json().unwrap();
    let parsed = world_schemas::WorldManifest::from_json(&json).unwrap();
    assert_eq!(parsed.checksum, a.checksum);
}

#[test]
fn test_manifest_changes_with_schema() {
    let narrow = WorldBuilder::new(TypeRegistry::standard())
        .register(TableDeclaration::new("Counter").field("value", "uint32"))
        .unwrap()
        .build();
    let wide = WorldBuilder::new(TypeRegistry::standard())
        .register(TableDeclaration::new("Counter").field("value", "uint64"))
        .unwrap()
        .build();

    let (a, b) = (narrow.manifest(), wide.manifest());
    assert_ne!(a.tables[0].checksum, b.tables[0].checksum);
    assert!(!a.same_layout(&b));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_parallel_codec_use() {
    let world = game_world();

    std::thread::scope(|s| {
        for i in 0..4u8 {
            let world = &world;
            s.spawn(move || {
                let row = Row::new().with("addr", Address::with_last_byte(i));
                let record = world.encode("EntryPoint", &row).unwrap();
                assert_eq!(world.decode("EntryPoint", &record).unwrap(), row);
            });
        }
    });
}
