//! Integration tests for the schema-driver-catalog crate.

use std::path::Path;

use schema_driver_catalog::{CatalogError, CatalogManifest, MANIFEST_FILE, MigrationEntry, SchemaCatalog};
use schema_driver_core::Schema;
use schema_driver_sqlite::{DatabaseDriver, DriverError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SCHEMA_V3: &str = "CREATE TABLE notes (id TEXT PRIMARY KEY, body TEXT, pinned INTEGER NOT NULL DEFAULT 0, color TEXT);";
const V1_TO_V2: &str = "ALTER TABLE notes ADD COLUMN pinned INTEGER NOT NULL DEFAULT 0;";
const V2_TO_V3: &str = "ALTER TABLE notes ADD COLUMN color TEXT;";

fn write_catalog(dir: &Path, with_checksums: bool) -> CatalogManifest {
    std::fs::create_dir_all(dir.join("migrations")).unwrap();
    std::fs::write(dir.join("schema.sql"), SCHEMA_V3).unwrap();
    std::fs::write(dir.join("migrations/0001.sql"), V1_TO_V2).unwrap();
    std::fs::write(dir.join("migrations/0002.sql"), V2_TO_V3).unwrap();

    let mut manifest = CatalogManifest::new(3, "schema.sql");
    manifest
        .migrations
        .push(MigrationEntry::new(2, 3, "migrations/0002.sql"));
    manifest
        .migrations
        .push(MigrationEntry::new(1, 2, "migrations/0001.sql"));
    if with_checksums {
        manifest.record_checksums(dir).unwrap();
    }
    manifest.save(dir.join(MANIFEST_FILE)).unwrap();
    manifest
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[test]
fn test_load_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path(), false);

    let catalog = SchemaCatalog::from_dir(dir.path()).unwrap();
    assert_eq!(catalog.version(), 3);
    assert_eq!(catalog.schema().sql, SCHEMA_V3);
    assert_eq!(catalog.source(), Some(dir.path().join(MANIFEST_FILE).as_path()));

    let steps: Vec<_> = catalog.migrations().map(|s| (s.from, s.to)).collect();
    assert_eq!(steps, vec![(1, 2), (2, 3)]);
}

#[test]
fn test_load_with_valid_checksums() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_catalog(dir.path(), true);
    assert!(manifest.schema_checksum.is_some());

    assert!(SchemaCatalog::from_dir(dir.path()).is_ok());
}

#[test]
fn test_modified_migration_fails_checksum() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path(), true);
    std::fs::write(
        dir.path().join("migrations/0001.sql"),
        "ALTER TABLE notes ADD COLUMN pinned TEXT;",
    )
    .unwrap();

    let err = SchemaCatalog::from_dir(dir.path()).unwrap_err();
    assert!(
        matches!(err, CatalogError::InvalidChecksum { ref file, .. } if file == "migrations/0001.sql")
    );
}

#[test]
fn test_missing_manifest_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        SchemaCatalog::from_dir(dir.path()),
        Err(CatalogError::IoError(_))
    ));
}

#[test]
fn test_malformed_manifest_is_yaml_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(MANIFEST_FILE), "version: [oops\n").unwrap();
    assert!(matches!(
        SchemaCatalog::from_dir(dir.path()),
        Err(CatalogError::YamlError(_))
    ));
}

// ---------------------------------------------------------------------------
// Driving a database
// ---------------------------------------------------------------------------

#[test]
fn test_chain_brings_old_database_to_catalog_version() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path(), true);
    let catalog = SchemaCatalog::from_dir(dir.path()).unwrap();
    let db = dir.path().join("notes.db").to_string_lossy().into_owned();

    drop(
        DatabaseDriver::open_with_schema(
            &db,
            Schema::new(1, "CREATE TABLE notes (id TEXT PRIMARY KEY, body TEXT);"),
        )
        .unwrap(),
    );

    let from = match DatabaseDriver::open_checked(&db, catalog.version()) {
        Err(DriverError::MigrationNeeded { from }) => from,
        other => panic!("expected migration to be needed, got {:?}", other.err()),
    };
    assert_eq!(from, 1);

    let chain = catalog.migrations_from(from).unwrap();
    let mut driver = DatabaseDriver::open_with_migrations(&db, chain[0].clone()).unwrap();
    for step in &chain[1..] {
        driver.migrate(step).unwrap();
    }
    assert_eq!(driver.database_version().unwrap(), 3);
    drop(driver);

    assert!(DatabaseDriver::open_checked(&db, catalog.version()).is_ok());
}

#[test]
fn test_combined_migration_applies_in_one_step() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path(), false);
    let catalog = SchemaCatalog::from_dir(dir.path()).unwrap();
    let db = dir.path().join("notes.db").to_string_lossy().into_owned();

    drop(
        DatabaseDriver::open_with_schema(
            &db,
            Schema::new(1, "CREATE TABLE notes (id TEXT PRIMARY KEY, body TEXT);"),
        )
        .unwrap(),
    );

    let combined = catalog.combined_migration(1).unwrap().unwrap();
    let driver = DatabaseDriver::open_with_migrations(&db, combined).unwrap();
    assert_eq!(driver.database_version().unwrap(), 3);

    let columns = driver
        .query_as_array("SELECT * FROM notes", &[])
        .unwrap()
        .columns;
    assert_eq!(columns, ["id", "body", "pinned", "color"]);
}

#[test]
fn test_catalog_schema_bootstraps_fresh_database() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path(), false);
    let catalog = SchemaCatalog::from_dir(dir.path()).unwrap();

    let driver = DatabaseDriver::open_with_schema(":memory:", catalog.schema().clone()).unwrap();
    assert_eq!(driver.database_version().unwrap(), catalog.version());
}
