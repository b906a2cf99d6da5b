//! Database driver lifecycle demo.
//!
//! Walks one database file through its whole life: first launch, writes,
//! an app upgrade that needs a migration, and a catalog that no longer has
//! a migration path.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p schema-driver-demos --example driver_lifecycle
//! ```

use schema_driver_catalog::SchemaCatalog;
use schema_driver_core::{CacheBehavior, MigrationSet, Operation, Schema, Value};
use schema_driver_sqlite::{DatabaseDriver, DriverError};

fn main() {
    let dir = std::env::temp_dir().join("schema_driver_lifecycle_demo");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let db = dir.join("notes.db").to_string_lossy().into_owned();

    let v1 = SchemaCatalog::new(
        Schema::new(
            1,
            "CREATE TABLE notes (id TEXT PRIMARY KEY, body TEXT);
             CREATE TABLE local_storage (key TEXT PRIMARY KEY, value TEXT);",
        ),
        vec![],
    )
    .unwrap();

    let v2 = SchemaCatalog::new(
        Schema::new(
            2,
            "CREATE TABLE notes (id TEXT PRIMARY KEY, body TEXT, pinned INTEGER NOT NULL DEFAULT 0);
             CREATE TABLE local_storage (key TEXT PRIMARY KEY, value TEXT);",
        ),
        vec![MigrationSet::new(
            1,
            2,
            "ALTER TABLE notes ADD COLUMN pinned INTEGER NOT NULL DEFAULT 0;",
        )],
    )
    .unwrap();

    // === Step 1: First launch ===
    println!("=== First launch (app at v1) ===");
    let mut driver = open(&db, &v1);

    let batch = [
        Operation::new(
            CacheBehavior::add_first_arg("notes"),
            "INSERT INTO notes (id, body) VALUES (?, ?)",
        )
        .with_args(vec![Value::from("n1"), Value::from("Buy milk")])
        .with_args(vec![Value::from("n2"), Value::from("Call Sam")]),
        Operation::new(
            CacheBehavior::Ignore,
            "INSERT INTO local_storage (key, value) VALUES (?, ?)",
        )
        .with_args(vec![Value::from("last_sync"), Value::from("never")]),
    ];
    let report = driver.batch(&batch).unwrap();
    println!(
        "Batch committed: {} operations, {} statements, {} rows",
        report.operations, report.statements_executed, report.rows_changed
    );
    for op in &batch {
        if let Some(table) = op.cache_behavior.table() {
            println!("  cache hint for '{table}': {:?}", op.cache_behavior);
        }
    }
    drop(driver);

    // === Step 2: App upgrade ===
    println!("\n=== Upgrade (app at v2) ===");
    let driver = open(&db, &v2);
    let ids = driver
        .query_ids("SELECT id FROM notes ORDER BY id", &[])
        .unwrap();
    println!("Notes kept across migration: {ids:?}");

    let table = driver
        .query_as_array("SELECT id, body, pinned FROM notes ORDER BY id", &[])
        .unwrap();
    println!("{}", serde_json::to_string_pretty(&table).unwrap());
    println!(
        "last_sync = {:?}",
        driver.get_local("last_sync").unwrap()
    );
    drop(driver);

    // === Step 3: Catalog without a path from the stored version ===
    println!("\n=== Downgrade (app back at v1) ===");
    let driver = open(&db, &v1);
    println!(
        "Notes after reset: {}",
        driver.count("SELECT COUNT(*) FROM notes", &[]).unwrap()
    );

    let _ = std::fs::remove_dir_all(&dir);
}

/// Opens `db` at the catalog version, setting it up or migrating as needed.
fn open(db: &str, catalog: &SchemaCatalog) -> DatabaseDriver {
    match DatabaseDriver::open_checked(db, catalog.version()) {
        Ok(driver) => {
            println!("Database is at v{}", catalog.version());
            driver
        }
        Err(DriverError::SchemaNeeded) => {
            println!("Setting up schema v{}", catalog.version());
            DatabaseDriver::open_with_schema(db, catalog.schema().clone()).unwrap()
        }
        Err(DriverError::MigrationNeeded { from }) => match catalog.combined_migration(from) {
            Ok(Some(set)) => {
                println!("Migrating v{} -> v{}", set.from, set.to);
                DatabaseDriver::open_with_migrations(db, set).unwrap()
            }
            _ => {
                println!("No migration from v{from}, setting up schema v{}", catalog.version());
                DatabaseDriver::open_with_schema(db, catalog.schema().clone()).unwrap()
            }
        },
        Err(err) => panic!("cannot open database: {err}"),
    }
}
