//! Core types and validation for the versioned SQLite schema driver.
//!
//! This crate defines the data model shared by the driver, the schema
//! catalog and the command line front end:
//!
//! - [`Schema`]: a full bootstrap script and the version it establishes.
//! - [`MigrationSet`]: an incremental `from → to` upgrade script.
//! - [`Operation`]: one write statement with its ordered argument batches
//!   and the [`CacheBehavior`] metadata the caller attached to it.
//! - [`Value`], [`Record`] and [`RecordTable`]: values bound to and read
//!   back from SQLite rows.
//!
//! Validation ([`validate_schema`], [`validate_migration_set`],
//! [`validate_operations`]) catches structural defects such as the reserved
//! version `0` or a migration that does not move forward.
//!
//! The JSON batch wire format ([`operations_from_json`],
//! [`operations_to_json`]) encodes each operation as
//! `[cacheBehavior, table, sql, [[args...], ...]]`.
//!
//! # Example
//!
//! ```
//! use schema_driver_core::*;
//!
//! let schema = Schema::new(1, "CREATE TABLE tasks (id TEXT PRIMARY KEY, name TEXT);");
//! assert!(validate_schema(&schema).is_empty());
//!
//! let insert = Operation::new(
//!     CacheBehavior::add_first_arg("tasks"),
//!     "INSERT INTO tasks (id, name) VALUES (?, ?)",
//! )
//! .with_args(vec![Value::from("t1"), Value::from("Write docs")]);
//!
//! assert_eq!(insert.cache_behavior.table(), Some("tasks"));
//! assert!(validate_operations(&[insert]).is_empty());
//! ```

mod types;
mod validate;
mod wire;

pub use types::*;
pub use validate::{
    ValidationError, validate_migration_set, validate_operations, validate_schema,
};
pub use wire::{operations_from_json, operations_to_json};
