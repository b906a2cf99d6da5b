//! SQLite driver with schema version reconciliation, transactional
//! migrations and batched writes.
//!
//! A [`DatabaseDriver`] owns one connection to one database file. Opening it
//! compares the version persisted in the file (`PRAGMA user_version`) with
//! the version the application expects and either:
//!
//! - accepts the database as is,
//! - reports [`DriverError::SchemaNeeded`] so the caller can reopen it with
//!   a bootstrap [`Schema`](schema_driver_core::Schema), or
//! - reports [`DriverError::MigrationNeeded`] so the caller can reopen it
//!   with a [`MigrationSet`](schema_driver_core::MigrationSet).
//!
//! Bootstraps, migrations and [`batch`](DatabaseDriver::batch) writes each
//! commit atomically. Two failures are deliberately not recoverable and
//! panic instead of returning an error: a bootstrap that fails while opening
//! the driver, and a migration set whose `from` version does not match the
//! database.
//!
//! # Architecture
//!
//! - **`database`**: connection wrapper, version slot and transactions
//! - **`reconcile`**: pure version classification
//! - **`migration`**: bootstrap and migration execution
//! - **`driver`**: construction modes and lifecycle
//! - **`query`** / **`local`**: reads, batched writes and local storage
//! - **`config`** / **`path`**: open options and name resolution
//!
//! # Quick start
//!
//! ```
//! use schema_driver_core::{CacheBehavior, Operation, Schema, Value};
//! use schema_driver_sqlite::{DatabaseDriver, DriverError};
//!
//! let schema = Schema::new(
//!     1,
//!     "CREATE TABLE local_storage (key TEXT PRIMARY KEY, value TEXT);",
//! );
//!
//! // A fresh database has no schema yet.
//! assert!(matches!(
//!     DatabaseDriver::open_checked(":memory:", 1),
//!     Err(DriverError::SchemaNeeded)
//! ));
//!
//! let mut driver = DatabaseDriver::open_with_schema(":memory:", schema).unwrap();
//! driver
//!     .batch(&[Operation::new(
//!         CacheBehavior::Ignore,
//!         "INSERT INTO local_storage (key, value) VALUES (?, ?)",
//!     )
//!     .with_args(vec![Value::from("theme"), Value::from("dark")])])
//!     .unwrap();
//!
//! assert_eq!(driver.get_local("theme").unwrap().as_deref(), Some("dark"));
//! ```

mod config;
mod convert;
mod database;
mod driver;
mod error;
mod local;
mod migration;
mod path;
mod query;
mod reconcile;

pub use config::{DowngradePolicy, DriverConfig};
pub use database::Database;
pub use driver::{DatabaseDriver, OpenMode};
pub use error::{DriverError, Result};
pub use path::{DEFAULT_APP_DIR, resolve_database_path};
pub use query::BatchReport;
pub use reconcile::{SchemaCompatibility, SetupReason, classify};
