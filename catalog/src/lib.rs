//! Schema catalogs: the caller-side definitions a schema driver is opened
//! with.
//!
//! A catalog directory holds a `catalog.yaml` manifest plus the SQL files it
//! names: one script creating the full schema at the current version, and
//! one script per migration step. [`SchemaCatalog`] loads and validates
//! them, verifies recorded checksums, and plans migration chains.
//!
//! # Quick start
//!
//! ```
//! use schema_driver_catalog::SchemaCatalog;
//! use schema_driver_core::{MigrationSet, Schema};
//!
//! let catalog = SchemaCatalog::new(
//!     Schema::new(3, "CREATE TABLE tasks (id TEXT PRIMARY KEY, name TEXT, done INTEGER, tag TEXT);"),
//!     vec![
//!         MigrationSet::new(1, 2, "ALTER TABLE tasks ADD COLUMN done INTEGER;"),
//!         MigrationSet::new(2, 3, "ALTER TABLE tasks ADD COLUMN tag TEXT;"),
//!     ],
//! )
//! .unwrap();
//!
//! assert_eq!(catalog.version(), 3);
//! assert_eq!(catalog.migrations_from(1).unwrap().len(), 2);
//!
//! let combined = catalog.combined_migration(1).unwrap().unwrap();
//! assert_eq!((combined.from, combined.to), (1, 3));
//! ```

mod catalog;
mod error;
mod manifest;

pub use catalog::SchemaCatalog;
pub use error::{CatalogError, Result};
pub use manifest::{CatalogManifest, MANIFEST_FILE, MigrationEntry};
