//! Error types for catalog loading.

use schema_driver_core::{SchemaVersion, ValidationError};
use thiserror::Error;

/// Errors that can occur while loading or planning with a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Manifest is structurally wrong (duplicate steps, steps past the
    /// schema version, ...).
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// A SQL file does not match the checksum recorded in the manifest.
    #[error("invalid checksum for {file}: expected {expected}, found {actual}")]
    InvalidChecksum {
        /// SQL file path as written in the manifest.
        file: String,
        /// Checksum recorded in the manifest.
        expected: String,
        /// Checksum of the file on disk.
        actual: String,
    },

    /// A schema or migration set failed validation.
    #[error("invalid definition: {0}")]
    InvalidDefinition(#[from] ValidationError),

    /// No chain of migration steps leads from `from` to `to`.
    #[error("no migration path from version {from} to {to}")]
    MissingMigration {
        /// Version the database is at.
        from: SchemaVersion,
        /// Version of the catalog schema.
        to: SchemaVersion,
    },
}

/// Convenience alias for results with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
