//! Schema, migration and batch validation.
//!
//! Catches structural defects in caller-supplied definitions before they
//! reach the database: the reserved version `0`, versions SQLite cannot
//! persist, migrations that do not move forward, empty statements, and cache
//! hints without a table.
//!
//! # Examples
//!
//! ```
//! use schema_driver_core::*;
//!
//! assert!(validate_migration_set(&MigrationSet::new(1, 2, "")).is_empty());
//!
//! // Invalid: a migration must move the version forward
//! let errors = validate_migration_set(&MigrationSet::new(3, 2, ""));
//! assert_eq!(errors, vec![ValidationError::InvalidMigrationRange { from: 3, to: 2 }]);
//! ```

use thiserror::Error;

use crate::{
    MAX_SCHEMA_VERSION, MigrationSet, Operation, Schema, SchemaVersion, UNINITIALIZED_VERSION,
};

/// Validation errors for schemas, migration sets and batches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Version `0` is reserved for uninitialized databases.
    #[error("schema version 0 is reserved for uninitialized databases")]
    ReservedSchemaVersion,
    /// Version does not fit in SQLite's signed 32-bit `user_version`.
    #[error("schema version {0} exceeds the maximum of 2147483647")]
    SchemaVersionOutOfRange(SchemaVersion),
    /// Bootstrap script is empty or whitespace-only.
    #[error("schema sql cannot be empty")]
    EmptySchemaSql,
    /// Migration does not start from an initialized version.
    #[error("migration cannot start from version 0; bootstrap the schema instead")]
    MigrationFromUninitialized,
    /// Migration target is not after its source.
    #[error("migration must move forward, got {from} -> {to}")]
    InvalidMigrationRange {
        /// Declared source version.
        from: SchemaVersion,
        /// Declared target version.
        to: SchemaVersion,
    },
    /// Operation statement is empty or whitespace-only.
    #[error("operation {index} has empty sql")]
    EmptyOperationSql {
        /// Position of the operation in the batch.
        index: usize,
    },
    /// Cache hint names an empty table.
    #[error("operation {index} has a cache behavior without a table")]
    MissingCacheTable {
        /// Position of the operation in the batch.
        index: usize,
    },
    /// Unknown numeric cache behavior in the JSON batch format.
    #[error("unknown cache behavior code: {0}")]
    UnknownCacheBehavior(i64),
}

/// Validates a bootstrap schema.
///
/// # Examples
///
/// ```
/// use schema_driver_core::*;
///
/// assert!(validate_schema(&Schema::new(1, "CREATE TABLE t (id TEXT);")).is_empty());
/// assert_eq!(
///     validate_schema(&Schema::new(0, "CREATE TABLE t (id TEXT);")),
///     vec![ValidationError::ReservedSchemaVersion]
/// );
/// ```
pub fn validate_schema(schema: &Schema) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if schema.version == UNINITIALIZED_VERSION {
        errors.push(ValidationError::ReservedSchemaVersion);
    }
    if schema.version > MAX_SCHEMA_VERSION {
        errors.push(ValidationError::SchemaVersionOutOfRange(schema.version));
    }
    if schema.sql.trim().is_empty() {
        errors.push(ValidationError::EmptySchemaSql);
    }

    errors
}

/// Validates a migration set.
///
/// An empty script is allowed: it only moves the persisted version.
pub fn validate_migration_set(set: &MigrationSet) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if set.from == UNINITIALIZED_VERSION {
        errors.push(ValidationError::MigrationFromUninitialized);
    }
    for version in [set.from, set.to] {
        if version > MAX_SCHEMA_VERSION {
            errors.push(ValidationError::SchemaVersionOutOfRange(version));
        }
    }
    if set.to <= set.from {
        errors.push(ValidationError::InvalidMigrationRange {
            from: set.from,
            to: set.to,
        });
    }

    errors
}

/// Validates every operation of a batch.
///
/// Operations without argument batches are accepted and simply execute
/// nothing.
pub fn validate_operations(operations: &[Operation]) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (index, operation) in operations.iter().enumerate() {
        if operation.sql.trim().is_empty() {
            errors.push(ValidationError::EmptyOperationSql { index });
        }
        if operation
            .cache_behavior
            .table()
            .is_some_and(|t| t.trim().is_empty())
        {
            errors.push(ValidationError::MissingCacheTable { index });
        }
    }

    errors
}
