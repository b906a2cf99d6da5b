//! Error types for driver operations.
//!
//! Construction signals ([`SchemaNeeded`](DriverError::SchemaNeeded),
//! [`MigrationNeeded`](DriverError::MigrationNeeded)) share this type with
//! recoverable execution failures. Precondition violations and failed
//! bootstraps during construction are not represented here: they panic.

use schema_driver_core::{SchemaVersion, ValidationError};
use thiserror::Error;

/// Errors that can occur while opening or using a database.
#[derive(Debug, Error)]
pub enum DriverError {
    /// SQLite failure outside of a specific statement.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// The database file could not be opened.
    #[error("failed to open database at '{path}': {source}")]
    OpenError {
        /// Resolved path or URI.
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The database has no usable schema; open it again with a bootstrap
    /// schema.
    #[error("database needs to be set up with a schema")]
    SchemaNeeded,

    /// The database is at an older version; open it again with a migration
    /// set starting at `from`.
    #[error("database at version {from} needs a migration")]
    MigrationNeeded {
        /// Version currently persisted in the database.
        from: SchemaVersion,
    },

    /// The database is newer than the application and the configured
    /// downgrade policy refuses to reset it.
    #[error(
        "database version {database_version} is newer than the supported version {app_version}"
    )]
    DatabaseNewer {
        /// Version persisted in the database.
        database_version: SchemaVersion,
        /// Version the application expects.
        app_version: SchemaVersion,
    },

    /// A read statement failed to prepare or run.
    #[error("query failed: {source} (sql: {sql})")]
    QueryError {
        /// Offending statement.
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A write statement or statement batch failed.
    #[error("execution failed: {source} (sql: {sql})")]
    ExecutionError {
        /// Offending statement.
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// An id query returned a row without a usable `id` column.
    #[error("failed to get id of a record (sql: {sql})")]
    MissingId {
        /// Offending statement.
        sql: String,
    },

    /// A count query did not return exactly one column in one row.
    #[error("count query must return a single value (sql: {sql})")]
    InvalidCount {
        /// Offending statement.
        sql: String,
    },

    /// The persisted version does not fit a [`SchemaVersion`].
    #[error("stored schema version {0} is out of range")]
    InvalidStoredVersion(i64),

    /// A schema or migration set failed validation.
    #[error("invalid definition: {0}")]
    InvalidDefinition(#[from] ValidationError),

    /// A JSON batch could not be decoded.
    #[error("invalid batch: {0}")]
    BatchFormat(#[from] serde_json::Error),

    /// No directory is available to resolve a bare database name.
    #[error("no data directory available to resolve database name '{0}'")]
    NoDataDirectory(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl DriverError {
    /// Returns `true` for the construction signals that ask the caller to
    /// bootstrap or migrate.
    pub fn is_classification(&self) -> bool {
        matches!(self, Self::SchemaNeeded | Self::MigrationNeeded { .. })
    }

    /// Statement the error is attached to, if any.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::QueryError { sql, .. }
            | Self::ExecutionError { sql, .. }
            | Self::MissingId { sql }
            | Self::InvalidCount { sql } => Some(sql),
            _ => None,
        }
    }
}

/// Convenience alias for results with [`DriverError`].
pub type Result<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_signals() {
        assert!(DriverError::SchemaNeeded.is_classification());
        assert!(DriverError::MigrationNeeded { from: 2 }.is_classification());
        assert!(!DriverError::NoDataDirectory("x".into()).is_classification());
    }

    #[test]
    fn test_execution_error_carries_statement() {
        let err = DriverError::ExecutionError {
            sql: "INSERT INTO nope VALUES (1)".into(),
            source: rusqlite::Error::InvalidQuery,
        };
        assert_eq!(err.sql(), Some("INSERT INTO nope VALUES (1)"));
        assert!(err.to_string().contains("INSERT INTO nope"));
    }
}
