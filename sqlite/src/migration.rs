//! Schema setup and migration.
//!
//! Both paths run their statement batch and the version update inside one
//! transaction, so a failure leaves the persisted version and the schema
//! exactly as they were. Bootstrap additionally destroys every existing
//! schema object first; that step cannot be undone.

use schema_driver_core::{MigrationSet, Schema, validate_migration_set, validate_schema};
use tracing::info;

use crate::convert;
use crate::database::{Database, set_user_version};
use crate::error::Result;

/// Destroys everything, then creates `schema` and stamps its version.
pub(crate) fn bootstrap(database: &mut Database, schema: &Schema) -> Result<()> {
    if let Some(err) = validate_schema(schema).into_iter().next() {
        return Err(err.into());
    }

    database.unsafe_destroy_everything()?;
    database.in_transaction(|conn| {
        convert::execute_statements(conn, &schema.sql)?;
        set_user_version(conn, schema.version)
    })?;

    info!(version = schema.version, "Database schema set up");
    Ok(())
}

/// Applies `set` to a database currently at `set.from`.
///
/// # Panics
///
/// Panics if the persisted version differs from `set.from`. A migration
/// set that does not match the database is a defect in the caller's
/// migration definitions, and nothing is modified before the check.
pub(crate) fn migrate(database: &mut Database, set: &MigrationSet) -> Result<()> {
    let database_version = database.user_version()?;
    assert!(
        database_version == set.from,
        "Incompatible migration set applied. DB: {database_version}, migration: {}",
        set.from
    );

    if let Some(err) = validate_migration_set(set).into_iter().next() {
        return Err(err.into());
    }

    database.in_transaction(|conn| {
        convert::execute_statements(conn, &set.sql)?;
        set_user_version(conn, set.to)
    })?;

    info!(from = set.from, to = set.to, "Database migrated");
    Ok(())
}
