//! Schema version reconciliation.
//!
//! Decides, from the persisted version alone, whether a database can be
//! used as is, must be set up from scratch, or must be migrated.

use schema_driver_core::{SchemaVersion, UNINITIALIZED_VERSION};

/// Why a database needs a full bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupReason {
    /// The database has never been set up.
    Uninitialized,
    /// The database was written by a newer application version.
    NewerDatabase {
        /// Version persisted in the database.
        database_version: SchemaVersion,
    },
}

/// Outcome of comparing the persisted and expected schema versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCompatibility {
    /// Versions match; the database is ready.
    Compatible,
    /// The database must be bootstrapped.
    NeedsSetup(SetupReason),
    /// The database must be migrated starting at `from`.
    NeedsMigration {
        /// Version persisted in the database.
        from: SchemaVersion,
    },
}

/// Classifies a database. First match wins:
///
/// 1. persisted == expected → [`Compatible`](SchemaCompatibility::Compatible)
/// 2. persisted == 0 → [`NeedsSetup`](SchemaCompatibility::NeedsSetup)
/// 3. persisted < expected → [`NeedsMigration`](SchemaCompatibility::NeedsMigration)
/// 4. persisted > expected → [`NeedsSetup`](SchemaCompatibility::NeedsSetup)
///
/// # Examples
///
/// ```
/// use schema_driver_sqlite::{SchemaCompatibility, SetupReason, classify};
///
/// assert_eq!(classify(3, 3), SchemaCompatibility::Compatible);
/// assert_eq!(classify(0, 3), SchemaCompatibility::NeedsSetup(SetupReason::Uninitialized));
/// assert_eq!(classify(1, 3), SchemaCompatibility::NeedsMigration { from: 1 });
/// assert_eq!(
///     classify(5, 3),
///     SchemaCompatibility::NeedsSetup(SetupReason::NewerDatabase { database_version: 5 })
/// );
/// ```
pub fn classify(
    database_version: SchemaVersion,
    expected_version: SchemaVersion,
) -> SchemaCompatibility {
    if database_version == expected_version {
        SchemaCompatibility::Compatible
    } else if database_version == UNINITIALIZED_VERSION {
        SchemaCompatibility::NeedsSetup(SetupReason::Uninitialized)
    } else if database_version < expected_version {
        SchemaCompatibility::NeedsMigration {
            from: database_version,
        }
    } else {
        SchemaCompatibility::NeedsSetup(SetupReason::NewerDatabase { database_version })
    }
}
