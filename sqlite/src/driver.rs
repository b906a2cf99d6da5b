//! Driver construction and lifecycle.
//!
//! A [`DatabaseDriver`] only exists once its database is ready: opening
//! reconciles the persisted schema version exactly once and either
//! succeeds, bootstraps, migrates, or hands the caller a typed signal
//! ([`SchemaNeeded`](DriverError::SchemaNeeded),
//! [`MigrationNeeded`](DriverError::MigrationNeeded)) telling it how to open
//! the database instead.
//!
//! # Example
//!
//! ```no_run
//! use schema_driver_core::{MigrationSet, Schema};
//! use schema_driver_sqlite::{DatabaseDriver, DriverError};
//!
//! let schema = Schema::new(2, "CREATE TABLE tasks (id TEXT PRIMARY KEY, name TEXT, done INTEGER);");
//! let driver = match DatabaseDriver::open_checked("tasks", 2) {
//!     Ok(driver) => driver,
//!     Err(DriverError::SchemaNeeded) => DatabaseDriver::open_with_schema("tasks", schema).unwrap(),
//!     Err(DriverError::MigrationNeeded { from: 1 }) => DatabaseDriver::open_with_migrations(
//!         "tasks",
//!         MigrationSet::new(1, 2, "ALTER TABLE tasks ADD COLUMN done INTEGER;"),
//!     )
//!     .unwrap(),
//!     Err(err) => panic!("cannot open database: {err}"),
//! };
//! assert_eq!(driver.database_version().unwrap(), 2);
//! ```

use schema_driver_core::{MigrationSet, Schema, SchemaVersion};
use tracing::{debug, warn};

use crate::config::{DowngradePolicy, DriverConfig};
use crate::database::Database;
use crate::error::{DriverError, Result};
use crate::migration;
use crate::path::resolve_database_path;
use crate::reconcile::{SchemaCompatibility, SetupReason, classify};

/// How [`DatabaseDriver::open`] brings the database to a ready state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenMode {
    /// Only check that the persisted version matches.
    Check(SchemaVersion),
    /// Destroy whatever is there and set up this schema.
    Bootstrap(Schema),
    /// Apply this migration set to the persisted version.
    Migrate(MigrationSet),
}

/// Ready-to-use driver owning one database connection.
pub struct DatabaseDriver {
    pub(crate) database: Database,
}

impl DatabaseDriver {
    /// Opens a database with the default [`DriverConfig`].
    ///
    /// See [`open_with_config`](Self::open_with_config).
    pub fn open(name: &str, mode: OpenMode) -> Result<Self> {
        Self::open_with_config(name, mode, &DriverConfig::default())
    }

    /// Opens `name` and brings it to a ready state according to `mode`.
    ///
    /// # Errors
    ///
    /// - [`DriverError::SchemaNeeded`] / [`DriverError::MigrationNeeded`]
    ///   when `mode` is [`OpenMode::Check`] and the versions differ.
    /// - [`DriverError::DatabaseNewer`] when the database is newer and the
    ///   downgrade policy is [`DowngradePolicy::Refuse`].
    /// - Any execution error of an [`OpenMode::Migrate`] script; the
    ///   migration is rolled back.
    ///
    /// # Panics
    ///
    /// Panics if an [`OpenMode::Bootstrap`] fails, since a partially
    /// recreated schema is not safe to continue from, and if an
    /// [`OpenMode::Migrate`] set does not start at the persisted version.
    pub fn open_with_config(name: &str, mode: OpenMode, config: &DriverConfig) -> Result<Self> {
        let path = resolve_database_path(name, config.data_dir.as_deref())?;
        let mut database = Database::open(&path, config)?;

        match mode {
            OpenMode::Check(expected) => check(&database, expected, config.downgrade_policy)?,
            OpenMode::Bootstrap(schema) => {
                if let Err(err) = migration::bootstrap(&mut database, &schema) {
                    panic!("Error while setting up the database: {err}");
                }
            }
            OpenMode::Migrate(set) => migration::migrate(&mut database, &set)?,
        }

        Ok(Self { database })
    }

    /// Opens a database that must already be at `version`.
    pub fn open_checked(name: &str, version: SchemaVersion) -> Result<Self> {
        Self::open(name, OpenMode::Check(version))
    }

    /// Opens a database and sets it up from scratch with `schema`.
    ///
    /// Only fails if the file cannot be opened; a failed setup panics.
    pub fn open_with_schema(name: &str, schema: Schema) -> Result<Self> {
        Self::open(name, OpenMode::Bootstrap(schema))
    }

    /// Opens a database and applies `set` to it.
    pub fn open_with_migrations(name: &str, set: MigrationSet) -> Result<Self> {
        Self::open(name, OpenMode::Migrate(set))
    }

    /// Destroys every schema object and sets up `schema` again.
    ///
    /// Unlike a bootstrap during construction, a failure here is returned.
    /// The old schema is gone either way.
    pub fn unsafe_reset_database(&mut self, schema: &Schema) -> Result<()> {
        migration::bootstrap(&mut self.database, schema)
    }

    /// Applies one more migration step to a ready database.
    ///
    /// Use this to walk a chain of migration sets one at a time.
    ///
    /// # Panics
    ///
    /// Panics if `set.from` is not the persisted version.
    pub fn migrate(&mut self, set: &MigrationSet) -> Result<()> {
        migration::migrate(&mut self.database, set)
    }

    /// Currently persisted schema version.
    pub fn database_version(&self) -> Result<SchemaVersion> {
        self.database.user_version()
    }

    /// Path or URI the database was opened with.
    pub fn path(&self) -> &str {
        self.database.path()
    }

    /// Closes the underlying connection, reporting failures.
    pub fn close(self) -> Result<()> {
        self.database.close()
    }
}

fn check(database: &Database, expected: SchemaVersion, policy: DowngradePolicy) -> Result<()> {
    let database_version = database.user_version()?;
    debug!(database_version, expected, "Checking schema compatibility");

    match classify(database_version, expected) {
        SchemaCompatibility::Compatible => Ok(()),
        SchemaCompatibility::NeedsSetup(SetupReason::Uninitialized) => Err(DriverError::SchemaNeeded),
        SchemaCompatibility::NeedsSetup(SetupReason::NewerDatabase { database_version }) => {
            match policy {
                DowngradePolicy::Reset => {
                    warn!(
                        database_version,
                        app_version = expected,
                        "Database has newer version than what the app supports. Will reset database."
                    );
                    Err(DriverError::SchemaNeeded)
                }
                DowngradePolicy::Refuse => Err(DriverError::DatabaseNewer {
                    database_version,
                    app_version: expected,
                }),
            }
        }
        SchemaCompatibility::NeedsMigration { from } => Err(DriverError::MigrationNeeded { from }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQL_V1: &str = "CREATE TABLE t (id TEXT PRIMARY KEY);";

    fn file_db() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driver.db").to_string_lossy().into_owned();
        (dir, path)
    }

    #[test]
    fn test_check_on_fresh_database_needs_schema() {
        assert!(matches!(
            DatabaseDriver::open_checked(":memory:", 1),
            Err(DriverError::SchemaNeeded)
        ));
    }

    #[test]
    fn test_bootstrap_sets_version() {
        let driver = DatabaseDriver::open_with_schema(":memory:", Schema::new(3, SQL_V1)).unwrap();
        assert_eq!(driver.database_version().unwrap(), 3);
        assert_eq!(driver.path(), ":memory:");
    }

    #[test]
    fn test_check_classifies_older_and_newer() {
        let (_dir, path) = file_db();
        drop(DatabaseDriver::open_with_schema(&path, Schema::new(2, SQL_V1)).unwrap());

        assert!(DatabaseDriver::open_checked(&path, 2).is_ok());
        assert!(matches!(
            DatabaseDriver::open_checked(&path, 4),
            Err(DriverError::MigrationNeeded { from: 2 })
        ));
        assert!(matches!(
            DatabaseDriver::open_checked(&path, 1),
            Err(DriverError::SchemaNeeded)
        ));

        let refuse = DriverConfig::default().with_downgrade_policy(DowngradePolicy::Refuse);
        assert!(matches!(
            DatabaseDriver::open_with_config(&path, OpenMode::Check(1), &refuse),
            Err(DriverError::DatabaseNewer {
                database_version: 2,
                app_version: 1
            })
        ));
    }

    #[test]
    #[should_panic(expected = "Incompatible migration set applied")]
    fn test_migrate_mode_panics_on_mismatch() {
        let (_dir, path) = file_db();
        drop(DatabaseDriver::open_with_schema(&path, Schema::new(1, SQL_V1)).unwrap());
        let _ = DatabaseDriver::open_with_migrations(&path, MigrationSet::new(2, 3, ""));
    }

    #[test]
    fn test_migrate_mode_advances_version() {
        let (_dir, path) = file_db();
        drop(DatabaseDriver::open_with_schema(&path, Schema::new(1, SQL_V1)).unwrap());

        let mut driver = DatabaseDriver::open_with_migrations(
            &path,
            MigrationSet::new(1, 2, "ALTER TABLE t ADD COLUMN name TEXT;"),
        )
        .unwrap();
        assert_eq!(driver.database_version().unwrap(), 2);

        driver.migrate(&MigrationSet::new(2, 3, "")).unwrap();
        assert_eq!(driver.database_version().unwrap(), 3);
        driver.close().unwrap();
    }

    #[test]
    fn test_reset_replaces_schema() {
        let mut driver = DatabaseDriver::open_with_schema(":memory:", Schema::new(1, SQL_V1)).unwrap();
        driver
            .unsafe_reset_database(&Schema::new(5, "CREATE TABLE other (id TEXT);"))
            .unwrap();
        assert_eq!(driver.database_version().unwrap(), 5);
        assert!(driver.find("t", "x").is_err());
        assert!(driver.find("other", "x").unwrap().is_none());
    }

    #[test]
    fn test_invalid_migration_definition_is_reported() {
        let (_dir, path) = file_db();
        drop(DatabaseDriver::open_with_schema(&path, Schema::new(2, SQL_V1)).unwrap());
        assert!(matches!(
            DatabaseDriver::open_with_migrations(&path, MigrationSet::new(2, 2, "")),
            Err(DriverError::InvalidDefinition(_))
        ));
    }
}
