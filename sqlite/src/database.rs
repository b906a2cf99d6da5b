//! SQLite connection wrapper.
//!
//! [`Database`] owns the single connection of a driver. It exposes the
//! persisted schema version (`PRAGMA user_version`), a scoped transaction
//! primitive, and the destructive reset used before a bootstrap.

use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use schema_driver_core::{Record, SchemaVersion, Value};
use tracing::{debug, warn};

use crate::config::DriverConfig;
use crate::convert;
use crate::error::{DriverError, Result};

/// One open SQLite database file.
pub struct Database {
    conn: Connection,
    path: String,
    foreign_keys: bool,
}

impl Database {
    /// Opens (or creates) the database at an already-resolved path or URI.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::OpenError`] if SQLite cannot open the file, or
    /// [`DriverError::DatabaseError`] if the connection pragmas fail.
    pub fn open(path: &str, config: &DriverConfig) -> Result<Self> {
        debug!("Will open database...");
        let conn = Connection::open(path).map_err(|source| DriverError::OpenError {
            path: path.to_string(),
            source,
        })?;

        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        if let Some(ms) = config.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }

        debug!(path, "Opened database");
        Ok(Self {
            conn,
            path: path.to_string(),
            foreign_keys: config.foreign_keys,
        })
    }

    /// Opens an existing database without write access.
    ///
    /// Never creates the file, so it suits commands that only inspect a
    /// database. Every write through the returned handle fails.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::OpenError`] if the file does not exist or
    /// SQLite cannot open it.
    pub fn open_read_only(path: &str, config: &DriverConfig) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|source| DriverError::OpenError {
            path: path.to_string(),
            source,
        })?;

        if let Some(ms) = config.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }

        debug!(path, "Opened database read-only");
        Ok(Self {
            conn,
            path: path.to_string(),
            foreign_keys: config.foreign_keys,
        })
    }

    /// Path or URI the database was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads the persisted schema version.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidStoredVersion`] if the stored value is
    /// negative (SQLite stores it as a signed 32-bit integer).
    pub fn user_version(&self) -> Result<SchemaVersion> {
        read_user_version(&self.conn)
    }

    /// Runs `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`. On `Err` (or a panic inside `f`) the
    /// transaction is dropped, which rolls it back.
    pub fn in_transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self.conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs a query and returns all rows.
    pub fn query_raw(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>> {
        convert::query_records(&self.conn, sql, args)
    }

    /// Drops every table, view, trigger and index and resets the persisted
    /// version to `0`.
    ///
    /// Irreversible. Foreign key enforcement is suspended while dropping so
    /// tables can go in any order.
    pub fn unsafe_destroy_everything(&mut self) -> Result<()> {
        let objects: Vec<(String, String)> = convert::query_map(
            &self.conn,
            "SELECT type, name FROM sqlite_master \
             WHERE name NOT LIKE 'sqlite_%' \
             ORDER BY CASE type \
                 WHEN 'view' THEN 0 \
                 WHEN 'trigger' THEN 1 \
                 WHEN 'table' THEN CASE WHEN sql LIKE 'CREATE VIRTUAL%' THEN 2 ELSE 3 END \
                 ELSE 4 END",
            &[],
            |_, row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if self.foreign_keys {
            self.conn.pragma_update(None, "foreign_keys", false)?;
        }

        let result = self.in_transaction(|conn| {
            for (kind, name) in &objects {
                let sql = format!(
                    "DROP {} IF EXISTS {}",
                    kind.to_uppercase(),
                    convert::quote_identifier(name)
                );
                convert::execute_statements(conn, &sql)?;
            }
            set_user_version(conn, 0)
        });

        if self.foreign_keys {
            self.conn.pragma_update(None, "foreign_keys", true)?;
        }
        self.conn.flush_prepared_statement_cache();

        debug!(dropped = objects.len(), "Destroyed database schema");
        result
    }

    /// Closes the connection.
    ///
    /// Dropping a [`Database`] also closes it; this variant reports the
    /// failure instead of only logging it.
    pub fn close(self) -> Result<()> {
        debug!("Closing database...");
        match self.conn.close() {
            Ok(()) => {
                debug!("Database closed.");
                Ok(())
            }
            Err((_conn, err)) => {
                warn!(error = %err, "Failed to close sqlite database");
                Err(err.into())
            }
        }
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Reads `PRAGMA user_version` on any connection or transaction.
pub(crate) fn read_user_version(conn: &Connection) -> Result<SchemaVersion> {
    let raw: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    SchemaVersion::try_from(raw).map_err(|_| DriverError::InvalidStoredVersion(raw))
}

/// Writes `PRAGMA user_version`. Only the executor calls this, always inside
/// a transaction.
pub(crate) fn set_user_version(conn: &Connection, version: SchemaVersion) -> Result<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Database {
        Database::open(":memory:", &DriverConfig::default()).unwrap()
    }

    #[test]
    fn test_new_database_is_uninitialized() {
        assert_eq!(memory().user_version().unwrap(), 0);
    }

    #[test]
    fn test_transaction_commits_version() {
        let mut db = memory();
        db.in_transaction(|conn| set_user_version(conn, 7)).unwrap();
        assert_eq!(db.user_version().unwrap(), 7);
    }

    #[test]
    fn test_open_read_only_never_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db").to_string_lossy().into_owned();

        let err = Database::open_read_only(&path, &DriverConfig::default()).err();
        assert!(matches!(err, Some(DriverError::OpenError { .. })));
        assert!(!dir.path().join("missing.db").exists());

        let mut db = Database::open(&path, &DriverConfig::default()).unwrap();
        db.in_transaction(|conn| set_user_version(conn, 4)).unwrap();
        db.close().unwrap();

        let db = Database::open_read_only(&path, &DriverConfig::default()).unwrap();
        assert_eq!(db.user_version().unwrap(), 4);
        assert!(db.query_raw("CREATE TABLE t (id TEXT)", &[]).is_err());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut db = memory();
        let result: Result<()> = db.in_transaction(|conn| {
            convert::execute_statements(conn, "CREATE TABLE t (id TEXT);")?;
            set_user_version(conn, 3)?;
            convert::execute_statements(conn, "INSERT INTO missing VALUES (1);")
        });
        assert!(result.is_err());
        assert_eq!(db.user_version().unwrap(), 0);
        assert!(db.query_raw("SELECT * FROM t", &[]).is_err());
    }

    #[test]
    fn test_destroy_everything_drops_all_objects() {
        let mut db = memory();
        db.in_transaction(|conn| {
            convert::execute_statements(
                conn,
                "CREATE TABLE parent (id TEXT PRIMARY KEY);
                 CREATE TABLE child (id TEXT PRIMARY KEY, parent_id TEXT REFERENCES parent(id));
                 CREATE INDEX idx_child_parent ON child(parent_id);
                 CREATE VIEW child_view AS SELECT * FROM child;
                 CREATE TRIGGER parent_ai AFTER INSERT ON parent BEGIN SELECT 1; END;
                 CREATE VIRTUAL TABLE docs USING fts5(body);
                 INSERT INTO parent VALUES ('p');
                 INSERT INTO child VALUES ('c', 'p');",
            )?;
            set_user_version(conn, 4)
        })
        .unwrap();

        db.unsafe_destroy_everything().unwrap();

        let remaining = db
            .query_raw("SELECT name FROM sqlite_master WHERE name NOT LIKE 'sqlite_%'", &[])
            .unwrap();
        assert!(remaining.is_empty(), "left over: {remaining:?}");
        assert_eq!(db.user_version().unwrap(), 0);
    }

    #[test]
    fn test_destroy_everything_on_empty_database() {
        let mut db = memory();
        db.unsafe_destroy_everything().unwrap();
        assert_eq!(db.user_version().unwrap(), 0);
    }

    #[test]
    fn test_close() {
        memory().close().unwrap();
    }
}
