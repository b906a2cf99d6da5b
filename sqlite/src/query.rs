//! Steady-state reads and batched writes.
//!
//! Reads return owned [`Record`]s. Writes go through [`batch`], which runs
//! every operation and every argument batch in order inside a single
//! transaction: later statements see the effects of earlier ones, and a
//! failure anywhere leaves the database untouched.
//!
//! # Example
//!
//! ```
//! use schema_driver_core::{CacheBehavior, Operation, Schema, Value};
//! use schema_driver_sqlite::DatabaseDriver;
//!
//! let schema = Schema::new(1, "CREATE TABLE tasks (id TEXT PRIMARY KEY, name TEXT);");
//! let mut driver = DatabaseDriver::open_with_schema(":memory:", schema).unwrap();
//!
//! driver
//!     .batch(&[Operation::new(
//!         CacheBehavior::add_first_arg("tasks"),
//!         "INSERT INTO tasks (id, name) VALUES (?, ?)",
//!     )
//!     .with_args(vec![Value::from("t1"), Value::from("Write docs")])])
//!     .unwrap();
//!
//! let task = driver.find("tasks", "t1").unwrap().unwrap();
//! assert_eq!(task.get("name"), Some(&Value::from("Write docs")));
//! assert_eq!(driver.count("SELECT COUNT(*) FROM tasks", &[]).unwrap(), 1);
//! ```
//!
//! [`batch`]: DatabaseDriver::batch

use schema_driver_core::{
    Operation, Record, RecordTable, Value, operations_from_json, validate_operations,
};
use tracing::debug;

use crate::convert;
use crate::driver::DatabaseDriver;
use crate::error::{DriverError, Result};

/// Summary of a committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Number of operations executed.
    pub operations: usize,
    /// Number of statement executions (one per argument batch).
    pub statements_executed: usize,
    /// Rows changed, as reported by SQLite.
    pub rows_changed: usize,
}

impl DatabaseDriver {
    /// Looks up one row of `table` by its `id` column.
    ///
    /// Returns `None` if no row has that id.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::QueryError`] if the table does not exist.
    pub fn find(&self, table: &str, id: &str) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT * FROM {} WHERE id = ? LIMIT 1",
            convert::quote_identifier(table)
        );
        let records = convert::query_records(
            self.database.connection(),
            &sql,
            &[Value::from(id)],
        )?;
        Ok(records.into_iter().next())
    }

    /// Runs a caller-supplied query and returns all rows.
    ///
    /// `table` only tells the caller which cache the records belong to; it
    /// does not constrain the query.
    pub fn cached_query(&self, table: &str, sql: &str, args: &[Value]) -> Result<Vec<Record>> {
        let records = self.database.query_raw(sql, args)?;
        debug!(table, rows = records.len(), "Cached query");
        Ok(records)
    }

    /// Runs a query and returns the `id` column of each row.
    ///
    /// Integer ids are returned in their decimal form.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MissingId`] if the result has no `id` column
    /// or a row's id is `NULL`.
    pub fn query_ids(&self, sql: &str, args: &[Value]) -> Result<Vec<String>> {
        let ids = convert::query_map(self.database.connection(), sql, args, |columns, row| {
            let Some(index) = columns.iter().position(|c| c == "id") else {
                return Ok(None);
            };
            Ok(match convert::value_from_ref(row.get_ref(index)?) {
                Value::Text(id) => Some(id),
                Value::Integer(id) => Some(id.to_string()),
                _ => None,
            })
        })?;

        ids.into_iter()
            .map(|id| id.ok_or_else(|| DriverError::MissingId { sql: sql.to_string() }))
            .collect()
    }

    /// Runs arbitrary SQL and returns whatever rows it produces.
    pub fn unsafe_query_raw(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>> {
        self.database.query_raw(sql, args)
    }

    /// Runs a query and returns its column names once plus one value row per
    /// result row.
    pub fn query_as_array(&self, sql: &str, args: &[Value]) -> Result<RecordTable> {
        let mut columns = Vec::new();
        let rows = convert::query_map(self.database.connection(), sql, args, |names, row| {
            if columns.is_empty() {
                columns = names.to_vec();
            }
            convert::row_values(names.len(), row)
        })?;
        Ok(RecordTable { columns, rows })
    }

    /// Runs a counting query and returns its single value.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidCount`] unless the query yields at least
    /// one row with exactly one integer column.
    pub fn count(&self, sql: &str, args: &[Value]) -> Result<i64> {
        let counts = convert::query_map(self.database.connection(), sql, args, |columns, row| {
            if columns.len() != 1 {
                return Ok(None);
            }
            Ok(convert::value_from_ref(row.get_ref(0)?).as_i64())
        })?;

        counts
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| DriverError::InvalidCount { sql: sql.to_string() })
    }

    /// Executes `operations` in one transaction.
    ///
    /// Each operation's statement runs once per argument batch, strictly in
    /// order. Commits only if every execution succeeds; otherwise rolls back
    /// and returns the first error, which names the failing statement.
    /// Cache behaviors are ignored here; they are for the caller to apply
    /// after a successful return.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidDefinition`] without touching the
    /// database if an operation has empty SQL or a cache hint without a
    /// table.
    pub fn batch(&mut self, operations: &[Operation]) -> Result<BatchReport> {
        if let Some(err) = validate_operations(operations).into_iter().next() {
            return Err(err.into());
        }

        let report = self.database.in_transaction(|conn| {
            let mut report = BatchReport::default();
            for operation in operations {
                for args in &operation.arg_batches {
                    report.rows_changed += convert::execute(conn, &operation.sql, args)?;
                    report.statements_executed += 1;
                }
                report.operations += 1;
            }
            Ok(report)
        })?;

        debug!(
            operations = report.operations,
            statements = report.statements_executed,
            rows_changed = report.rows_changed,
            "Batch committed"
        );
        Ok(report)
    }

    /// Decodes a batch from its JSON wire form and executes it.
    ///
    /// See [`operations_from_json`] for the format.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::BatchFormat`] before touching the database if
    /// the JSON is malformed.
    pub fn batch_json(&mut self, json: &str) -> Result<BatchReport> {
        let operations = operations_from_json(json)?;
        self.batch(&operations)
    }

    /// Executes a semicolon-separated statement batch in one transaction.
    pub fn unsafe_execute(&mut self, sql: &str) -> Result<()> {
        self.database
            .in_transaction(|conn| convert::execute_statements(conn, sql))
    }
}
