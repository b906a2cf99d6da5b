//! Conversion between [`Value`]/[`Record`] and SQLite parameters and rows.
//!
//! Every statement goes through the connection's prepared statement cache,
//! so an operation executed once per argument batch is only prepared once.
//! Failures are wrapped with the statement text: reads as
//! [`QueryError`](DriverError::QueryError), writes as
//! [`ExecutionError`](DriverError::ExecutionError).

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, Row, ToSql, params_from_iter};
use schema_driver_core::{Record, Value};

use crate::error::{DriverError, Result};

/// Borrowing adapter binding a [`Value`] as a statement parameter.
struct SqlArg<'a>(&'a Value);

impl ToSql for SqlArg<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self.0 {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(f) => ValueRef::Real(*f),
            Value::Text(s) => ValueRef::Text(s.as_bytes()),
            Value::Blob(b) => ValueRef::Blob(b),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

/// Converts a column value read from SQLite.
pub(crate) fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

/// Builds a [`Record`] from the current row.
pub(crate) fn row_to_record(columns: &[String], row: &Row<'_>) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    for (i, column) in columns.iter().enumerate() {
        record.push(column.clone(), value_from_ref(row.get_ref(i)?));
    }
    Ok(record)
}

/// Reads every value of the current row in column order.
pub(crate) fn row_values(column_count: usize, row: &Row<'_>) -> rusqlite::Result<Vec<Value>> {
    (0..column_count)
        .map(|i| row.get_ref(i).map(value_from_ref))
        .collect()
}

/// Runs a query and maps each row with `f`, which also receives the
/// result column names.
pub(crate) fn query_map<T, F>(conn: &Connection, sql: &str, args: &[Value], mut f: F) -> Result<Vec<T>>
where
    F: FnMut(&[String], &Row<'_>) -> rusqlite::Result<T>,
{
    let wrap = |source| DriverError::QueryError {
        sql: sql.to_string(),
        source,
    };

    let mut stmt = conn.prepare_cached(sql).map_err(wrap)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = stmt
        .query(params_from_iter(args.iter().map(SqlArg)))
        .map_err(wrap)?;

    let mut results = Vec::new();
    while let Some(row) = rows.next().map_err(wrap)? {
        results.push(f(&columns, row).map_err(wrap)?);
    }
    Ok(results)
}

/// Runs a query and returns every row as a [`Record`].
pub(crate) fn query_records(conn: &Connection, sql: &str, args: &[Value]) -> Result<Vec<Record>> {
    query_map(conn, sql, args, row_to_record)
}

/// Executes one write statement with one parameter set, returning the
/// number of changed rows.
pub(crate) fn execute(conn: &Connection, sql: &str, args: &[Value]) -> Result<usize> {
    let wrap = |source| DriverError::ExecutionError {
        sql: sql.to_string(),
        source,
    };

    let mut stmt = conn.prepare_cached(sql).map_err(wrap)?;
    stmt.execute(params_from_iter(args.iter().map(SqlArg)))
        .map_err(wrap)
}

/// Executes a semicolon-separated statement batch without parameters.
pub(crate) fn execute_statements(conn: &Connection, sql: &str) -> Result<()> {
    conn.execute_batch(sql)
        .map_err(|source| DriverError::ExecutionError {
            sql: sql.to_string(),
            source,
        })
}

/// Quotes an identifier for interpolation into SQL.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id TEXT PRIMARY KEY, n INTEGER, r REAL, b BLOB);")
            .unwrap();
        conn
    }

    #[test]
    fn test_values_round_trip_through_sqlite() {
        let conn = conn();
        let args = vec![
            Value::from("a"),
            Value::Integer(-5),
            Value::Real(0.25),
            Value::Blob(vec![0, 159, 255]),
        ];
        let changed = execute(&conn, "INSERT INTO t VALUES (?, ?, ?, ?)", &args).unwrap();
        assert_eq!(changed, 1);

        let records = query_records(&conn, "SELECT * FROM t", &[]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].columns(), ["id", "n", "r", "b"]);
        assert_eq!(records[0].values(), args.as_slice());
    }

    #[test]
    fn test_null_binds_as_null() {
        let conn = conn();
        execute(&conn, "INSERT INTO t (id, n) VALUES (?, ?)", &[Value::from("a"), Value::Null]).unwrap();
        let records = query_records(&conn, "SELECT n FROM t WHERE n IS NULL", &[]).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_query_error_carries_sql() {
        let conn = conn();
        let err = query_records(&conn, "SELECT * FROM missing", &[]).unwrap_err();
        assert!(matches!(err, DriverError::QueryError { ref sql, .. } if sql == "SELECT * FROM missing"));
    }

    #[test]
    fn test_execute_error_carries_sql() {
        let conn = conn();
        execute(&conn, "INSERT INTO t (id) VALUES (?)", &[Value::from("a")]).unwrap();
        let err = execute(&conn, "INSERT INTO t (id) VALUES (?)", &[Value::from("a")]).unwrap_err();
        assert!(matches!(err, DriverError::ExecutionError { .. }));
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("tasks"), "\"tasks\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
