//! Read access to the `local_storage` key-value table.
//!
//! The table (`key TEXT PRIMARY KEY, value TEXT`) is created by the
//! caller's schema. Values are written through
//! [`batch`](DatabaseDriver::batch) like any other row.

use schema_driver_core::Value;

use crate::convert;
use crate::driver::DatabaseDriver;
use crate::error::Result;

const GET_LOCAL_SQL: &str = "SELECT value FROM local_storage WHERE key = ?";

impl DatabaseDriver {
    /// Returns the value stored under `key`, or `None` if the key is
    /// missing or its value is `NULL`.
    pub fn get_local(&self, key: &str) -> Result<Option<String>> {
        let values = convert::query_map(
            self.database.connection(),
            GET_LOCAL_SQL,
            &[Value::from(key)],
            |_, row| row.get::<_, Option<String>>(0),
        )?;
        Ok(values.into_iter().next().flatten())
    }
}

#[cfg(test)]
mod tests {
    use schema_driver_core::{CacheBehavior, Operation, Schema};

    use super::*;

    fn driver() -> DatabaseDriver {
        DatabaseDriver::open_with_schema(
            ":memory:",
            Schema::new(1, "CREATE TABLE local_storage (key TEXT PRIMARY KEY, value TEXT);"),
        )
        .unwrap()
    }

    fn set_local(driver: &mut DatabaseDriver, key: &str, value: Option<&str>) {
        driver
            .batch(&[Operation::new(
                CacheBehavior::Ignore,
                "INSERT OR REPLACE INTO local_storage (key, value) VALUES (?, ?)",
            )
            .with_args(vec![Value::from(key), Value::from(value)])])
            .unwrap();
    }

    #[test]
    fn test_missing_key_is_none() {
        assert_eq!(driver().get_local("missing").unwrap(), None);
    }

    #[test]
    fn test_value_written_by_batch_is_returned() {
        let mut driver = driver();
        set_local(&mut driver, "k", Some("v"));
        assert_eq!(driver.get_local("k").unwrap().as_deref(), Some("v"));

        set_local(&mut driver, "k", Some("v2"));
        assert_eq!(driver.get_local("k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_null_value_is_none() {
        let mut driver = driver();
        set_local(&mut driver, "k", None);
        assert_eq!(driver.get_local("k").unwrap(), None);
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let driver =
            DatabaseDriver::open_with_schema(":memory:", Schema::new(1, "CREATE TABLE t (id TEXT);"))
                .unwrap();
        assert!(driver.get_local("k").is_err());
    }
}
