//! Data model for schema definitions, write operations and row values.
//!
//! The types are serializable with [`serde`] so schema catalogs and batches
//! can be read from JSON or YAML files as well as built in code.

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Version number persisted inside the database file.
pub type SchemaVersion = u32;

/// Persisted version of a database that has never been set up.
pub const UNINITIALIZED_VERSION: SchemaVersion = 0;

/// Largest version SQLite can persist. `PRAGMA user_version` is a signed
/// 32-bit slot, so anything above wraps to `0`.
pub const MAX_SCHEMA_VERSION: SchemaVersion = i32::MAX as SchemaVersion;

/// Full bootstrap script and the version it establishes.
///
/// # Examples
///
/// ```
/// use schema_driver_core::Schema;
///
/// let schema = Schema::new(3, "CREATE TABLE local_storage (key TEXT PRIMARY KEY, value TEXT);");
/// assert_eq!(schema.version, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Version written to the database once the script has run.
    pub version: SchemaVersion,
    /// Statement batch creating every table, index and trigger.
    pub sql: String,
}

impl Schema {
    /// Creates a schema definition.
    pub fn new(version: SchemaVersion, sql: impl Into<String>) -> Self {
        Self {
            version,
            sql: sql.into(),
        }
    }
}

/// Incremental upgrade from one persisted version to a later one.
///
/// `from` must match the database's persisted version at the time the set
/// is applied; the driver treats a mismatch as a programming error.
///
/// # Examples
///
/// ```
/// use schema_driver_core::MigrationSet;
///
/// let set = MigrationSet::new(1, 2, "ALTER TABLE tasks ADD COLUMN done INTEGER;");
/// assert_eq!(set.from, 1);
/// assert_eq!(set.to, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSet {
    /// Version the database must be at before the script runs.
    pub from: SchemaVersion,
    /// Version written to the database once the script has run.
    pub to: SchemaVersion,
    /// Statement batch performing the upgrade.
    pub sql: String,
}

impl MigrationSet {
    /// Creates a migration set.
    pub fn new(from: SchemaVersion, to: SchemaVersion, sql: impl Into<String>) -> Self {
        Self {
            from,
            to,
            sql: sql.into(),
        }
    }
}

/// Hint telling the caller how a write affects its record cache.
///
/// The driver never looks at this value. It travels with the
/// [`Operation`] so the caller can update its cache after the batch has
/// committed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheBehavior {
    /// The write does not touch cached records.
    #[default]
    Ignore,
    /// The first argument of each batch is the id of a record to cache.
    AddFirstArg {
        /// Table the record belongs to.
        table: String,
    },
    /// The first argument of each batch is the id of a record to evict.
    RemoveFirstArg {
        /// Table the record belongs to.
        table: String,
    },
}

impl CacheBehavior {
    /// Shorthand for [`CacheBehavior::AddFirstArg`].
    pub fn add_first_arg(table: impl Into<String>) -> Self {
        Self::AddFirstArg {
            table: table.into(),
        }
    }

    /// Shorthand for [`CacheBehavior::RemoveFirstArg`].
    pub fn remove_first_arg(table: impl Into<String>) -> Self {
        Self::RemoveFirstArg {
            table: table.into(),
        }
    }

    /// Table whose cache is affected, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::Ignore => None,
            Self::AddFirstArg { table } | Self::RemoveFirstArg { table } => Some(table),
        }
    }

    /// Numeric code used by the JSON batch format (`0`, `1`, `-1`).
    pub fn code(&self) -> i8 {
        match self {
            Self::Ignore => 0,
            Self::AddFirstArg { .. } => 1,
            Self::RemoveFirstArg { .. } => -1,
        }
    }
}

/// One write statement executed once per argument batch.
///
/// # Examples
///
/// ```
/// use schema_driver_core::{CacheBehavior, Operation, Value};
///
/// let op = Operation::new(CacheBehavior::Ignore, "DELETE FROM tasks WHERE id = ?")
///     .with_args(vec![Value::from("a")])
///     .with_args(vec![Value::from("b")]);
/// assert_eq!(op.arg_batches.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Cache metadata carried through for the caller.
    pub cache_behavior: CacheBehavior,
    /// Statement to execute.
    pub sql: String,
    /// Parameter sets, executed in order.
    pub arg_batches: Vec<Vec<Value>>,
}

impl Operation {
    /// Creates an operation with no argument batches yet.
    pub fn new(cache_behavior: CacheBehavior, sql: impl Into<String>) -> Self {
        Self {
            cache_behavior,
            sql: sql.into(),
            arg_batches: Vec::new(),
        }
    }

    /// Appends one parameter set.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.arg_batches.push(args);
        self
    }
}

/// A single SQLite value, bound as a parameter or read from a column.
///
/// Serializes to the natural JSON value (`null`, number, string); blobs
/// serialize as arrays of bytes. When deserializing, JSON booleans become
/// integers `0`/`1`, matching how SQLite stores them.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`.
    #[default]
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrows the text payload, if this is [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is [`Value::Integer`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("null, a boolean, a number, a string or an array of bytes")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        // SQLite integers are signed; larger values are kept as reals.
        Ok(i64::try_from(v).map_or(Value::Real(v as f64), Value::Integer))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Real(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Blob(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Blob(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Ok(Value::Blob(bytes))
    }
}

/// Column-name → value projection of one row, in column order.
///
/// Serializes as a JSON object.
///
/// # Examples
///
/// ```
/// use schema_driver_core::{Record, Value};
///
/// let mut record = Record::new();
/// record.push("id", Value::from("t1"));
/// record.push("done", Value::from(true));
///
/// assert_eq!(record.get("id").and_then(Value::as_str), Some("t1"));
/// assert_eq!(record.get("done"), Some(&Value::Integer(1)));
/// assert!(record.get("missing").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Looks up a column by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in result order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Compact result set: column names once, then one value row per record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordTable {
    /// Column names shared by every row.
    pub columns: Vec<String>,
    /// Row values in column order.
    pub rows: Vec<Vec<Value>>,
}

impl RecordTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
