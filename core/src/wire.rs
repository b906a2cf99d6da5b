//! JSON batch wire format.
//!
//! A batch is a JSON array of operations, each encoded positionally as
//! `[cacheBehavior, table, sql, argBatches]`:
//!
//! - `cacheBehavior`: `0` ignore, `1` add first argument, `-1` remove first
//!   argument
//! - `table`: table name, or `null` when the behavior is `0`
//! - `sql`: statement text
//! - `argBatches`: array of argument arrays
//!
//! ```
//! use schema_driver_core::{CacheBehavior, operations_from_json};
//!
//! let json = r#"[
//!     [1, "tasks", "INSERT INTO tasks (id, name) VALUES (?, ?)", [["t1", "a"], ["t2", "b"]]],
//!     [0, null, "DELETE FROM tasks WHERE id = ?", [["t0"]]]
//! ]"#;
//! let ops = operations_from_json(json).unwrap();
//! assert_eq!(ops[0].cache_behavior, CacheBehavior::add_first_arg("tasks"));
//! assert_eq!(ops[0].arg_batches.len(), 2);
//! assert_eq!(ops[1].cache_behavior, CacheBehavior::Ignore);
//! ```

use serde::{Deserialize, Serialize};

use crate::{CacheBehavior, Operation, ValidationError, Value};

#[derive(Serialize, Deserialize)]
struct OperationWire(i64, Option<String>, String, Vec<Vec<Value>>);

impl TryFrom<OperationWire> for Operation {
    type Error = ValidationError;

    fn try_from(wire: OperationWire) -> Result<Self, Self::Error> {
        let OperationWire(code, table, sql, arg_batches) = wire;
        let table = table.unwrap_or_default();
        let cache_behavior = match code {
            0 => CacheBehavior::Ignore,
            1 => CacheBehavior::AddFirstArg { table },
            -1 => CacheBehavior::RemoveFirstArg { table },
            other => return Err(ValidationError::UnknownCacheBehavior(other)),
        };
        Ok(Operation {
            cache_behavior,
            sql,
            arg_batches,
        })
    }
}

impl From<&Operation> for OperationWire {
    fn from(op: &Operation) -> Self {
        OperationWire(
            i64::from(op.cache_behavior.code()),
            op.cache_behavior.table().map(str::to_string),
            op.sql.clone(),
            op.arg_batches.clone(),
        )
    }
}

/// Decodes a batch from its JSON wire form.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] for malformed JSON, wrongly shaped
/// operations, or an unknown cache behavior code.
pub fn operations_from_json(json: &str) -> serde_json::Result<Vec<Operation>> {
    let wire: Vec<OperationWire> = serde_json::from_str(json)?;
    wire.into_iter()
        .map(|op| Operation::try_from(op).map_err(serde::de::Error::custom))
        .collect()
}

/// Encodes a batch into its JSON wire form.
pub fn operations_to_json(operations: &[Operation]) -> serde_json::Result<String> {
    let wire: Vec<OperationWire> = operations.iter().map(OperationWire::from).collect();
    serde_json::to_string(&wire)
}
