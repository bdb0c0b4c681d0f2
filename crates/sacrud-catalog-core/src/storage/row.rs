//! Generic row payloads.

use super::RowKey;
use crate::catalog::EntityDef;
use crate::error::{ConstraintError, Error};
use serde_json::Value;

/// A row: column name to JSON value.
pub type Row = serde_json::Map<String, Value>;

/// Read the primary key of `row` according to the entity's identity fields.
pub fn key_of(entity: &EntityDef, row: &Row) -> Result<RowKey, Error> {
    let mut values = Vec::with_capacity(entity.identity_fields.len());
    for field in &entity.identity_fields {
        match row.get(field) {
            None | Some(Value::Null) => {
                return Err(ConstraintError::NullViolation {
                    entity: entity.name.clone(),
                    field: field.clone(),
                }
                .into())
            }
            Some(value) => values.push(value.as_i64().ok_or_else(|| {
                Error::InvalidData(format!("{}.{} is not an integer key", entity.name, field))
            })?),
        }
    }
    Ok(RowKey::composite(values))
}

/// Integer value of a foreign key column, `None` when absent or null.
pub fn foreign_key_value(row: &Row, field: &str) -> Option<i64> {
    row.get(field).and_then(Value::as_i64)
}
