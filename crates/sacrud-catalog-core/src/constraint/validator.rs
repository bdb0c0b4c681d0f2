//! Constraint validation logic.
//!
//! The ConstraintValidator checks the declared integrity constraints of an
//! entity during insert and update operations.

use serde_json::Value;

use crate::catalog::{fkey_name, pkey_name, EntityDef, SchemaBundle};
use crate::error::{ConstraintError, Error};
use crate::storage::key_of;
use crate::storage::transaction::{abort, TxResult, TxView};
use crate::storage::{foreign_key_value, Row, RowKey};

/// Constraint validator for enforcing the schema's integrity rules.
pub struct ConstraintValidator<'a> {
    schema: &'a SchemaBundle,
}

impl<'a> ConstraintValidator<'a> {
    /// Create a new constraint validator.
    pub fn new(schema: &'a SchemaBundle) -> Self {
        Self { schema }
    }

    /// Check a row payload against its entity definition and complete it.
    ///
    /// Checks:
    /// - every column is declared
    /// - required columns are present and non-null (a sequence-backed key may be left out)
    /// - non-null values fit the column type
    ///
    /// Absent columns with a constant default receive it and other absent
    /// nullable columns are set to null, so the returned row carries every column
    /// except a sequence-backed key still to be assigned.
    pub fn prepare(&self, entity: &EntityDef, mut row: Row) -> Result<Row, Error> {
        if let Some(unknown) = row.keys().find(|name| entity.get_field(name).is_none()) {
            return Err(Error::InvalidData(format!(
                "{} has no field '{}'",
                entity.name, unknown
            )));
        }

        for field in &entity.fields {
            match row.get(&field.name) {
                None | Some(Value::Null) => {
                    if field.is_serial() {
                        row.remove(&field.name);
                        continue;
                    }
                    if let Some(default) = field.default.as_ref().and_then(|d| d.to_json()) {
                        if !default.is_null() || !field.required {
                            row.insert(field.name.clone(), default);
                            continue;
                        }
                    }
                    if field.required {
                        return Err(ConstraintError::NullViolation {
                            entity: entity.name.clone(),
                            field: field.name.clone(),
                        }
                        .into());
                    }
                    row.insert(field.name.clone(), Value::Null);
                }
                Some(value) => {
                    if !field.field_type.accepts(value) {
                        return Err(Error::InvalidData(format!(
                            "{}.{} does not accept {}",
                            entity.name, field.name, value
                        )));
                    }
                }
            }
        }

        Ok(row)
    }

    /// Read the primary key of a prepared row.
    pub fn key(&self, entity: &EntityDef, row: &Row) -> Result<RowKey, Error> {
        key_of(entity, row)
    }

    /// Fail with a uniqueness violation if `key` is already taken.
    pub fn check_unique(&self, tx: &TxView<'_>, entity: &EntityDef, key: &RowKey) -> TxResult<()> {
        if tx.contains(&entity.name, key)? {
            let constraint = self
                .schema
                .primary_key_name(&entity.name)
                .map(String::from)
                .unwrap_or_else(|| pkey_name(&entity.table));
            return abort(ConstraintError::UniqueViolation {
                constraint,
                entity: entity.name.clone(),
                key: key.clone(),
            });
        }
        Ok(())
    }

    /// Fail with a referential violation if a foreign key of `row` points nowhere.
    ///
    /// Null foreign keys are not checked; required ones were rejected by [`prepare`](Self::prepare).
    pub fn check_references(&self, tx: &TxView<'_>, entity: &EntityDef, row: &Row) -> TxResult<()> {
        for relation in self.schema.foreign_keys_from(&entity.name) {
            let Some(value) = foreign_key_value(row, &relation.from_field) else {
                continue;
            };
            if !tx.contains(&relation.to_entity, &RowKey::single(value))? {
                let constraint = self
                    .schema
                    .foreign_key_name(&entity.name, &relation.from_field)
                    .map(String::from)
                    .unwrap_or_else(|| fkey_name(&entity.table, &relation.from_field));
                return abort(ConstraintError::ForeignKeyViolation {
                    constraint,
                    entity: entity.name.clone(),
                    field: relation.from_field.clone(),
                    references_entity: relation.to_entity.clone(),
                    value,
                });
            }
        }
        Ok(())
    }
}
