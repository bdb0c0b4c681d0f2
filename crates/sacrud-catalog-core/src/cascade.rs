//! Cascade executor for handling referential integrity on deletes.
//!
//! This module implements the delete behavior declared on foreign-key relations:
//! - CASCADE: Delete referencing rows recursively
//! - RESTRICT: Refuse the delete while referencing rows exist
//! - SET NULL: Null the foreign key of referencing rows
//!
//! All work happens inside the caller's transaction, so a refused delete
//! leaves nothing behind.

use std::collections::HashSet;

use serde_json::Value;
use sled::transaction::ConflictableTransactionError;

use crate::catalog::{DeleteBehavior, RelationDef, SchemaBundle};
use crate::error::{CascadeError, ConstraintError, Error};
use crate::storage::transaction::{abort, TxResult, TxView};
use crate::storage::{foreign_key_value, RowKey};

/// Maximum cascade depth to prevent runaway recursion.
pub const MAX_CASCADE_DEPTH: usize = 100;

/// Result of a cascade operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeResult {
    /// Rows removed by cascades (the explicitly deleted row is not listed).
    pub deleted: Vec<(String, RowKey)>,
    /// Rows whose foreign key was set to null: (entity, key, field).
    pub nullified: Vec<(String, RowKey, String)>,
}

impl CascadeResult {
    /// Create an empty cascade result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of affected rows.
    pub fn affected_count(&self) -> usize {
        self.deleted.len() + self.nullified.len()
    }

    /// Keys of the rows of `entity` removed by cascades.
    pub fn deleted_of<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a RowKey> + 'a {
        self.deleted
            .iter()
            .filter(move |(e, _)| e == entity)
            .map(|(_, key)| key)
    }
}

/// Executes deletes together with their cascades.
pub struct CascadeExecutor<'a> {
    schema: &'a SchemaBundle,
}

impl<'a> CascadeExecutor<'a> {
    /// Create a new cascade executor.
    pub fn new(schema: &'a SchemaBundle) -> Self {
        Self { schema }
    }

    /// Delete a row and process every relation that references it.
    ///
    /// Fails with `NotFound` if the row does not exist.
    pub fn delete(&self, tx: &TxView<'_>, entity: &str, key: &RowKey) -> TxResult<CascadeResult> {
        if !tx.contains(entity, key)? {
            return abort(Error::NotFound {
                entity: entity.to_string(),
                key: key.clone(),
            });
        }

        let mut result = CascadeResult::new();
        let mut visited = HashSet::new();
        self.delete_recursive(tx, entity, key, &mut result, &mut visited, 0)?;
        Ok(result)
    }

    fn delete_recursive(
        &self,
        tx: &TxView<'_>,
        entity: &str,
        key: &RowKey,
        result: &mut CascadeResult,
        visited: &mut HashSet<(String, RowKey)>,
        depth: usize,
    ) -> TxResult<()> {
        if depth > MAX_CASCADE_DEPTH {
            return abort(CascadeError::MaxDepthExceeded { depth });
        }

        if !visited.insert((entity.to_string(), key.clone())) {
            return Ok(());
        }

        let relations = self.schema.foreign_keys_to(entity);

        // Refuse before touching anything.
        for relation in relations
            .iter()
            .filter(|r| r.on_delete == DeleteBehavior::Restrict)
        {
            let referencing = tx.references(&relation.name, key)?;
            if !referencing.is_empty() {
                return abort(ConstraintError::RestrictViolation {
                    relation: relation.name.clone(),
                    entity: entity.to_string(),
                    referencing_entity: relation.from_entity.clone(),
                    count: referencing.len(),
                });
            }
        }

        for relation in &relations {
            let referencing = tx.references(&relation.name, key)?;
            match relation.on_delete {
                DeleteBehavior::Restrict => {}
                DeleteBehavior::Cascade => {
                    for child in referencing {
                        if visited.contains(&(relation.from_entity.clone(), child.clone())) {
                            continue;
                        }
                        self.delete_recursive(
                            tx,
                            &relation.from_entity,
                            &child,
                            result,
                            visited,
                            depth + 1,
                        )?;
                        result.deleted.push((relation.from_entity.clone(), child));
                    }
                }
                DeleteBehavior::SetNull => {
                    for child in referencing {
                        self.set_field_null(tx, relation, &child)?;
                        result.nullified.push((
                            relation.from_entity.clone(),
                            child,
                            relation.from_field.clone(),
                        ));
                    }
                }
            }
            tx.clear_references(&relation.name, key)?;
        }

        self.unhook(tx, entity, key)?;
        tx.remove_row(entity, key)
    }

    /// Remove a row from the posting lists of the rows it references.
    fn unhook(&self, tx: &TxView<'_>, entity: &str, key: &RowKey) -> TxResult<()> {
        let Some(row) = tx.read_row(entity, key)? else {
            return Ok(());
        };
        for relation in self.schema.foreign_keys_from(entity) {
            if let Some(target) = foreign_key_value(&row, &relation.from_field) {
                tx.remove_reference(&relation.name, &RowKey::single(target), key)?;
            }
        }
        Ok(())
    }

    /// Set the foreign key of a referencing row to null.
    fn set_field_null(&self, tx: &TxView<'_>, relation: &RelationDef, key: &RowKey) -> TxResult<()> {
        let entity = &relation.from_entity;
        let Some(record) = tx.read_record(entity, key)? else {
            return Ok(());
        };

        let nullable = self
            .schema
            .get_entity(entity)
            .and_then(|e| e.get_field(&relation.from_field))
            .is_some_and(|f| !f.required);
        if !nullable {
            return abort(ConstraintError::NullViolation {
                entity: entity.clone(),
                field: relation.from_field.clone(),
            });
        }

        let mut row = record.row().map_err(ConflictableTransactionError::Abort)?;
        row.insert(relation.from_field.clone(), Value::Null);
        let updated = record
            .replaced(&row)
            .map_err(ConflictableTransactionError::Abort)?;
        tx.write_record(entity, key, &updated)
    }
}
