//! Storage engine implementation.

use super::key::{entity_prefix, reference_key, row_key, strip_prefix, decode_key_list};
use super::transaction::{abort, finish, TxView};
use super::{foreign_key_value, Record, Row, RowKey, StorageConfig};
use crate::cascade::{CascadeExecutor, CascadeResult};
use crate::catalog::SchemaBundle;
use crate::constraint::ConstraintValidator;
use crate::error::Error;
use serde_json::Value;
use sled::transaction::ConflictableTransactionError;
use sled::{Db, Transactional, Tree};
use tracing::debug;

/// Tree name for row data.
const DATA_TREE: &str = "data";

/// Tree name for metadata (sequences).
const META_TREE: &str = "meta";

/// Tree name for reverse foreign-key posting lists.
const REFS_TREE: &str = "index:refs";

/// The main storage engine wrapping sled.
///
/// Rows are schema-checked JSON objects. Each write runs in one sled
/// transaction together with its constraint checks, sequence assignment,
/// posting list maintenance and delete cascades.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,

    /// Tree for rows.
    data_tree: Tree,

    /// Tree for sequences.
    meta_tree: Tree,

    /// Tree for reverse foreign-key posting lists (relation + target key -> referencing keys).
    refs_tree: Tree,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let data_tree = db.open_tree(DATA_TREE)?;
        let meta_tree = db.open_tree(META_TREE)?;
        let refs_tree = db.open_tree(REFS_TREE)?;

        debug!(path = %config.path.display(), temporary = config.temporary, "storage opened");
        Ok(Self {
            db,
            data_tree,
            meta_tree,
            refs_tree,
        })
    }

    /// Check if the database was recovered from a previous run.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Insert a new row.
    ///
    /// A missing sequence-backed key is assigned from the entity's sequence.
    /// Returns the key and the row as stored.
    pub fn insert(
        &self,
        schema: &SchemaBundle,
        entity: &str,
        row: Row,
    ) -> Result<(RowKey, Row), Error> {
        let def = schema.entity(entity)?;
        let validator = ConstraintValidator::new(schema);
        let row = validator.prepare(def, row)?;

        let (key, row) = finish(self.trees().transaction(|(data, meta, refs)| {
            let tx = TxView::new(data, meta, refs);
            let mut row = row.clone();

            if let Some(serial) = def.serial_field() {
                match row.get(&serial.name).and_then(Value::as_i64) {
                    Some(explicit) => tx.advance_sequence(entity, explicit)?,
                    None => {
                        let next = tx.next_sequence(entity)?;
                        if i32::try_from(next).is_err() {
                            return abort(Error::InvalidData(format!(
                                "sequence of {entity} is exhausted"
                            )));
                        }
                        row.insert(serial.name.clone(), Value::from(next));
                    }
                }
            }

            let key = validator
                .key(def, &row)
                .map_err(ConflictableTransactionError::Abort)?;
            validator.check_unique(&tx, def, &key)?;
            validator.check_references(&tx, def, &row)?;

            let record = Record::new(&row).map_err(ConflictableTransactionError::Abort)?;
            tx.write_record(entity, &key, &record)?;

            for relation in schema.foreign_keys_from(entity) {
                if let Some(target) = foreign_key_value(&row, &relation.from_field) {
                    tx.add_reference(&relation.name, &RowKey::single(target), &key)?;
                }
            }

            Ok((key, row))
        }))?;

        debug!(entity, %key, "row inserted");
        Ok((key, row))
    }

    /// Replace an existing row with `row`, keyed by its identity fields.
    ///
    /// Fails with `NotFound` if no row has that key.
    pub fn update(&self, schema: &SchemaBundle, entity: &str, row: Row) -> Result<Row, Error> {
        let def = schema.entity(entity)?;
        let validator = ConstraintValidator::new(schema);
        let row = validator.prepare(def, row)?;
        let key = validator.key(def, &row)?;

        finish(self.trees().transaction(|(data, meta, refs)| {
            let tx = TxView::new(data, meta, refs);

            let Some(existing) = tx.read_record(entity, &key)? else {
                return abort(Error::NotFound {
                    entity: entity.to_string(),
                    key: key.clone(),
                });
            };
            let previous = existing.row().map_err(ConflictableTransactionError::Abort)?;

            validator.check_references(&tx, def, &row)?;

            for relation in schema.foreign_keys_from(entity) {
                let before = foreign_key_value(&previous, &relation.from_field);
                let after = foreign_key_value(&row, &relation.from_field);
                if before == after {
                    continue;
                }
                if let Some(target) = before {
                    tx.remove_reference(&relation.name, &RowKey::single(target), &key)?;
                }
                if let Some(target) = after {
                    tx.add_reference(&relation.name, &RowKey::single(target), &key)?;
                }
            }

            let record = existing
                .replaced(&row)
                .map_err(ConflictableTransactionError::Abort)?;
            tx.write_record(entity, &key, &record)
        }))?;

        debug!(entity, %key, "row updated");
        Ok(row)
    }

    /// Delete a row and apply the delete behavior of every relation pointing at it.
    ///
    /// Fails with `NotFound` if no row has that key; nothing is removed when
    /// any cascade step fails.
    pub fn delete(
        &self,
        schema: &SchemaBundle,
        entity: &str,
        key: &RowKey,
    ) -> Result<CascadeResult, Error> {
        schema.entity(entity)?;
        let executor = CascadeExecutor::new(schema);

        let result = finish(self.trees().transaction(|(data, meta, refs)| {
            let tx = TxView::new(data, meta, refs);
            executor.delete(&tx, entity, key)
        }))?;

        debug!(
            entity,
            %key,
            deleted = result.deleted.len(),
            nullified = result.nullified.len(),
            "row deleted"
        );
        Ok(result)
    }

    /// Get a row by key.
    pub fn get(&self, entity: &str, key: &RowKey) -> Result<Option<Row>, Error> {
        match self.data_tree.get(row_key(entity, key))? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?.row()?)),
            None => Ok(None),
        }
    }

    /// Get the stored record (payload and timestamps) of a row.
    pub fn get_record(&self, entity: &str, key: &RowKey) -> Result<Option<Record>, Error> {
        match self.data_tree.get(row_key(entity, key))? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Scan all rows of an entity in key order.
    pub fn scan(&self, entity: &str) -> impl Iterator<Item = Result<(RowKey, Row), Error>> + '_ {
        let prefix = entity_prefix(entity);

        self.data_tree.scan_prefix(prefix.clone()).map(move |result| {
            let (key_bytes, value_bytes) = result?;
            let key = strip_prefix(&prefix, &key_bytes)?;
            let row = Record::from_bytes(&value_bytes)?.row()?;
            Ok((key, row))
        })
    }

    /// Count the rows of an entity.
    pub fn count(&self, entity: &str) -> Result<usize, Error> {
        let mut count = 0;
        for result in self.data_tree.scan_prefix(entity_prefix(entity)) {
            result?;
            count += 1;
        }
        Ok(count)
    }

    /// Keys of the rows referencing `target` through a foreign-key relation, in key order.
    pub fn referencing(&self, relation: &str, target: &RowKey) -> Result<Vec<RowKey>, Error> {
        match self.refs_tree.get(reference_key(relation, target))? {
            Some(bytes) => decode_key_list(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the underlying sled database (for opening new trees).
    pub fn db(&self) -> &Db {
        &self.db
    }

    fn trees(&self) -> (&Tree, &Tree, &Tree) {
        (&self.data_tree, &self.meta_tree, &self.refs_tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DeleteBehavior, EntityDef, FieldDef, FieldType, RelationDef, ScalarType};
    use crate::error::{CascadeError, ConstraintError, IntegrityKind};
    use serde_json::json;

    struct TestDb {
        engine: StorageEngine,
        _dir: tempfile::TempDir,
    }

    impl std::ops::Deref for TestDb {
        type Target = StorageEngine;
        fn deref(&self) -> &Self::Target {
            &self.engine
        }
    }

    fn test_engine() -> TestDb {
        let dir = tempfile::tempdir().unwrap();
        let engine = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
        TestDb { engine, _dir: dir }
    }

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    /// Folders own notes (cascade), labels tag notes (set null), pins block note deletion.
    fn schema() -> SchemaBundle {
        let folder = EntityDef::new("Folder", "folders", "id")
            .with_field(FieldDef::serial("id"))
            .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::optional_scalar("parent_id", ScalarType::Int32));
        let note = EntityDef::new("Note", "notes", "id")
            .with_field(FieldDef::serial("id"))
            .with_field(FieldDef::new("folder_id", FieldType::scalar(ScalarType::Int32)))
            .with_field(FieldDef::optional_scalar("label_id", ScalarType::Int32));
        let label = EntityDef::new("Label", "labels", "id").with_field(FieldDef::serial("id"));
        let pin = EntityDef::new("Pin", "pins", "id")
            .with_field(FieldDef::serial("id"))
            .with_field(FieldDef::new("note_id", FieldType::scalar(ScalarType::Int32)));

        SchemaBundle::new(1)
            .with_entity(folder)
            .with_entity(note)
            .with_entity(label)
            .with_entity(pin)
            .with_relation(
                RelationDef::one_to_many("folder_parent", "Folder", "parent_id", "Folder", "id")
                    .with_on_delete(DeleteBehavior::Cascade)
                    .with_navigation("parent", "children"),
            )
            .with_relation(
                RelationDef::one_to_many("note_folder", "Note", "folder_id", "Folder", "id")
                    .with_on_delete(DeleteBehavior::Cascade),
            )
            .with_relation(
                RelationDef::one_to_many("note_label", "Note", "label_id", "Label", "id")
                    .with_on_delete(DeleteBehavior::SetNull),
            )
            .with_relation(RelationDef::one_to_many("pin_note", "Pin", "note_id", "Note", "id"))
    }

    #[test]
    fn test_insert_assigns_sequence() {
        let engine = test_engine();
        let schema = schema();

        let (k1, r1) = engine
            .insert(&schema, "Folder", row(json!({"name": "a"})))
            .unwrap();
        let (k2, _) = engine
            .insert(&schema, "Folder", row(json!({"name": "b"})))
            .unwrap();

        assert_eq!(k1, RowKey::single(1));
        assert_eq!(k2, RowKey::single(2));
        assert_eq!(r1["id"], json!(1));
        assert_eq!(r1["parent_id"], Value::Null);
        assert_eq!(engine.count("Folder").unwrap(), 2);
    }

    #[test]
    fn test_explicit_key_advances_sequence() {
        let engine = test_engine();
        let schema = schema();

        engine
            .insert(&schema, "Folder", row(json!({"id": 10, "name": "a"})))
            .unwrap();
        let (key, _) = engine
            .insert(&schema, "Folder", row(json!({"name": "b"})))
            .unwrap();
        assert_eq!(key, RowKey::single(11));

        let err = engine
            .insert(&schema, "Folder", row(json!({"id": 10, "name": "c"})))
            .unwrap_err();
        assert_eq!(err.integrity_kind(), Some(IntegrityKind::Uniqueness));
    }

    #[test]
    fn test_insert_rejects_dangling_reference() {
        let engine = test_engine();
        let schema = schema();

        let err = engine
            .insert(&schema, "Note", row(json!({"folder_id": 42})))
            .unwrap_err();

        match err {
            Error::ConstraintViolation(ConstraintError::ForeignKeyViolation {
                constraint,
                value,
                ..
            }) => {
                assert_eq!(constraint, "notes_folder_id_fkey");
                assert_eq!(value, 42);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(engine.count("Note").unwrap(), 0);
    }

    #[test]
    fn test_get_and_scan() {
        let engine = test_engine();
        let schema = schema();

        for name in ["x", "y", "z"] {
            engine
                .insert(&schema, "Folder", row(json!({"name": name})))
                .unwrap();
        }

        let second = engine.get("Folder", &RowKey::single(2)).unwrap().unwrap();
        assert_eq!(second["name"], "y");
        assert!(engine.get("Folder", &RowKey::single(9)).unwrap().is_none());

        let keys: Vec<_> = engine
            .scan("Folder")
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(keys, vec![RowKey::single(1), RowKey::single(2), RowKey::single(3)]);
        assert_eq!(engine.scan("Note").count(), 0);
    }

    #[test]
    fn test_update_moves_references() {
        let engine = test_engine();
        let schema = schema();

        engine.insert(&schema, "Folder", row(json!({"name": "a"}))).unwrap();
        engine.insert(&schema, "Folder", row(json!({"name": "b"}))).unwrap();
        let (note, mut stored) = engine
            .insert(&schema, "Note", row(json!({"folder_id": 1})))
            .unwrap();

        stored.insert("folder_id".into(), json!(2));
        engine.update(&schema, "Note", stored).unwrap();

        assert!(engine.referencing("note_folder", &RowKey::single(1)).unwrap().is_empty());
        assert_eq!(
            engine.referencing("note_folder", &RowKey::single(2)).unwrap(),
            vec![note]
        );
    }

    #[test]
    fn test_update_keeps_created_at() {
        let engine = test_engine();
        let schema = schema();

        let (key, mut stored) = engine
            .insert(&schema, "Folder", row(json!({"name": "a"})))
            .unwrap();
        let before = engine.get_record("Folder", &key).unwrap().unwrap();

        stored.insert("name".into(), json!("renamed"));
        engine.update(&schema, "Folder", stored).unwrap();

        let after = engine.get_record("Folder", &key).unwrap().unwrap();
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.row().unwrap()["name"], "renamed");
    }

    #[test]
    fn test_update_missing_row() {
        let engine = test_engine();
        let schema = schema();

        let err = engine
            .update(&schema, "Folder", row(json!({"id": 5, "name": "a"})))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_cascades_and_nullifies() {
        let engine = test_engine();
        let schema = schema();

        engine.insert(&schema, "Folder", row(json!({"name": "a"}))).unwrap();
        engine.insert(&schema, "Label", row(json!({}))).unwrap();
        engine
            .insert(&schema, "Note", row(json!({"folder_id": 1, "label_id": 1})))
            .unwrap();
        engine
            .insert(&schema, "Note", row(json!({"folder_id": 1})))
            .unwrap();

        let result = engine.delete(&schema, "Label", &RowKey::single(1)).unwrap();
        assert_eq!(result.nullified.len(), 1);
        let note = engine.get("Note", &RowKey::single(1)).unwrap().unwrap();
        assert_eq!(note["label_id"], Value::Null);

        let result = engine.delete(&schema, "Folder", &RowKey::single(1)).unwrap();
        assert_eq!(result.deleted_of("Note").count(), 2);
        assert_eq!(engine.count("Note").unwrap(), 0);
        assert_eq!(engine.count("Folder").unwrap(), 0);
    }

    #[test]
    fn test_delete_restrict_leaves_everything() {
        let engine = test_engine();
        let schema = schema();

        engine.insert(&schema, "Folder", row(json!({"name": "a"}))).unwrap();
        engine.insert(&schema, "Note", row(json!({"folder_id": 1}))).unwrap();
        engine.insert(&schema, "Pin", row(json!({"note_id": 1}))).unwrap();

        // The pin blocks the note two levels below the folder.
        let err = engine
            .delete(&schema, "Folder", &RowKey::single(1))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ConstraintViolation(ConstraintError::RestrictViolation { count: 1, .. })
        ));
        assert_eq!(engine.count("Folder").unwrap(), 1);
        assert_eq!(engine.count("Note").unwrap(), 1);
        assert_eq!(engine.referencing("note_folder", &RowKey::single(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_row() {
        let engine = test_engine();
        let err = engine
            .delete(&schema(), "Folder", &RowKey::single(3))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cascade_depth_limit() {
        let engine = test_engine();
        let schema = schema();

        engine.insert(&schema, "Folder", row(json!({"name": "root"}))).unwrap();
        for parent in 1..=101 {
            engine
                .insert(&schema, "Folder", row(json!({"name": "child", "parent_id": parent})))
                .unwrap();
        }

        let err = engine
            .delete(&schema, "Folder", &RowKey::single(1))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Cascade(CascadeError::MaxDepthExceeded { .. })
        ));
        assert_eq!(engine.count("Folder").unwrap(), 102);

        // A shallower subtree goes through.
        let result = engine.delete(&schema, "Folder", &RowKey::single(90)).unwrap();
        assert_eq!(result.deleted.len(), 12);
        assert_eq!(engine.count("Folder").unwrap(), 89);
    }

    #[test]
    fn test_unknown_entity() {
        let engine = test_engine();
        let err = engine
            .insert(&schema(), "Missing", row(json!({})))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEntity(_)));
    }
}
