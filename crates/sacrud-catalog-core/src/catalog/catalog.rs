//! Catalog manager for storing and retrieving schema metadata.

use super::{EntityDef, RelationDef, SchemaBundle};
use crate::error::Error;
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Tree name for schema bundles.
const SCHEMA_TREE: &str = "catalog:schemas";

/// Tree name for catalog metadata.
const META_TREE: &str = "catalog:meta";

/// Key for current schema version in meta tree.
const CURRENT_VERSION_KEY: &[u8] = b"current_version";

/// The catalog manager for schema metadata.
///
/// Every applied bundle is kept under its version number, so the history of
/// the schema survives restarts.
pub struct Catalog {
    /// Schema bundles tree.
    schema_tree: Tree,
    /// Metadata tree.
    meta_tree: Tree,
    /// Current schema version (cached).
    current_version: AtomicU64,
    /// Current schema (cached).
    current_schema: RwLock<Option<Arc<SchemaBundle>>>,
}

impl Catalog {
    /// Open or create a catalog using the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let schema_tree = db.open_tree(SCHEMA_TREE)?;
        let meta_tree = db.open_tree(META_TREE)?;

        let current_version = match meta_tree.get(CURRENT_VERSION_KEY)? {
            Some(bytes) => decode_version(&bytes)?,
            None => 0,
        };

        let catalog = Self {
            schema_tree,
            meta_tree,
            current_version: AtomicU64::new(current_version),
            current_schema: RwLock::new(None),
        };

        if current_version > 0 {
            if let Some(schema) = catalog.schema_at_version(current_version)? {
                *catalog.current_schema.write() = Some(Arc::new(schema));
            }
        }

        debug!(version = current_version, "catalog opened");
        Ok(catalog)
    }

    /// Get the current schema version.
    pub fn current_version(&self) -> u64 {
        self.current_version.load(Ordering::SeqCst)
    }

    /// Get the current schema bundle.
    pub fn current_schema(&self) -> Option<Arc<SchemaBundle>> {
        self.current_schema.read().clone()
    }

    /// Get a schema bundle at a specific version.
    pub fn schema_at_version(&self, version: u64) -> Result<Option<SchemaBundle>, Error> {
        let key = version.to_be_bytes();
        match self.schema_tree.get(key)? {
            Some(bytes) => Ok(Some(SchemaBundle::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Apply a new schema bundle.
    ///
    /// The bundle is validated first and stored under the next version.
    /// Returns the new version number.
    pub fn apply_schema(&self, mut bundle: SchemaBundle) -> Result<u64, Error> {
        bundle.validate()?;

        let new_version = self.current_version() + 1;
        bundle.version = new_version;

        self.schema_tree
            .insert(new_version.to_be_bytes(), bundle.to_bytes()?)?;
        self.meta_tree
            .insert(CURRENT_VERSION_KEY, &new_version.to_be_bytes())?;

        self.current_version.store(new_version, Ordering::SeqCst);
        *self.current_schema.write() = Some(Arc::new(bundle));

        info!(version = new_version, "schema applied");
        Ok(new_version)
    }

    /// Make `bundle` the current schema unless its definitions are already current.
    ///
    /// Returns the version in effect afterwards.
    pub fn ensure_schema(&self, bundle: SchemaBundle) -> Result<u64, Error> {
        if let Some(current) = self.current_schema() {
            if current.same_definitions(&bundle) {
                debug!(version = current.version, "schema unchanged");
                return Ok(current.version);
            }
        }
        self.apply_schema(bundle)
    }

    /// Get an entity definition by name from the current schema.
    pub fn get_entity(&self, name: &str) -> Option<EntityDef> {
        let guard = self.current_schema.read();
        guard.as_ref().and_then(|s| s.get_entity(name).cloned())
    }

    /// List all entity names in the current schema, sorted.
    pub fn list_entities(&self) -> Vec<String> {
        let guard = self.current_schema.read();
        let mut names: Vec<String> = guard
            .as_ref()
            .map(|s| s.entity_names().into_iter().map(String::from).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Get a relation definition by name from the current schema.
    pub fn get_relation(&self, name: &str) -> Option<RelationDef> {
        let guard = self.current_schema.read();
        guard.as_ref().and_then(|s| s.get_relation(name).cloned())
    }

    /// List all schema versions.
    pub fn list_versions(&self) -> Result<Vec<u64>, Error> {
        let mut versions = Vec::new();
        for result in self.schema_tree.iter() {
            let (key, _) = result?;
            versions.push(decode_version(&key)?);
        }
        versions.sort();
        Ok(versions)
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.schema_tree.flush()?;
        self.meta_tree.flush()?;
        Ok(())
    }
}

fn decode_version(bytes: &[u8]) -> Result<u64, Error> {
    let buf: [u8; 8] = bytes.try_into().map_err(|_| Error::InvalidKey)?;
    Ok(u64::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ConstraintDef, FieldDef, FieldType, ScalarType};

    fn sample_schema() -> SchemaBundle {
        let author = EntityDef::new("Author", "authors", "id")
            .with_field(FieldDef::serial("id"))
            .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)));

        let book = EntityDef::new("Book", "books", "id")
            .with_field(FieldDef::serial("id"))
            .with_field(FieldDef::new("title", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::new("author_id", FieldType::scalar(ScalarType::Int32)));

        SchemaBundle::new(0)
            .with_entity(author)
            .with_entity(book)
            .with_relation(RelationDef::one_to_many(
                "book_author",
                "Book",
                "author_id",
                "Author",
                "id",
            ))
            .with_constraint(ConstraintDef::primary_key("authors_pkey", "Author", ["id"]))
    }

    fn test_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[test]
    fn test_catalog_open_empty() {
        let db = test_db();
        let catalog = Catalog::open(&db).unwrap();

        assert_eq!(catalog.current_version(), 0);
        assert!(catalog.current_schema().is_none());
        assert!(catalog.list_entities().is_empty());
    }

    #[test]
    fn test_apply_schema() {
        let db = test_db();
        let catalog = Catalog::open(&db).unwrap();

        let version = catalog.apply_schema(sample_schema()).unwrap();

        assert_eq!(version, 1);
        assert_eq!(catalog.current_version(), 1);
        assert_eq!(catalog.current_schema().unwrap().version, 1);
        assert_eq!(catalog.list_entities(), vec!["Author", "Book"]);
        assert!(catalog.get_entity("Book").is_some());
        assert!(catalog.get_relation("book_author").is_some());
    }

    #[test]
    fn test_apply_rejects_invalid_schema() {
        let db = test_db();
        let catalog = Catalog::open(&db).unwrap();

        let broken = sample_schema().with_relation(RelationDef::one_to_many(
            "book_publisher",
            "Book",
            "publisher_id",
            "Publisher",
            "id",
        ));

        assert!(matches!(catalog.apply_schema(broken), Err(Error::Schema(_))));
        assert_eq!(catalog.current_version(), 0);
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let db = test_db();
        let catalog = Catalog::open(&db).unwrap();

        assert_eq!(catalog.ensure_schema(sample_schema()).unwrap(), 1);
        assert_eq!(catalog.ensure_schema(sample_schema()).unwrap(), 1);

        let extended = sample_schema().with_entity(
            EntityDef::new("Shelf", "shelves", "id").with_field(FieldDef::serial("id")),
        );
        assert_eq!(catalog.ensure_schema(extended).unwrap(), 2);
        assert_eq!(catalog.list_versions().unwrap(), vec![1, 2]);

        let v1 = catalog.schema_at_version(1).unwrap().unwrap();
        assert_eq!(v1.entities.len(), 2);
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let config = sled::Config::new().path(dir.path());

        {
            let db = config.clone().open().unwrap();
            let catalog = Catalog::open(&db).unwrap();
            catalog.apply_schema(sample_schema()).unwrap();
            catalog.flush().unwrap();
        }

        {
            let db = config.open().unwrap();
            let catalog = Catalog::open(&db).unwrap();

            assert_eq!(catalog.current_version(), 1);
            let schema = catalog.current_schema().unwrap();
            assert_eq!(schema.entities.len(), 2);
        }
    }
}
