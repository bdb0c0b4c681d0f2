//! Navigation between related rows.
//!
//! A navigation property is resolved against the schema and followed through
//! the store: to the parent named by a foreign key, to the children listed in
//! the reverse posting list, or through the rows of an edge entity.

use crate::catalog::{NavigationKind, SchemaBundle};
use crate::error::Error;
use crate::storage::{foreign_key_value, Row, RowKey, StorageEngine};

/// Follows navigation properties of stored rows.
pub struct Navigator<'a> {
    engine: &'a StorageEngine,
    schema: &'a SchemaBundle,
}

impl<'a> Navigator<'a> {
    /// Create a navigator over `engine` using the relations of `schema`.
    pub fn new(engine: &'a StorageEngine, schema: &'a SchemaBundle) -> Self {
        Self { engine, schema }
    }

    /// Rows reached from `entity` row `key` through the navigation `name`.
    ///
    /// Results come in key order of the traversed posting list. Fails with
    /// `NotFound` if the source row does not exist and with `Schema` if the
    /// entity has no such navigation.
    pub fn related(
        &self,
        entity: &str,
        key: &RowKey,
        name: &str,
    ) -> Result<Vec<(RowKey, Row)>, Error> {
        let nav = self.schema.navigation(entity, name).ok_or_else(|| {
            Error::Schema(format!("{entity} has no navigation '{name}'"))
        })?;

        let source = self.engine.get(entity, key)?.ok_or_else(|| Error::NotFound {
            entity: entity.to_string(),
            key: key.clone(),
        })?;

        let relation = nav.relation;
        let target_keys = match nav.kind {
            NavigationKind::Parent => foreign_key_value(&source, &relation.from_field)
                .map(RowKey::single)
                .into_iter()
                .collect(),
            NavigationKind::Children => self.engine.referencing(&relation.name, key)?,
            NavigationKind::Through => {
                let edge = relation.edge_entity.as_deref().ok_or_else(|| {
                    Error::Schema(format!("relation {} has no edge entity", relation.name))
                })?;
                let inbound = self.schema.edge_link(edge, nav.source).ok_or_else(|| {
                    Error::Schema(format!("{edge} does not reference {}", nav.source))
                })?;
                let outbound = self.schema.edge_link(edge, nav.target).ok_or_else(|| {
                    Error::Schema(format!("{edge} does not reference {}", nav.target))
                })?;

                let mut keys = Vec::new();
                for edge_key in self.engine.referencing(&inbound.name, key)? {
                    let Some(edge_row) = self.engine.get(edge, &edge_key)? else {
                        continue;
                    };
                    if let Some(target) = foreign_key_value(&edge_row, &outbound.from_field) {
                        keys.push(RowKey::single(target));
                    }
                }
                keys
            }
        };

        let mut rows = Vec::with_capacity(target_keys.len());
        for target_key in target_keys {
            if let Some(row) = self.engine.get(nav.target, &target_key)? {
                rows.push((target_key, row));
            }
        }
        Ok(rows)
    }

    /// The single row reached through a to-one navigation, if any.
    pub fn parent(
        &self,
        entity: &str,
        key: &RowKey,
        name: &str,
    ) -> Result<Option<(RowKey, Row)>, Error> {
        Ok(self.related(entity, key, name)?.into_iter().next())
    }
}
