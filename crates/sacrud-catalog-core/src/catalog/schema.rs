//! Schema bundle - versioned snapshot of the entire schema.

use super::{ConstraintDef, EntityDef, Navigation, RelationDef};
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::HashMap;

/// A versioned snapshot of the entire schema.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Schema version (monotonically increasing).
    pub version: u64,
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    /// Entity definitions keyed by name.
    pub entities: HashMap<String, EntityDef>,
    /// Relation definitions keyed by name.
    pub relations: HashMap<String, RelationDef>,
    /// Constraint definitions.
    pub constraints: Vec<ConstraintDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            created_at: crate::storage::key::current_timestamp(),
            entities: HashMap::new(),
            relations: HashMap::new(),
            constraints: Vec::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a relation to the schema.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    /// Add a constraint to the schema.
    pub fn with_constraint(mut self, constraint: ConstraintDef) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get an entity by name, failing for undeclared entities.
    pub fn entity(&self, name: &str) -> Result<&EntityDef, Error> {
        self.get_entity(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// Get an entity by its table identifier.
    pub fn entity_by_table(&self, table: &str) -> Option<&EntityDef> {
        self.entities.values().find(|e| e.table == table)
    }

    /// Get a relation by name.
    pub fn get_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.get(name)
    }

    /// Get all relations for an entity (as source).
    pub fn relations_from(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations
            .values()
            .filter(|r| r.from_entity == entity)
            .collect()
    }

    /// Get all relations to an entity (as target).
    pub fn relations_to(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations
            .values()
            .filter(|r| r.to_entity == entity)
            .collect()
    }

    /// Foreign-key relations whose key column lives on `entity`, by name.
    pub fn foreign_keys_from(&self, entity: &str) -> Vec<&RelationDef> {
        let mut relations: Vec<_> = self
            .relations
            .values()
            .filter(|r| r.is_foreign_key() && r.from_entity == entity)
            .collect();
        relations.sort_by(|a, b| a.name.cmp(&b.name));
        relations
    }

    /// Foreign-key relations pointing at `entity`, by name.
    pub fn foreign_keys_to(&self, entity: &str) -> Vec<&RelationDef> {
        let mut relations: Vec<_> = self
            .relations
            .values()
            .filter(|r| r.is_foreign_key() && r.to_entity == entity)
            .collect();
        relations.sort_by(|a, b| a.name.cmp(&b.name));
        relations
    }

    /// The foreign-key relation from an edge entity to `entity`.
    pub fn edge_link(&self, edge: &str, entity: &str) -> Option<&RelationDef> {
        self.relations
            .values()
            .find(|r| r.is_foreign_key() && r.from_entity == edge && r.to_entity == entity)
    }

    /// Get all constraints for an entity.
    pub fn constraints_for(&self, entity: &str) -> Vec<&ConstraintDef> {
        self.constraints
            .iter()
            .filter(|c| c.entity() == entity)
            .collect()
    }

    /// Name of the primary key constraint of an entity.
    pub fn primary_key_name(&self, entity: &str) -> Option<&str> {
        self.constraints
            .iter()
            .find(|c| c.is_primary_key() && c.entity() == entity)
            .map(ConstraintDef::name)
    }

    /// Name of the foreign key constraint declared on `entity.field`.
    pub fn foreign_key_name(&self, entity: &str, field: &str) -> Option<&str> {
        self.constraints.iter().find_map(|c| match c {
            ConstraintDef::ForeignKey {
                name,
                entity: e,
                field: f,
                ..
            } if e == entity && f == field => Some(name.as_str()),
            _ => None,
        })
    }

    /// Resolve a navigation property of an entity.
    pub fn navigation(&self, entity: &str, name: &str) -> Option<Navigation<'_>> {
        let entity = self.entities.get_key_value(entity)?.0.as_str();
        self.relations
            .values()
            .find_map(|r| r.navigation_for(entity, name))
    }

    /// All navigation properties of an entity, sorted by name.
    pub fn navigations_of(&self, entity: &str) -> Vec<Navigation<'_>> {
        let Some((entity, _)) = self.entities.get_key_value(entity) else {
            return Vec::new();
        };
        let entity = entity.as_str();

        let mut navigations = Vec::new();
        for relation in self.relations.values() {
            if relation.from_entity == entity {
                if let Some(nav) = relation.navigation_for(entity, &relation.accessor) {
                    navigations.push(nav);
                }
            }
            if relation.to_entity == entity {
                if let Some(nav) = relation.navigation_for(entity, &relation.backref) {
                    navigations.push(nav);
                }
            }
        }
        navigations.sort_by(|a, b| a.name.cmp(b.name).then(a.relation.name.cmp(&b.relation.name)));
        navigations
    }

    /// List all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    /// Names of the entities exposed as domain objects, sorted. Hidden link
    /// entities are left out.
    pub fn domain_entities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entities
            .values()
            .filter(|e| !e.hidden)
            .map(|e| e.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Check whether two bundles declare the same entities, relations and constraints.
    pub fn same_definitions(&self, other: &SchemaBundle) -> bool {
        self.entities == other.entities
            && self.relations == other.relations
            && self.constraints == other.constraints
    }

    /// Check the schema for internal consistency.
    ///
    /// Every identity field must be a declared integer field, every relation
    /// must join declared fields and point at the identity of its target, and
    /// every constraint must name declared fields.
    pub fn validate(&self) -> Result<(), Error> {
        for entity in self.entities.values() {
            if entity.identity_fields.is_empty() {
                return Err(Error::Schema(format!("{} has no identity", entity.name)));
            }
            for (name, field) in entity.identity_fields.iter().zip(entity.identity()) {
                let is_integer = field
                    .and_then(|f| f.field_type.scalar_type())
                    .is_some_and(|s| s.is_integer());
                if !is_integer {
                    return Err(Error::Schema(format!(
                        "identity field {}.{} must be a declared integer field",
                        entity.name, name
                    )));
                }
            }
        }

        for relation in self.relations.values() {
            let from = self.entity(&relation.from_entity).map_err(|_| {
                Error::Schema(format!(
                    "relation {} starts at unknown entity {}",
                    relation.name, relation.from_entity
                ))
            })?;
            let to = self.entity(&relation.to_entity).map_err(|_| {
                Error::Schema(format!(
                    "relation {} ends at unknown entity {}",
                    relation.name, relation.to_entity
                ))
            })?;

            match &relation.edge_entity {
                None => {
                    if from.get_field(&relation.from_field).is_none() {
                        return Err(Error::Schema(format!(
                            "relation {} uses undeclared field {}.{}",
                            relation.name, from.name, relation.from_field
                        )));
                    }
                    if to.identity_fields != [relation.to_field.clone()] {
                        return Err(Error::Schema(format!(
                            "relation {} must reference the identity of {}",
                            relation.name, to.name
                        )));
                    }
                }
                Some(edge) => {
                    self.entity(edge)?;
                    if self.edge_link(edge, &from.name).is_none()
                        || self.edge_link(edge, &to.name).is_none()
                    {
                        return Err(Error::Schema(format!(
                            "edge entity {} of relation {} must reference both {} and {}",
                            edge, relation.name, from.name, to.name
                        )));
                    }
                }
            }
        }

        for constraint in &self.constraints {
            let entity = self.entity(constraint.entity())?;
            match constraint {
                ConstraintDef::PrimaryKey { fields, .. } if *fields != entity.identity_fields => {
                    return Err(Error::Schema(format!(
                        "primary key {} does not match the identity of {}",
                        constraint.name(),
                        entity.name
                    )));
                }
                ConstraintDef::ForeignKey {
                    references_entity, ..
                } => {
                    self.entity(references_entity)?;
                }
                ConstraintDef::PrimaryKey { .. } => {}
            }
            let columns = constraint.columns();
            if let Some(missing) = columns.iter().find(|f| entity.get_field(f).is_none()) {
                return Err(Error::Schema(format!(
                    "constraint {} names undeclared field {}.{}",
                    constraint.name(),
                    entity.name,
                    missing
                )));
            }
        }

        Ok(())
    }

    /// Serialize the schema bundle to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a schema bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(0)
    }
}
