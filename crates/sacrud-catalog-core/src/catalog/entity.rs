//! Entity (table) declarations.

use super::field::FieldDef;
use rkyv::{Archive, Deserialize, Serialize};

/// An entity definition (table schema).
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name (unique within schema).
    pub name: String,
    /// Storage table identifier.
    pub table: String,
    /// Primary key fields, in key order. More than one makes a composite key.
    pub identity_fields: Vec<String>,
    /// Field definitions.
    pub fields: Vec<FieldDef>,
    /// Pure link entity, not exposed as a domain object.
    pub hidden: bool,
}

impl EntityDef {
    /// Create a new entity definition keyed by a single field.
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        identity_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            identity_fields: vec![identity_field.into()],
            fields: Vec::new(),
            hidden: false,
        }
    }

    /// Create an entity definition keyed by several fields together.
    pub fn with_composite_key(
        name: impl Into<String>,
        table: impl Into<String>,
        identity_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            identity_fields: identity_fields.into_iter().map(Into::into).collect(),
            fields: Vec::new(),
            hidden: false,
        }
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Mark as a pure link entity.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get the identity field definitions, in key order.
    pub fn identity(&self) -> impl Iterator<Item = Option<&FieldDef>> {
        self.identity_fields.iter().map(|name| self.get_field(name))
    }

    /// The single serial key field, if the entity has one.
    pub fn serial_field(&self) -> Option<&FieldDef> {
        match self.identity_fields.as_slice() {
            [only] => self.get_field(only).filter(|f| f.is_serial()),
            _ => None,
        }
    }

    /// Get all indexed fields.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.indexed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldType, ScalarType};

    #[test]
    fn test_entity_builder() {
        let entity = EntityDef::new("Tag", "tags", "id")
            .with_field(FieldDef::serial("id"))
            .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::document("params"));

        assert_eq!(entity.name, "Tag");
        assert_eq!(entity.table, "tags");
        assert_eq!(entity.identity_fields, vec!["id".to_string()]);
        assert_eq!(entity.fields.len(), 3);
        assert!(!entity.hidden);
        assert!(entity.serial_field().is_some());
    }

    #[test]
    fn test_composite_key() {
        let link = EntityDef::with_composite_key("TagLink", "tag_links", ["tag_id", "item_id"])
            .with_field(FieldDef::new("tag_id", FieldType::scalar(ScalarType::Int32)))
            .with_field(FieldDef::new("item_id", FieldType::scalar(ScalarType::Int32)))
            .hidden();

        assert_eq!(link.identity_fields.len(), 2);
        assert!(link.hidden);
        assert!(link.serial_field().is_none());
        assert!(link.identity().all(|f| f.is_some()));
    }

    #[test]
    fn test_get_field() {
        let entity = EntityDef::new("Tag", "tags", "id")
            .with_field(FieldDef::serial("id"))
            .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)));

        assert!(entity.get_field("id").is_some());
        assert!(entity.get_field("nonexistent").is_none());
    }
}
