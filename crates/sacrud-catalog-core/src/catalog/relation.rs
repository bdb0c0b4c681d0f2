//! Relation definitions between entities.

use rkyv::{Archive, Deserialize, Serialize};

/// Cardinality of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum Cardinality {
    /// One-to-one relation (unique foreign key).
    OneToOne,
    /// One-to-many relation (foreign key on the many side).
    OneToMany,
    /// Many-to-many relation (requires an edge/link entity).
    ManyToMany,
}

/// Behavior when a referenced entity is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum DeleteBehavior {
    /// Delete related entities.
    Cascade,
    /// Prevent deletion if related entities exist.
    Restrict,
    /// Set foreign key to null.
    SetNull,
}

/// A relation definition between two entities.
///
/// For foreign-key relations `from_entity` holds the key: `from_field` on
/// `from_entity` points at `to_field` (the identity) of `to_entity`.
/// Many-to-many relations carry no key themselves and are realized by the
/// foreign-key relations of their `edge_entity`.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct RelationDef {
    /// Relation name (unique within schema).
    pub name: String,
    /// Source entity name.
    pub from_entity: String,
    /// Target entity name.
    pub to_entity: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Field on the source entity (foreign key).
    pub from_field: String,
    /// Field on the target entity (usually identity).
    pub to_field: String,
    /// Delete behavior.
    pub on_delete: DeleteBehavior,
    /// Edge entity for many-to-many relations.
    pub edge_entity: Option<String>,
    /// Navigation name on the source entity.
    pub accessor: String,
    /// Navigation name on the target entity.
    pub backref: String,
}

/// How a navigation reaches its target rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Follow this row's foreign key to a single parent.
    Parent,
    /// Collect the rows whose foreign key points at this row.
    Children,
    /// Walk through the edge entity of a many-to-many relation.
    Through,
}

/// A named navigation property of an entity, resolved against a relation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Navigation<'a> {
    /// Navigation name.
    pub name: &'a str,
    /// Entity the navigation starts from.
    pub source: &'a str,
    /// Entity the navigation yields.
    pub target: &'a str,
    /// How the target rows are reached.
    pub kind: NavigationKind,
    /// Relation backing the navigation.
    pub relation: &'a RelationDef,
}

impl RelationDef {
    /// Create a one-to-one relation.
    pub fn one_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::foreign_key(
            name,
            Cardinality::OneToOne,
            from_entity,
            from_field,
            to_entity,
            to_field,
        )
    }

    /// Create a one-to-many relation.
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::foreign_key(
            name,
            Cardinality::OneToMany,
            from_entity,
            from_field,
            to_entity,
            to_field,
        )
    }

    fn foreign_key(
        name: impl Into<String>,
        cardinality: Cardinality,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        let from_entity = from_entity.into();
        let to_entity = to_entity.into();
        Self {
            name: name.into(),
            accessor: to_entity.to_lowercase(),
            backref: from_entity.to_lowercase(),
            from_entity,
            to_entity,
            cardinality,
            from_field: from_field.into(),
            to_field: to_field.into(),
            on_delete: DeleteBehavior::Restrict,
            edge_entity: None,
        }
    }

    /// Create a many-to-many relation.
    pub fn many_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
        edge_entity: impl Into<String>,
    ) -> Self {
        let from_entity = from_entity.into();
        let to_entity = to_entity.into();
        Self {
            name: name.into(),
            accessor: to_entity.to_lowercase(),
            backref: from_entity.to_lowercase(),
            from_entity,
            to_entity,
            cardinality: Cardinality::ManyToMany,
            from_field: from_field.into(),
            to_field: to_field.into(),
            on_delete: DeleteBehavior::Cascade,
            edge_entity: Some(edge_entity.into()),
        }
    }

    /// Set delete behavior.
    pub fn with_on_delete(mut self, on_delete: DeleteBehavior) -> Self {
        self.on_delete = on_delete;
        self
    }

    /// Set the navigation names on both sides.
    pub fn with_navigation(mut self, accessor: impl Into<String>, backref: impl Into<String>) -> Self {
        self.accessor = accessor.into();
        self.backref = backref.into();
        self
    }

    /// Check if this is a many-to-many relation.
    pub fn is_many_to_many(&self) -> bool {
        self.cardinality == Cardinality::ManyToMany
    }

    /// Check if this relation is backed by a foreign key column.
    pub fn is_foreign_key(&self) -> bool {
        self.edge_entity.is_none()
    }

    /// Resolve a navigation name as seen from `entity`.
    pub fn navigation_for<'a>(&'a self, entity: &'a str, name: &str) -> Option<Navigation<'a>> {
        let (name, target, kind) = if self.from_entity == entity && self.accessor == name {
            let kind = if self.is_many_to_many() {
                NavigationKind::Through
            } else {
                NavigationKind::Parent
            };
            (self.accessor.as_str(), self.to_entity.as_str(), kind)
        } else if self.to_entity == entity && self.backref == name {
            let kind = if self.is_many_to_many() {
                NavigationKind::Through
            } else {
                NavigationKind::Children
            };
            (self.backref.as_str(), self.from_entity.as_str(), kind)
        } else {
            return None;
        };

        Some(Navigation {
            name,
            source: entity,
            target,
            kind,
            relation: self,
        })
    }
}
