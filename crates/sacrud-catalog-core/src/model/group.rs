//! Group (category) entity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::visibility::{visibility_field, Visible};
use super::{CatalogRecord, Document, GROUP_TABLE};
use crate::catalog::{EntityDef, FieldDef, FieldType, ScalarType};
use crate::storage::RowKey;

/// A category products are filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Primary key.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Visibility flag.
    pub visible: Option<bool>,
    /// Free-form group attributes.
    pub params: Option<Document>,
}

impl Group {
    /// Declaration of the group table.
    pub fn entity_def() -> EntityDef {
        EntityDef::new(Self::ENTITY, GROUP_TABLE, "id").with_fields([
            FieldDef::serial("id"),
            FieldDef::new("name", FieldType::scalar(ScalarType::String)),
            visibility_field(),
            FieldDef::document("params"),
        ])
    }
}

impl CatalogRecord for Group {
    const ENTITY: &'static str = "Group";

    fn key(&self) -> RowKey {
        RowKey::from(self.id)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Visible for Group {
    fn visible(&self) -> Option<bool> {
        self.visible
    }
}

/// Insert payload for a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewGroup {
    /// Display name; required by the store.
    pub name: Option<String>,
    /// Visibility flag.
    pub visible: Option<bool>,
    /// Free-form group attributes.
    pub params: Option<Document>,
}

impl NewGroup {
    /// A group called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Set the visibility flag.
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Set the attributes.
    pub fn with_params(mut self, params: impl Into<Document>) -> Self {
        self.params = Some(params.into());
        self
    }
}
