//! Product entity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::visibility::{visibility_field, Visible};
use super::{CatalogRecord, Document, PRODUCT_TABLE};
use crate::catalog::{EntityDef, FieldDef, FieldType, ScalarType};
use crate::storage::RowKey;

/// A sellable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Primary key.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Visibility flag.
    pub visible: Option<bool>,
    /// Variant attributes (size, color, weight, ...).
    pub params: Option<Document>,
}

impl Product {
    /// Declaration of the product table.
    pub fn entity_def() -> EntityDef {
        EntityDef::new(Self::ENTITY, PRODUCT_TABLE, "id").with_fields([
            FieldDef::serial("id"),
            FieldDef::new("name", FieldType::scalar(ScalarType::String)),
            visibility_field(),
            FieldDef::document("params"),
        ])
    }
}

impl CatalogRecord for Product {
    const ENTITY: &'static str = "Product";

    fn key(&self) -> RowKey {
        RowKey::from(self.id)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Visible for Product {
    fn visible(&self) -> Option<bool> {
        self.visible
    }
}

/// Insert payload for a product; the id comes from the sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewProduct {
    /// Display name; required by the store.
    pub name: Option<String>,
    /// Visibility flag.
    pub visible: Option<bool>,
    /// Variant attributes.
    pub params: Option<Document>,
}

impl NewProduct {
    /// A product called `name`.
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

    /// Set the variant attributes.
    pub fn with_params(mut self, params: impl Into<Document>) -> Self {
        self.params = Some(params.into());
        self
    }
}
