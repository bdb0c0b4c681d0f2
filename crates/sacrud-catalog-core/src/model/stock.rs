//! Stock entity.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CatalogRecord, Document, STOCK_TABLE};
use crate::catalog::{EntityDef, FieldDef, FieldType, ScalarType};
use crate::storage::RowKey;

/// Quantity on hand of one product variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    /// Primary key.
    pub id: i32,
    /// Quantity on hand.
    pub qty: i32,
    /// Variant this stock counts, e.g. `{"size": 42}`.
    pub params: Option<Document>,
    /// Owning product.
    pub product_id: i32,
}

impl Stock {
    /// Declaration of the stock table.
    pub fn entity_def() -> EntityDef {
        EntityDef::new(Self::ENTITY, STOCK_TABLE, "id").with_fields([
            FieldDef::serial("id"),
            FieldDef::new("qty", FieldType::scalar(ScalarType::Int32)),
            FieldDef::document("params"),
            FieldDef::new("product_id", FieldType::scalar(ScalarType::Int32)).with_index(),
        ])
    }
}

impl CatalogRecord for Stock {
    const ENTITY: &'static str = "Stock";

    fn key(&self) -> RowKey {
        RowKey::from(self.id)
    }
}

/// Prints `id=<id>, product=<product_id>, qty=<qty>`.
impl fmt::Display for Stock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={}, product={}, qty={}", self.id, self.product_id, self.qty)
    }
}

/// Insert payload for a stock record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewStock {
    /// Quantity on hand; required by the store.
    pub qty: Option<i32>,
    /// Variant attributes.
    pub params: Option<Document>,
    /// Owning product; required by the store.
    pub product_id: Option<i32>,
}

impl NewStock {
    /// `qty` items of product `product_id`.
    pub fn new(product_id: i32, qty: i32) -> Self {
        Self {
            qty: Some(qty),
            params: None,
            product_id: Some(product_id),
        }
    }

    /// Set the variant attributes.
    pub fn with_params(mut self, params: impl Into<Document>) -> Self {
        self.params = Some(params.into());
        self
    }
}
