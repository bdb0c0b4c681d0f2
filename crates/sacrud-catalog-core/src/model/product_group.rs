//! Product to group association.

use serde::{Deserialize, Serialize};

use super::{CatalogRecord, PRODUCT2GROUP_TABLE};
use crate::catalog::{EntityDef, FieldDef, FieldType, ScalarType};
use crate::storage::RowKey;

/// One product filed under one group. The pair is the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductGroup {
    /// Linked product.
    pub product_id: i32,
    /// Linked group.
    pub group_id: i32,
}

impl ProductGroup {
    /// Link `product_id` to `group_id`.
    pub fn new(product_id: i32, group_id: i32) -> Self {
        Self {
            product_id,
            group_id,
        }
    }

    /// Declaration of the association table.
    pub fn entity_def() -> EntityDef {
        EntityDef::with_composite_key(Self::ENTITY, PRODUCT2GROUP_TABLE, ["product_id", "group_id"])
            .with_fields([
                FieldDef::new("product_id", FieldType::scalar(ScalarType::Int32)),
                FieldDef::new("group_id", FieldType::scalar(ScalarType::Int32)),
            ])
            .hidden()
    }
}

impl CatalogRecord for ProductGroup {
    const ENTITY: &'static str = "Product2Group";

    fn key(&self) -> RowKey {
        RowKey::composite([i64::from(self.product_id), i64::from(self.group_id)])
    }
}
