//! Catalog entity declarations.
//!
//! Four tables make up the catalog: products, groups, the many-to-many
//! association between them, and stock records. Every declaration here is
//! static; [`catalog_schema`] assembles them into the schema the store enforces.
//!
//! | Entity | Table | Navigations |
//! |---|---|---|
//! | `Product` | `sacrud_catalog_product` | `groups`, `stock`, `m2m_product2group` |
//! | `Group` | `sacrud_catalog_group` | `products`, `m2m_product2group` |
//! | `Product2Group` | `sacrud_catalog_product2group` | `product`, `group` |
//! | `Stock` | `sacrud_catalog_stock` | `product` |

mod document;
mod group;
mod product;
mod product_group;
mod stock;
mod visibility;

pub use document::{Document, ParamAttribute, KIND_CHOICE, KIND_LIST, KIND_NUMBER};
pub use group::{Group, NewGroup};
pub use product::{NewProduct, Product};
pub use product_group::ProductGroup;
pub use stock::{NewStock, Stock};
pub use visibility::{visibility_field, Visible, VISIBLE_FIELD};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::{
    fkey_name, pkey_name, ConstraintDef, DeleteBehavior, EntityDef, RelationDef, SchemaBundle,
};
use crate::error::Error;
use crate::storage::{Row, RowKey};

/// Product table identifier.
pub const PRODUCT_TABLE: &str = "sacrud_catalog_product";
/// Group table identifier.
pub const GROUP_TABLE: &str = "sacrud_catalog_group";
/// Association table identifier.
pub const PRODUCT2GROUP_TABLE: &str = "sacrud_catalog_product2group";
/// Stock table identifier.
pub const STOCK_TABLE: &str = "sacrud_catalog_stock";

/// Association row to its product.
pub const PRODUCT2GROUP_PRODUCT: &str = "product2group_product";
/// Association row to its group.
pub const PRODUCT2GROUP_GROUP: &str = "product2group_group";
/// Stock row to its product.
pub const STOCK_PRODUCT: &str = "stock_product";
/// Groups to products through the association.
pub const GROUP_PRODUCTS: &str = "group_products";

/// Navigation from a product to its groups.
pub const NAV_GROUPS: &str = "groups";
/// Navigation from a group to its products.
pub const NAV_PRODUCTS: &str = "products";
/// Navigation from a product to its stock.
pub const NAV_STOCK: &str = "stock";
/// Navigation from a product or group to its association rows.
pub const NAV_LINKS: &str = "m2m_product2group";
/// Navigation to the product of an association or stock row.
pub const NAV_PRODUCT: &str = "product";
/// Navigation to the group of an association row.
pub const NAV_GROUP: &str = "group";

/// A typed catalog record stored as a row of one entity.
pub trait CatalogRecord: Serialize + DeserializeOwned {
    /// Entity name in the schema.
    const ENTITY: &'static str;

    /// Primary key of this record.
    fn key(&self) -> RowKey;

    /// Convert to a row payload.
    fn to_row(&self) -> Result<Row, Error> {
        to_row(self)
    }

    /// Build from a stored row.
    fn from_row(row: Row) -> Result<Self, Error> {
        serde_json::from_value(Value::Object(row))
            .map_err(|e| Error::Deserialization(format!("{}: {}", Self::ENTITY, e)))
    }
}

/// Serialize any record or insert payload into a row.
pub fn to_row<T: Serialize + ?Sized>(value: &T) -> Result<Row, Error> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(Error::InvalidData(format!(
            "row payload must be an object, got {other}"
        ))),
        Err(e) => Err(Error::Serialization(e.to_string())),
    }
}

/// The relations between catalog entities.
pub fn catalog_relations() -> Vec<RelationDef> {
    vec![
        RelationDef::one_to_many(
            PRODUCT2GROUP_PRODUCT,
            ProductGroup::ENTITY,
            "product_id",
            Product::ENTITY,
            "id",
        )
        .with_on_delete(DeleteBehavior::Cascade)
        .with_navigation(NAV_PRODUCT, NAV_LINKS),
        RelationDef::one_to_many(
            PRODUCT2GROUP_GROUP,
            ProductGroup::ENTITY,
            "group_id",
            Group::ENTITY,
            "id",
        )
        .with_on_delete(DeleteBehavior::Cascade)
        .with_navigation(NAV_GROUP, NAV_LINKS),
        // No cascade: a product with stock cannot be deleted.
        RelationDef::one_to_many(STOCK_PRODUCT, Stock::ENTITY, "product_id", Product::ENTITY, "id")
            .with_on_delete(DeleteBehavior::Restrict)
            .with_navigation(NAV_PRODUCT, NAV_STOCK),
        RelationDef::many_to_many(
            GROUP_PRODUCTS,
            Group::ENTITY,
            "id",
            Product::ENTITY,
            "id",
            ProductGroup::ENTITY,
        )
        .with_navigation(NAV_PRODUCTS, NAV_GROUPS),
    ]
}

/// Primary and foreign key constraints, named the way PostgreSQL names them.
pub fn catalog_constraints(entities: &[EntityDef], relations: &[RelationDef]) -> Vec<ConstraintDef> {
    let table_of = |name: &str| {
        entities
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.table.clone())
            .unwrap_or_else(|| name.to_lowercase())
    };

    let primary_keys = entities.iter().map(|e| {
        ConstraintDef::primary_key(
            pkey_name(&e.table),
            e.name.clone(),
            e.identity_fields.clone(),
        )
    });
    let foreign_keys = relations.iter().filter(|r| r.is_foreign_key()).map(|r| {
        ConstraintDef::foreign_key(
            fkey_name(&table_of(&r.from_entity), &r.from_field),
            r.from_entity.clone(),
            r.from_field.clone(),
            r.to_entity.clone(),
            r.to_field.clone(),
        )
    });

    primary_keys.chain(foreign_keys).collect()
}

/// The complete catalog schema.
pub fn catalog_schema() -> SchemaBundle {
    let entities = vec![
        Product::entity_def(),
        Group::entity_def(),
        ProductGroup::entity_def(),
        Stock::entity_def(),
    ];
    let relations = catalog_relations();
    let mut constraints = catalog_constraints(&entities, &relations);
    constraints.sort_by(|a, b| a.name().cmp(b.name()));

    let mut schema = SchemaBundle::new(0);
    for entity in entities {
        schema = schema.with_entity(entity);
    }
    for relation in relations {
        schema = schema.with_relation(relation);
    }
    for constraint in constraints {
        schema = schema.with_constraint(constraint);
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Cardinality, NavigationKind};
    use serde_json::json;

    #[test]
    fn test_catalog_schema_is_valid() {
        let schema = catalog_schema();
        schema.validate().unwrap();

        assert_eq!(schema.entities.len(), 4);
        assert_eq!(schema.relations.len(), 4);
        assert_eq!(schema.constraints.len(), 7);
        assert!(schema.entity_by_table(PRODUCT2GROUP_TABLE).unwrap().hidden);
        assert_eq!(schema.domain_entities(), ["Group", "Product", "Stock"]);
    }

    #[test]
    fn test_column_sets() {
        let schema = catalog_schema();
        let columns = |entity: &str| -> Vec<String> {
            schema
                .get_entity(entity)
                .unwrap()
                .fields
                .iter()
                .map(|f| f.name.clone())
                .collect()
        };

        assert_eq!(columns("Product"), ["id", "name", "visible", "params"]);
        assert_eq!(columns("Group"), ["id", "name", "visible", "params"]);
        assert_eq!(columns("Product2Group"), ["product_id", "group_id"]);
        assert_eq!(columns("Stock"), ["id", "qty", "params", "product_id"]);

        let stock = schema.get_entity("Stock").unwrap();
        assert!(stock.get_field(VISIBLE_FIELD).is_none());
        assert!(stock.get_field("product_id").unwrap().required);
    }

    #[test]
    fn test_navigations() {
        let schema = catalog_schema();
        let names = |entity: &str| {
            schema
                .navigations_of(entity)
                .iter()
                .map(|n| n.name)
                .collect::<Vec<_>>()
        };

        assert_eq!(names("Product"), ["groups", "m2m_product2group", "stock"]);
        assert_eq!(names("Group"), ["m2m_product2group", "products"]);
        assert_eq!(names("Product2Group"), ["group", "product"]);
        assert_eq!(names("Stock"), ["product"]);

        let groups = schema.navigation("Product", NAV_GROUPS).unwrap();
        assert_eq!(groups.kind, NavigationKind::Through);
        assert_eq!(groups.relation.cardinality, Cardinality::ManyToMany);
    }

    #[test]
    fn test_delete_behaviors() {
        let schema = catalog_schema();
        let on_delete = |name: &str| schema.get_relation(name).unwrap().on_delete;

        assert_eq!(on_delete(PRODUCT2GROUP_PRODUCT), DeleteBehavior::Cascade);
        assert_eq!(on_delete(PRODUCT2GROUP_GROUP), DeleteBehavior::Cascade);
        assert_eq!(on_delete(STOCK_PRODUCT), DeleteBehavior::Restrict);
    }

    #[test]
    fn test_constraint_names() {
        let schema = catalog_schema();

        assert_eq!(
            schema.primary_key_name("Product2Group"),
            Some("sacrud_catalog_product2group_pkey")
        );
        assert_eq!(
            schema.foreign_key_name("Stock", "product_id"),
            Some("sacrud_catalog_stock_product_id_fkey")
        );
    }

    #[test]
    fn test_record_rows() {
        let product = Product {
            id: 3,
            name: "Shoe".into(),
            visible: None,
            params: Some(Document::new(json!({"size": {"type": "list", "value": [42]}}))),
        };
        let row = product.to_row().unwrap();
        assert_eq!(row["visible"], Value::Null);
        assert_eq!(Product::from_row(row).unwrap(), product);

        assert_eq!(product.to_string(), "Shoe");
        let stock = Stock {
            id: 4,
            qty: 10,
            params: None,
            product_id: 3,
        };
        assert_eq!(stock.to_string(), "id=4, product=3, qty=10");

        let link = ProductGroup::new(1, 2);
        assert_eq!(link.key(), RowKey::composite([1, 2]));

        let missing_name = to_row(&NewProduct::default()).unwrap();
        assert_eq!(missing_name["name"], Value::Null);

        assert!(Stock::from_row(to_row(&json!({"id": 1})).unwrap()).is_err());
        assert!(to_row(&json!([1])).is_err());
    }
}
