//! Named key constraints.
//!
//! Names follow PostgreSQL's defaults (`<table>_pkey`, `<table>_<column>_fkey`)
//! so violations report the same constraint a relational backend would.

use rkyv::{Archive, Deserialize, Serialize};

/// Default name of a table's primary key constraint.
pub fn pkey_name(table: &str) -> String {
    format!("{table}_pkey")
}

/// Default name of the foreign key constraint on `table.column`.
pub fn fkey_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_fkey")
}

/// A declared key constraint.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum ConstraintDef {
    /// The row key; its columns are unique together.
    PrimaryKey {
        /// Constraint name.
        name: String,
        /// Constrained entity.
        entity: String,
        /// Key columns in key order.
        fields: Vec<String>,
    },
    /// A column pointing at another entity's key.
    ForeignKey {
        /// Constraint name.
        name: String,
        /// Referencing entity.
        entity: String,
        /// Referencing column.
        field: String,
        /// Referenced entity.
        references_entity: String,
        /// Referenced column.
        references_field: String,
    },
}

impl ConstraintDef {
    /// A primary key over `fields`.
    pub fn primary_key(
        name: impl Into<String>,
        entity: impl Into<String>,
        fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        ConstraintDef::PrimaryKey {
            name: name.into(),
            entity: entity.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// A foreign key from `entity.field` to `references_entity.references_field`.
    pub fn foreign_key(
        name: impl Into<String>,
        entity: impl Into<String>,
        field: impl Into<String>,
        references_entity: impl Into<String>,
        references_field: impl Into<String>,
    ) -> Self {
        ConstraintDef::ForeignKey {
            name: name.into(),
            entity: entity.into(),
            field: field.into(),
            references_entity: references_entity.into(),
            references_field: references_field.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ConstraintDef::PrimaryKey { name, .. } | ConstraintDef::ForeignKey { name, .. } => name,
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            ConstraintDef::PrimaryKey { entity, .. }
            | ConstraintDef::ForeignKey { entity, .. } => entity,
        }
    }

    /// Columns of the constrained entity this constraint covers.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            ConstraintDef::PrimaryKey { fields, .. } => fields.iter().map(String::as_str).collect(),
            ConstraintDef::ForeignKey { field, .. } => vec![field.as_str()],
        }
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self, ConstraintDef::PrimaryKey { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        assert_eq!(
            pkey_name("sacrud_catalog_product2group"),
            "sacrud_catalog_product2group_pkey"
        );
        assert_eq!(
            fkey_name("sacrud_catalog_stock", "product_id"),
            "sacrud_catalog_stock_product_id_fkey"
        );
    }

    #[test]
    fn test_composite_primary_key() {
        let pkey = ConstraintDef::primary_key(
            pkey_name("sacrud_catalog_product2group"),
            "Product2Group",
            ["product_id", "group_id"],
        );

        assert!(pkey.is_primary_key());
        assert_eq!(pkey.entity(), "Product2Group");
        assert_eq!(pkey.columns(), ["product_id", "group_id"]);
    }

    #[test]
    fn test_foreign_key() {
        let fkey = ConstraintDef::foreign_key(
            fkey_name("sacrud_catalog_stock", "product_id"),
            "Stock",
            "product_id",
            "Product",
            "id",
        );

        assert!(!fkey.is_primary_key());
        assert_eq!(fkey.name(), "sacrud_catalog_stock_product_id_fkey");
        assert_eq!(fkey.columns(), ["product_id"]);
    }
}
