//! SACRUD catalog core - schema declarations and the store that enforces them.
//!
//! The [`model`] module declares the four catalog entities (product, group,
//! their association and stock). [`catalog`] holds the schema description
//! types those declarations are written in, and [`storage`] persists rows
//! while enforcing required fields, primary keys, foreign keys and delete
//! cascades exactly as the schema states them.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod cascade;
pub mod catalog;
pub mod constraint;
pub mod ddl;
pub mod error;
pub mod model;
pub mod navigation;
pub mod storage;

pub use cascade::{CascadeExecutor, CascadeResult};
pub use catalog::{
    Cardinality, Catalog, ConstraintDef, DefaultValue, DeleteBehavior, EntityDef, FieldDef,
    FieldType, Navigation, NavigationKind, RelationDef, ScalarType, SchemaBundle,
};
pub use constraint::ConstraintValidator;
pub use error::{CascadeError, ConstraintError, Error, IntegrityKind};
pub use model::{
    catalog_schema, CatalogRecord, Document, Group, NewGroup, NewProduct, NewStock,
    ParamAttribute, Product, ProductGroup, Stock, Visible,
};
pub use navigation::Navigator;
pub use storage::{Record, Row, RowKey, StorageConfig, StorageEngine};
