//! Schema catalog.
//!
//! The catalog describes entities, their fields, the relations between them
//! and the integrity constraints the store enforces, and keeps every applied
//! schema version in sled.

mod catalog;
mod constraint;
mod entity;
mod field;
mod relation;
mod schema;
mod types;

pub use catalog::Catalog;
pub use constraint::{fkey_name, pkey_name, ConstraintDef};
pub use entity::EntityDef;
pub use field::{DefaultValue, FieldDef};
pub use relation::{Cardinality, DeleteBehavior, Navigation, NavigationKind, RelationDef};
pub use schema::SchemaBundle;
pub use types::{FieldType, ScalarType};
