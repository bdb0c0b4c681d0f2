//! SACRUD catalog - an embedded product catalog.
//!
//! Products are filed under groups through a many-to-many association and
//! carry stock records per variant. [`Database`] opens the store, applies the
//! catalog schema and offers typed operations on all four tables; integrity
//! rules (required names, unique links, existing parents, cascading link
//! removal, no product delete while stock exists) are enforced by the store.
//!
//! ```no_run
//! use sacrud_catalog::{Database, DatabaseConfig, NewGroup, NewProduct};
//!
//! let db = Database::open(DatabaseConfig::new("./shop"))?;
//! let shoe = db.create_product(NewProduct::named("Shoe"))?;
//! let footwear = db.create_group(NewGroup::named("Footwear"))?;
//! db.attach(shoe.id, footwear.id)?;
//! assert_eq!(db.products_in(footwear.id)?, vec![shoe]);
//! # Ok::<(), sacrud_catalog::Error>(())
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod logging;

pub use config::DatabaseConfig;
pub use database::Database;
pub use error::{Error, Result};

pub use sacrud_catalog_core::{
    CascadeResult, Document, Group, IntegrityKind, NewGroup, NewProduct, NewStock, ParamAttribute,
    Product, ProductGroup, SchemaBundle, Stock, Visible,
};
