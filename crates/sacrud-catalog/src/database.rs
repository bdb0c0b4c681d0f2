//! Catalog database handle.

use std::sync::Arc;

use sacrud_catalog_core::model::{
    catalog_schema, to_row, NAV_GROUPS, NAV_LINKS, NAV_PRODUCT, NAV_PRODUCTS, NAV_STOCK,
};
use sacrud_catalog_core::{
    ddl, CascadeResult, Catalog, CatalogRecord, Error as CoreError, Group, NewGroup, NewProduct,
    NewStock, Navigator, Product, ProductGroup, RowKey, SchemaBundle, Stock, StorageEngine,
    Visible,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::Result;

/// An open catalog: the store plus the schema it enforces.
pub struct Database {
    storage: StorageEngine,
    catalog: Catalog,
    schema: Arc<SchemaBundle>,
}

impl Database {
    /// Open or create the database described by `config`.
    ///
    /// The catalog schema is applied on first open. Re-opening with unchanged
    /// definitions keeps the stored schema version.
    pub fn open(config: DatabaseConfig) -> Result<Self> {
        config.validate()?;
        if !config.temporary {
            std::fs::create_dir_all(&config.data_path)?;
        }

        let storage = StorageEngine::open(config.to_storage_config())?;
        let catalog = Catalog::open(storage.db())?;
        let version = catalog.ensure_schema(catalog_schema())?;
        let schema = catalog.current_schema().ok_or_else(|| {
            CoreError::Schema(format!("schema version {version} is not loaded"))
        })?;

        info!(
            path = %config.data_path.display(),
            temporary = config.temporary,
            recovered = storage.was_recovered(),
            schema_version = version,
            "catalog database opened"
        );

        Ok(Self {
            storage,
            catalog,
            schema,
        })
    }

    /// Open an in-memory database.
    pub fn temporary() -> Result<Self> {
        Self::open(DatabaseConfig::temporary())
    }

    /// The storage engine.
    pub fn storage(&self) -> &StorageEngine {
        &self.storage
    }

    /// The schema catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The schema in force.
    pub fn schema(&self) -> &SchemaBundle {
        &self.schema
    }

    /// Domain entities of the catalog; the association table is not listed.
    pub fn entities(&self) -> Vec<&str> {
        self.schema.domain_entities()
    }

    /// Version of the schema in force.
    pub fn schema_version(&self) -> u64 {
        self.schema.version
    }

    /// PostgreSQL `CREATE TABLE` statements for the catalog tables.
    pub fn ddl(&self) -> Result<String> {
        Ok(ddl::schema_sql(&self.schema)?)
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.storage.flush()?;
        Ok(())
    }

    // Products

    /// Insert a product; its id comes from the product sequence.
    pub fn create_product(&self, product: NewProduct) -> Result<Product> {
        self.create(&product)
    }

    /// Look up a product by id.
    pub fn product(&self, id: i32) -> Result<Option<Product>> {
        self.fetch(&RowKey::from(id))
    }

    /// All products in id order.
    pub fn products(&self) -> Result<Vec<Product>> {
        self.all()
    }

    /// Products explicitly marked visible.
    pub fn visible_products(&self) -> Result<Vec<Product>> {
        Ok(self.products()?.into_iter().filter(|p| p.is_visible()).collect())
    }

    /// Replace a stored product.
    pub fn update_product(&self, product: &Product) -> Result<Product> {
        self.replace(product)
    }

    /// Delete a product together with its group links.
    ///
    /// Refused while stock rows reference the product.
    pub fn delete_product(&self, id: i32) -> Result<CascadeResult> {
        self.remove(Product::ENTITY, &RowKey::from(id))
    }

    // Groups

    /// Insert a group; its id comes from the group sequence.
    pub fn create_group(&self, group: NewGroup) -> Result<Group> {
        self.create(&group)
    }

    /// Look up a group by id.
    pub fn group(&self, id: i32) -> Result<Option<Group>> {
        self.fetch(&RowKey::from(id))
    }

    /// All groups in id order.
    pub fn groups(&self) -> Result<Vec<Group>> {
        self.all()
    }

    /// Groups explicitly marked visible.
    pub fn visible_groups(&self) -> Result<Vec<Group>> {
        Ok(self.groups()?.into_iter().filter(|g| g.is_visible()).collect())
    }

    /// Replace a stored group.
    pub fn update_group(&self, group: &Group) -> Result<Group> {
        self.replace(group)
    }

    /// Delete a group together with its product links. Products stay.
    pub fn delete_group(&self, id: i32) -> Result<CascadeResult> {
        self.remove(Group::ENTITY, &RowKey::from(id))
    }

    // Association

    /// File a product under a group.
    ///
    /// Fails with a uniqueness violation if the pair is already linked.
    pub fn attach(&self, product_id: i32, group_id: i32) -> Result<ProductGroup> {
        self.create(&ProductGroup::new(product_id, group_id))
    }

    /// Remove a product from a group. Returns whether the link existed.
    pub fn detach(&self, product_id: i32, group_id: i32) -> Result<bool> {
        let link = ProductGroup::new(product_id, group_id);
        match self.storage.delete(&self.schema, ProductGroup::ENTITY, &link.key()) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Groups a product is filed under.
    pub fn groups_of(&self, product_id: i32) -> Result<Vec<Group>> {
        self.related(Product::ENTITY, &RowKey::from(product_id), NAV_GROUPS)
    }

    /// Products filed under a group.
    pub fn products_in(&self, group_id: i32) -> Result<Vec<Product>> {
        self.related(Group::ENTITY, &RowKey::from(group_id), NAV_PRODUCTS)
    }

    /// Association rows of a product.
    pub fn links_of_product(&self, product_id: i32) -> Result<Vec<ProductGroup>> {
        self.related(Product::ENTITY, &RowKey::from(product_id), NAV_LINKS)
    }

    /// Association rows of a group.
    pub fn links_of_group(&self, group_id: i32) -> Result<Vec<ProductGroup>> {
        self.related(Group::ENTITY, &RowKey::from(group_id), NAV_LINKS)
    }

    // Stock

    /// Insert a stock record for an existing product.
    pub fn create_stock(&self, stock: NewStock) -> Result<Stock> {
        self.create(&stock)
    }

    /// Look up a stock record by id.
    pub fn stock(&self, id: i32) -> Result<Option<Stock>> {
        self.fetch(&RowKey::from(id))
    }

    /// Replace a stored stock record.
    pub fn update_stock(&self, stock: &Stock) -> Result<Stock> {
        self.replace(stock)
    }

    /// Delete a stock record.
    pub fn delete_stock(&self, id: i32) -> Result<()> {
        self.remove(Stock::ENTITY, &RowKey::from(id))?;
        Ok(())
    }

    /// Stock records of a product.
    pub fn stock_of(&self, product_id: i32) -> Result<Vec<Stock>> {
        self.related(Product::ENTITY, &RowKey::from(product_id), NAV_STOCK)
    }

    /// The product a stock record counts.
    pub fn product_of(&self, stock: &Stock) -> Result<Option<Product>> {
        let navigator = Navigator::new(&self.storage, &self.schema);
        navigator
            .parent(Stock::ENTITY, &stock.key(), NAV_PRODUCT)?
            .map(|(_, row)| Product::from_row(row))
            .transpose()
            .map_err(Into::into)
    }

    fn create<T, P>(&self, payload: &P) -> Result<T>
    where
        T: CatalogRecord,
        P: Serialize + ?Sized,
    {
        let (key, row) = self.storage.insert(&self.schema, T::ENTITY, to_row(payload)?)?;
        debug!(entity = T::ENTITY, %key, "record created");
        Ok(T::from_row(row)?)
    }

    fn fetch<T: CatalogRecord>(&self, key: &RowKey) -> Result<Option<T>> {
        self.storage
            .get(T::ENTITY, key)?
            .map(T::from_row)
            .transpose()
            .map_err(Into::into)
    }

    fn all<T: CatalogRecord>(&self) -> Result<Vec<T>> {
        self.storage
            .scan(T::ENTITY)
            .map(|entry| -> Result<T> {
                let (_, row) = entry?;
                Ok(T::from_row(row)?)
            })
            .collect()
    }

    fn replace<T: CatalogRecord>(&self, record: &T) -> Result<T> {
        let row = self.storage.update(&self.schema, T::ENTITY, record.to_row()?)?;
        Ok(T::from_row(row)?)
    }

    fn remove(&self, entity: &str, key: &RowKey) -> Result<CascadeResult> {
        let result = self.storage.delete(&self.schema, entity, key)?;
        info!(
            entity,
            %key,
            affected = result.affected_count(),
            "record deleted"
        );
        Ok(result)
    }

    fn related<T: CatalogRecord>(&self, entity: &str, key: &RowKey, name: &str) -> Result<Vec<T>> {
        Navigator::new(&self.storage, &self.schema)
            .related(entity, key, name)?
            .into_iter()
            .map(|(_, row)| T::from_row(row).map_err(Into::into))
            .collect()
    }
}
