//! Integration tests for the catalog schema over the storage engine.

use sacrud_catalog_core::catalog::Catalog;
use sacrud_catalog_core::model::{
    catalog_schema, to_row, NewProduct, NewStock, ProductGroup, NAV_GROUPS, NAV_LINKS,
    NAV_PRODUCTS, PRODUCT2GROUP_GROUP, PRODUCT2GROUP_PRODUCT,
};
use sacrud_catalog_core::{
    CatalogRecord, ConstraintError, Error, IntegrityKind, Navigator, NewGroup, Row, RowKey,
    SchemaBundle, StorageConfig, StorageEngine,
};
use serde_json::json;

struct TestContext {
    storage: StorageEngine,
    schema: SchemaBundle,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
        let catalog = Catalog::open(storage.db()).unwrap();
        catalog.ensure_schema(catalog_schema()).unwrap();
        let schema = (*catalog.current_schema().unwrap()).clone();

        Self {
            storage,
            schema,
            _dir: dir,
        }
    }

    fn insert(&self, entity: &str, row: Row) -> Result<RowKey, Error> {
        self.storage
            .insert(&self.schema, entity, row)
            .map(|(key, _)| key)
    }

    fn product(&self, name: &str) -> RowKey {
        self.insert("Product", to_row(&NewProduct::named(name)).unwrap())
            .unwrap()
    }

    fn group(&self, name: &str) -> RowKey {
        self.insert("Group", to_row(&NewGroup::named(name)).unwrap())
            .unwrap()
    }

    fn link(&self, product: i32, group: i32) -> Result<RowKey, Error> {
        self.insert(
            ProductGroup::ENTITY,
            ProductGroup::new(product, group).to_row().unwrap(),
        )
    }

    fn navigator(&self) -> Navigator<'_> {
        Navigator::new(&self.storage, &self.schema)
    }
}

#[test]
fn test_duplicate_link_is_rejected() {
    let ctx = TestContext::new();
    ctx.product("Shoe");
    ctx.group("Footwear");

    ctx.link(1, 1).unwrap();
    let err = ctx.link(1, 1).unwrap_err();

    match err {
        Error::ConstraintViolation(ConstraintError::UniqueViolation { constraint, key, .. }) => {
            assert_eq!(constraint, "sacrud_catalog_product2group_pkey");
            assert_eq!(key, RowKey::composite([1, 1]));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ctx.storage.count("Product2Group").unwrap(), 1);
}

#[test]
fn test_concurrent_attach_creates_one_link() {
    let ctx = TestContext::new();
    ctx.product("Shoe");
    ctx.group("Footwear");

    let outcomes: Vec<Result<RowKey, Error>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| ctx.link(1, 1))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.integrity_kind() == Some(IntegrityKind::Uniqueness)));
    assert_eq!(ctx.storage.count("Product2Group").unwrap(), 1);
}

#[test]
fn test_link_requires_both_parents() {
    let ctx = TestContext::new();
    ctx.product("Shoe");

    let err = ctx.link(1, 7).unwrap_err();
    assert!(matches!(
        err,
        Error::ConstraintViolation(ConstraintError::ForeignKeyViolation { ref field, value: 7, .. })
            if field == "group_id"
    ));
}

#[test]
fn test_product_delete_removes_only_its_links() {
    let ctx = TestContext::new();
    ctx.product("Shoe");
    ctx.product("Boot");
    ctx.group("Footwear");
    ctx.group("Sale");
    for (p, g) in [(1, 1), (1, 2), (2, 1), (2, 2)] {
        ctx.link(p, g).unwrap();
    }

    let result = ctx
        .storage
        .delete(&ctx.schema, "Product", &RowKey::single(1))
        .unwrap();

    let removed: Vec<_> = result.deleted_of("Product2Group").cloned().collect();
    assert_eq!(removed.len(), 2);
    assert!(removed.iter().all(|k| k.components()[0] == 1));

    let remaining: Vec<_> = ctx
        .storage
        .scan("Product2Group")
        .map(|r| r.unwrap().0)
        .collect();
    assert_eq!(
        remaining,
        vec![RowKey::composite([2, 1]), RowKey::composite([2, 2])]
    );

    // The group side no longer lists the deleted links.
    assert_eq!(
        ctx.storage
            .referencing(PRODUCT2GROUP_GROUP, &RowKey::single(1))
            .unwrap(),
        vec![RowKey::composite([2, 1])]
    );
    assert!(ctx
        .storage
        .referencing(PRODUCT2GROUP_PRODUCT, &RowKey::single(1))
        .unwrap()
        .is_empty());
}

#[test]
fn test_group_delete_keeps_products() {
    let ctx = TestContext::new();
    ctx.product("Shoe");
    ctx.group("Footwear");
    ctx.group("Sale");
    ctx.link(1, 1).unwrap();
    ctx.link(1, 2).unwrap();

    ctx.storage
        .delete(&ctx.schema, "Group", &RowKey::single(1))
        .unwrap();

    assert_eq!(ctx.storage.count("Product").unwrap(), 1);
    let groups = ctx
        .navigator()
        .related("Product", &RowKey::single(1), NAV_GROUPS)
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].1["name"], "Sale");
}

#[test]
fn test_stock_blocks_product_delete() {
    let ctx = TestContext::new();
    ctx.product("Shoe");
    ctx.group("Footwear");
    ctx.link(1, 1).unwrap();
    ctx.insert("Stock", to_row(&NewStock::new(1, 10)).unwrap())
        .unwrap();

    let err = ctx
        .storage
        .delete(&ctx.schema, "Product", &RowKey::single(1))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::ConstraintViolation(ConstraintError::RestrictViolation { count: 1, .. })
    ));
    assert_eq!(ctx.storage.count("Product").unwrap(), 1);
    assert_eq!(ctx.storage.count("Stock").unwrap(), 1);
    assert_eq!(ctx.storage.count("Product2Group").unwrap(), 1);
}

#[test]
fn test_stock_requires_existing_product() {
    let ctx = TestContext::new();

    let err = ctx
        .insert("Stock", to_row(&NewStock::new(99, 1)).unwrap())
        .unwrap_err();
    assert_eq!(err.integrity_kind(), Some(IntegrityKind::Referential));

    let err = ctx
        .insert("Stock", to_row(&json!({"qty": 1})).unwrap())
        .unwrap_err();
    assert_eq!(err.integrity_kind(), Some(IntegrityKind::Null));
}

#[test]
fn test_navigation_through_links() {
    let ctx = TestContext::new();
    ctx.product("Shoe");
    ctx.group("Footwear");
    ctx.link(1, 1).unwrap();

    let nav = ctx.navigator();
    let products = nav
        .related("Group", &RowKey::single(1), NAV_PRODUCTS)
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].1["name"], "Shoe");

    let links = nav
        .related("Product", &RowKey::single(1), NAV_LINKS)
        .unwrap();
    assert_eq!(links[0].0, RowKey::composite([1, 1]));
}

#[test]
fn test_schema_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let storage = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
        let catalog = Catalog::open(storage.db()).unwrap();
        assert_eq!(catalog.ensure_schema(catalog_schema()).unwrap(), 1);
        storage.flush().unwrap();
    }

    let storage = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
    let catalog = Catalog::open(storage.db()).unwrap();
    assert_eq!(catalog.ensure_schema(catalog_schema()).unwrap(), 1);
    assert_eq!(catalog.list_versions().unwrap(), vec![1]);
}
