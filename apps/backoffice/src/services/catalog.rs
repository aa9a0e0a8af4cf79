//! Catalog management: stores, categories, suppliers and products.
//!
//! Everyone signed in can read the catalog. Stores, categories and
//! suppliers are changed by system admins only; products by admins and
//! store managers. Deletes go through [`super::DeletionGuard`].

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use super::{authorize, DEFAULT_LIST_LIMIT};
use crate::error::{ServiceError, ServiceResult};
use crate::AppState;
use retail_core::validation::{validate_name, validate_sku};
use retail_core::{
    Action, Actor, Category, Product, ProductInput, ResourceScope, Store, Supplier,
};
use retail_db::{
    CategoryRepository, ProductRepository, StoreRepository, SupplierRepository, WorkLogRepository,
};
use sqlx::SqliteConnection;

const MAX_NAME: usize = 100;

pub struct CatalogService {
    state: Arc<AppState>,
}

impl CatalogService {
    pub fn new(state: Arc<AppState>) -> Self {
        CatalogService { state }
    }

    // =========================================================================
    // Stores
    // =========================================================================

    pub async fn list_stores(&self, actor: &Actor) -> ServiceResult<Vec<Store>> {
        authorize(actor, Action::ViewCatalog, &ResourceScope::any())?;
        Ok(self.state.db.stores().list().await?)
    }

    pub async fn get_store(&self, actor: &Actor, id: i64) -> ServiceResult<Store> {
        authorize(actor, Action::ViewCatalog, &ResourceScope::any())?;
        self.state
            .db
            .stores()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Store", id))
    }

    pub async fn create_store(
        &self,
        actor: &Actor,
        name: &str,
        address: Option<&str>,
    ) -> ServiceResult<Store> {
        authorize(actor, Action::ManageStore, &ResourceScope::any())?;
        validate_name("name", name, MAX_NAME)?;

        let mut tx = self.state.db.begin().await?;
        let store = StoreRepository::insert_in(&mut tx, name.trim(), address).await?;
        self.log_in(&mut tx, actor, "create_store", json!({ "store_id": store.id })).await?;
        tx.commit().await?;

        info!(store_id = store.id, name = %store.name, "Store created");
        Ok(store)
    }

    pub async fn update_store(
        &self,
        actor: &Actor,
        id: i64,
        name: &str,
        address: Option<&str>,
    ) -> ServiceResult<Store> {
        authorize(actor, Action::ManageStore, &ResourceScope::store(id))?;
        validate_name("name", name, MAX_NAME)?;

        let mut tx = self.state.db.begin().await?;
        let store = StoreRepository::update_in(&mut tx, id, name.trim(), address).await?;
        self.log_in(&mut tx, actor, "update_store", json!({ "store_id": id })).await?;
        tx.commit().await?;
        Ok(store)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn list_categories(&self, actor: &Actor) -> ServiceResult<Vec<Category>> {
        authorize(actor, Action::ViewCatalog, &ResourceScope::any())?;
        Ok(self.state.db.categories().list().await?)
    }

    pub async fn create_category(&self, actor: &Actor, name: &str) -> ServiceResult<Category> {
        authorize(actor, Action::ManageCategory, &ResourceScope::any())?;
        validate_name("name", name, MAX_NAME)?;

        let mut tx = self.state.db.begin().await?;
        let category = CategoryRepository::insert_in(&mut tx, name.trim()).await?;
        self.log_in(&mut tx, actor, "create_category", json!({ "category_id": category.id }))
            .await?;
        tx.commit().await?;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        actor: &Actor,
        id: i64,
        name: &str,
    ) -> ServiceResult<Category> {
        authorize(actor, Action::ManageCategory, &ResourceScope::any())?;
        validate_name("name", name, MAX_NAME)?;

        let mut tx = self.state.db.begin().await?;
        let category = CategoryRepository::update_in(&mut tx, id, name.trim()).await?;
        self.log_in(&mut tx, actor, "update_category", json!({ "category_id": id })).await?;
        tx.commit().await?;
        Ok(category)
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    pub async fn list_suppliers(&self, actor: &Actor) -> ServiceResult<Vec<Supplier>> {
        authorize(actor, Action::ViewCatalog, &ResourceScope::any())?;
        Ok(self.state.db.suppliers().list().await?)
    }

    pub async fn create_supplier(
        &self,
        actor: &Actor,
        name: &str,
        contact_info: Option<&str>,
    ) -> ServiceResult<Supplier> {
        authorize(actor, Action::ManageSupplier, &ResourceScope::any())?;
        validate_name("name", name, MAX_NAME)?;

        let mut tx = self.state.db.begin().await?;
        let supplier = SupplierRepository::insert_in(&mut tx, name.trim(), contact_info).await?;
        self.log_in(&mut tx, actor, "create_supplier", json!({ "supplier_id": supplier.id }))
            .await?;
        tx.commit().await?;
        Ok(supplier)
    }

    pub async fn update_supplier(
        &self,
        actor: &Actor,
        id: i64,
        name: &str,
        contact_info: Option<&str>,
    ) -> ServiceResult<Supplier> {
        authorize(actor, Action::ManageSupplier, &ResourceScope::any())?;
        validate_name("name", name, MAX_NAME)?;

        let mut tx = self.state.db.begin().await?;
        let supplier = SupplierRepository::update_in(&mut tx, id, name.trim(), contact_info).await?;
        self.log_in(&mut tx, actor, "update_supplier", json!({ "supplier_id": id })).await?;
        tx.commit().await?;
        Ok(supplier)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Products whose SKU or name contains `query`; an empty query lists
    /// the catalog.
    pub async fn list_products(
        &self,
        actor: &Actor,
        query: &str,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<Product>> {
        authorize(actor, Action::ViewCatalog, &ResourceScope::any())?;
        Ok(self
            .state
            .db
            .products()
            .search(query, limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .await?)
    }

    pub async fn get_product(&self, actor: &Actor, id: i64) -> ServiceResult<Product> {
        authorize(actor, Action::ViewCatalog, &ResourceScope::any())?;
        self.state
            .db
            .products()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    pub async fn create_product(&self, actor: &Actor, input: &ProductInput) -> ServiceResult<Product> {
        authorize(actor, Action::ManageProduct, &ResourceScope::any())?;
        self.validate_product(input).await?;

        let mut tx = self.state.db.begin().await?;
        let product = ProductRepository::insert_in(&mut tx, input).await?;
        self.log_in(
            &mut tx,
            actor,
            "create_product",
            json!({ "product_id": product.id, "sku": product.sku }),
        )
        .await?;
        tx.commit().await?;

        info!(product_id = product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    pub async fn update_product(
        &self,
        actor: &Actor,
        id: i64,
        input: &ProductInput,
    ) -> ServiceResult<Product> {
        authorize(actor, Action::ManageProduct, &ResourceScope::any())?;
        self.validate_product(input).await?;

        let mut tx = self.state.db.begin().await?;
        let product = ProductRepository::update_in(&mut tx, id, input).await?;
        self.log_in(
            &mut tx,
            actor,
            "update_product",
            json!({ "product_id": id, "sku": product.sku }),
        )
        .await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Field rules plus existence of the referenced category and supplier.
    async fn validate_product(&self, input: &ProductInput) -> ServiceResult<()> {
        validate_sku(&input.sku)?;
        validate_name("name", &input.name, MAX_NAME)?;

        if let Some(category_id) = input.category_id {
            if self.state.db.categories().get(category_id).await?.is_none() {
                return Err(ServiceError::bad_request(format!(
                    "Category {} does not exist",
                    category_id
                )));
            }
        }
        if let Some(supplier_id) = input.supplier_id {
            if self.state.db.suppliers().get(supplier_id).await?.is_none() {
                return Err(ServiceError::bad_request(format!(
                    "Supplier {} does not exist",
                    supplier_id
                )));
            }
        }

        Ok(())
    }

    /// Writes the work log entry inside the caller's transaction.
    async fn log_in(
        &self,
        conn: &mut SqliteConnection,
        actor: &Actor,
        action: &str,
        details: Value,
    ) -> ServiceResult<()> {
        WorkLogRepository::insert_in(
            conn,
            actor.user_id,
            actor.home_store_id,
            action,
            Some(&details),
            self.state.clock.now(),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::World;

    fn input(sku: &str, category_id: Option<i64>, supplier_id: Option<i64>) -> ProductInput {
        ProductInput {
            sku: sku.to_string(),
            name: "Cola 330ml".to_string(),
            description: Some("Can".to_string()),
            category_id,
            supplier_id,
        }
    }

    #[tokio::test]
    async fn test_admin_manages_reference_data() {
        let w = World::new().await;
        let service = CatalogService::new(w.state.clone());

        let store = service.create_store(&w.admin, "Branch East", Some("9 Dock Road")).await.unwrap();
        let store = service.update_store(&w.admin, store.id, "Branch East 2", None).await.unwrap();
        assert_eq!(store.name, "Branch East 2");
        assert_eq!(store.address, None);

        let category = service.create_category(&w.admin, "Beverages").await.unwrap();
        let err = service.create_category(&w.admin, "Beverages").await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
        service.update_category(&w.admin, category.id, "Drinks").await.unwrap();

        let supplier = service.create_supplier(&w.admin, "Acme", Some("acme@example.test")).await.unwrap();
        assert_eq!(supplier.contact_info.as_deref(), Some("acme@example.test"));

        assert_eq!(service.list_categories(&w.cashier).await.unwrap()[0].name, "Drinks");
        assert_eq!(service.list_suppliers(&w.cashier).await.unwrap().len(), 1);
        assert_eq!(service.list_stores(&w.cashier).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_managers_cannot_touch_reference_data() {
        let w = World::new().await;
        let service = CatalogService::new(w.state.clone());

        let err = service.create_store(&w.manager, "Rogue", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
        let err = service.create_category(&w.manager, "Rogue").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
        let err = service.create_supplier(&w.cashier, "Rogue", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
        let err = service.update_store(&w.manager, w.branch, "Mine", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_product_rules() {
        let w = World::new().await;
        let service = CatalogService::new(w.state.clone());
        let category = service.create_category(&w.admin, "Beverages").await.unwrap();

        let product = service
            .create_product(&w.manager, &input("BEV-COLA", Some(category.id), None))
            .await
            .unwrap();
        assert_eq!(product.category_id, Some(category.id));

        let err = service
            .create_product(&w.manager, &input("BEV-COLA", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = service
            .create_product(&w.admin, &input("BEV-TEA", Some(4242), None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = service
            .create_product(&w.admin, &input("bad sku", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = service
            .create_product(&w.cashier, &input("BEV-TEA", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let updated = service
            .update_product(&w.admin, product.id, &input("BEV-COLA-330", None, None))
            .await
            .unwrap();
        assert_eq!(updated.sku, "BEV-COLA-330");
        assert_eq!(updated.category_id, None);

        let err = service
            .update_product(&w.admin, 4242, &input("BEV-X", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));

        let found = service.list_products(&w.cashier, "cola", None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(service.get_product(&w.cashier, product.id).await.unwrap().id, product.id);
    }

    #[tokio::test]
    async fn test_failed_log_rolls_back_catalog_change() {
        let w = World::new().await;
        let service = CatalogService::new(w.state.clone());
        let category = service.create_category(&w.admin, "Beverages").await.unwrap();
        w.fail_work_log_writes().await;

        let err = service.create_category(&w.admin, "Snacks").await.unwrap_err();
        assert!(matches!(err, ServiceError::StorageFailure(_)));
        service.update_category(&w.admin, category.id, "Drinks").await.unwrap_err();
        service.create_store(&w.admin, "Branch East", None).await.unwrap_err();

        let categories = service.list_categories(&w.admin).await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Beverages");
        assert_eq!(service.list_stores(&w.admin).await.unwrap().len(), 3);
    }
}
