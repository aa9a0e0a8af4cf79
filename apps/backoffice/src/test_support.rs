//! Fixtures shared by the service tests.

use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::config::BackofficeConfig;
use crate::AppState;
use retail_core::{
    Actor, DiscountType, Feature, FixedClock, PermissionGrant, ProductInput, Promotion,
    PromotionInput, Role,
};
use retail_db::{Database, DbConfig, PromotionRepository};

pub const TODAY: &str = "2024-06-15";

pub fn today() -> NaiveDate {
    TODAY.parse().unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

pub fn test_config() -> BackofficeConfig {
    BackofficeConfig::from_toml(
        r#"
        [database]
        path = ":memory:"

        [auth]
        jwt_secret = "test-secret"
        "#,
    )
    .unwrap()
}

pub async fn state_with(db: Database, config: BackofficeConfig) -> Arc<AppState> {
    Arc::new(AppState::new(db, config, Arc::new(FixedClock::on(today()))))
}

/// In-memory database, clock frozen on [`TODAY`].
pub async fn state() -> Arc<AppState> {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    state_with(db, test_config()).await
}

/// File-backed database with a multi-connection pool.
pub async fn file_state(path: &Path) -> Arc<AppState> {
    let db = Database::new(DbConfig::new(path).max_connections(8))
        .await
        .unwrap();
    state_with(db, test_config()).await
}

/// A head office, two branches and staff for each.
pub struct World {
    pub state: Arc<AppState>,
    pub admin: Actor,
    /// Store 2
    pub branch: i64,
    pub manager: Actor,
    pub cashier: Actor,
    /// Store 3
    pub other_branch: i64,
    pub other_manager: Actor,
    pub other_cashier: Actor,
}

impl World {
    pub async fn new() -> World {
        Self::build(state().await).await
    }

    pub async fn build(state: Arc<AppState>) -> World {
        let db = &state.db;
        db.stores().ensure_head_office("Head Office").await.unwrap();
        let branch = db.stores().insert("Branch North", None).await.unwrap().id;
        let other_branch = db.stores().insert("Branch South", None).await.unwrap().id;

        let admin = account(db, "admin", Role::SystemAdmin, Some(1)).await;
        let manager = account(db, "manager.north", Role::StoreManager, Some(branch)).await;
        let cashier = account(db, "cashier.north", Role::Cashier, Some(branch)).await;
        let other_manager = account(db, "manager.south", Role::StoreManager, Some(other_branch)).await;
        let other_cashier = account(db, "cashier.south", Role::Cashier, Some(other_branch)).await;

        World {
            state,
            admin,
            branch,
            manager,
            cashier,
            other_branch,
            other_manager,
            other_cashier,
        }
    }

    /// A product with stock in `store_id`.
    pub async fn stocked(&self, sku: &str, store_id: i64, quantity: i64, price_cents: i64) -> i64 {
        let product = self
            .state
            .db
            .products()
            .insert(&product_input(sku))
            .await
            .unwrap();
        self.stock(product.id, store_id, quantity, price_cents).await;
        product.id
    }

    pub async fn stock(&self, product_id: i64, store_id: i64, quantity: i64, price_cents: i64) {
        self.state
            .db
            .inventory()
            .upsert(product_id, store_id, quantity, price_cents, Utc::now())
            .await
            .unwrap();
    }

    /// Every later work log insert aborts.
    pub async fn fail_work_log_writes(&self) {
        sqlx::query(
            "CREATE TRIGGER work_logs_down BEFORE INSERT ON work_logs
             BEGIN SELECT RAISE(ABORT, 'log unavailable'); END",
        )
        .execute(self.state.db.pool())
        .await
        .unwrap();
    }

    /// Overwrites one cell of the permission matrix.
    pub async fn set_grant(&self, role: Role, feature: Feature, grant: PermissionGrant) {
        self.state
            .db
            .permissions()
            .update(role, feature, &grant, Utc::now())
            .await
            .unwrap();
    }

    pub async fn quantity(&self, product_id: i64, store_id: i64) -> i64 {
        self.state
            .db
            .inventory()
            .quantity(product_id, store_id)
            .await
            .unwrap()
    }
}

/// A real account row (the hash is never checked) as an actor.
pub async fn account(db: &Database, username: &str, role: Role, store_id: Option<i64>) -> Actor {
    let user = db
        .users()
        .insert(username, "not-a-real-hash", role, store_id)
        .await
        .unwrap();
    Actor::from(&user)
}

pub fn product_input(sku: &str) -> ProductInput {
    ProductInput {
        sku: sku.to_string(),
        name: sku.to_string(),
        description: None,
        category_id: None,
        supplier_id: None,
    }
}

pub fn promotion_input(
    discount_type: DiscountType,
    discount_value: i64,
    start: &str,
    end: &str,
    store_id: Option<i64>,
    product_ids: Vec<i64>,
) -> PromotionInput {
    PromotionInput {
        name: format!("{:?} {}", discount_type, discount_value),
        description: None,
        discount_type,
        discount_value,
        start_date: date(start),
        end_date: date(end),
        store_id,
        product_ids,
    }
}

/// Inserts a promotion straight through the repository.
pub async fn promotion(db: &Database, created_by: i64, input: &PromotionInput) -> Promotion {
    let mut tx = db.begin().await.unwrap();
    let promotion = PromotionRepository::insert_in(&mut tx, input, created_by, Utc::now())
        .await
        .unwrap();
    PromotionRepository::replace_items_in(&mut tx, promotion.id, &input.product_ids)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    promotion
}
