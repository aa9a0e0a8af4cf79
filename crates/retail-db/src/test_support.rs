//! Fixtures shared by the repository tests.

use chrono::Utc;

use crate::{Database, DbConfig};
use retail_core::{ProductInput, Role, Store, User};

pub async fn fresh_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

pub fn product_input(sku: &str, name: &str) -> ProductInput {
    ProductInput {
        sku: sku.to_string(),
        name: name.to_string(),
        description: None,
        category_id: None,
        supplier_id: None,
    }
}

pub async fn store(db: &Database, name: &str) -> Store {
    db.stores().insert(name, None).await.unwrap()
}

pub async fn user(db: &Database, username: &str, role: Role, store_id: Option<i64>) -> User {
    db.users()
        .insert(username, "not-a-real-hash", role, store_id)
        .await
        .unwrap()
}

/// A product stocked in `store_id` with `quantity` units at `price_cents`.
pub async fn stocked_product(
    db: &Database,
    sku: &str,
    store_id: i64,
    quantity: i64,
    price_cents: i64,
) -> i64 {
    let product = db.products().insert(&product_input(sku, sku)).await.unwrap();
    db.inventory()
        .upsert(product.id, store_id, quantity, price_cents, Utc::now())
        .await
        .unwrap();
    product.id
}
