//! # Promotion Repository
//!
//! Promotions and their product links.
//!
//! ## Tables
//! ```text
//! promotions ──< promotion_items >── products
//!   store_id NULL  = system-wide
//!   start..=end    = active window (activity is computed, never stored)
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use retail_core::{Promotion, PromotionInput};

const PROMOTION_COLUMNS: &str = "id, name, description, discount_type, discount_value, \
     start_date, end_date, store_id, created_by, created_at";

#[derive(sqlx::FromRow)]
struct LinkedPromotionRow {
    product_id: i64,
    #[sqlx(flatten)]
    promotion: Promotion,
}

#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, id: i64) -> DbResult<Option<Promotion>> {
        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(promotion)
    }

    pub async fn product_ids(&self, promotion_id: i64) -> DbResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT product_id FROM promotion_items WHERE promotion_id = ?1 ORDER BY product_id",
        )
        .bind(promotion_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Promotions visible from a store: system-wide ones plus that store's.
    /// `None` lists every promotion.
    pub async fn list_visible(&self, store_id: Option<i64>) -> DbResult<Vec<Promotion>> {
        let promotions = sqlx::query_as::<_, Promotion>(&format!(
            "SELECT {PROMOTION_COLUMNS} FROM promotions
             WHERE ?1 IS NULL OR store_id IS NULL OR store_id = ?1
             ORDER BY start_date DESC, id"
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(promotions)
    }

    /// `(promotion_id, product_id)` links of the promotions
    /// [`Self::list_visible`] returns for the same argument.
    pub async fn visible_links(&self, store_id: Option<i64>) -> DbResult<Vec<(i64, i64)>> {
        let links = sqlx::query_as::<_, (i64, i64)>(
            "SELECT pi.promotion_id, pi.product_id
             FROM promotion_items pi
             INNER JOIN promotions p ON p.id = pi.promotion_id
             WHERE ?1 IS NULL OR p.store_id IS NULL OR p.store_id = ?1
             ORDER BY pi.promotion_id, pi.product_id",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }

    /// Every promotion active on `date`, paired with each product it links.
    /// Store applicability is left to the pricing engine.
    pub async fn active_links(&self, date: NaiveDate) -> DbResult<Vec<(i64, Promotion)>> {
        let rows = sqlx::query_as::<_, LinkedPromotionRow>(&format!(
            "SELECT pi.product_id, {cols}
             FROM promotions p
             INNER JOIN promotion_items pi ON pi.promotion_id = p.id
             WHERE p.start_date <= ?1 AND p.end_date >= ?1
             ORDER BY p.id",
            cols = prefixed_columns("p")
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.product_id, r.promotion)).collect())
    }

    /// Promotions active on `date` that link `product_id`.
    pub async fn active_for_product(
        &self,
        product_id: i64,
        date: NaiveDate,
    ) -> DbResult<Vec<Promotion>> {
        let promotions = sqlx::query_as::<_, Promotion>(&format!(
            "SELECT {cols}
             FROM promotions p
             INNER JOIN promotion_items pi ON pi.promotion_id = p.id
             WHERE pi.product_id = ?1 AND p.start_date <= ?2 AND p.end_date >= ?2
             ORDER BY p.id",
            cols = prefixed_columns("p")
        ))
        .bind(product_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(promotions)
    }

    // =========================================================================
    // Transactional Writes
    // =========================================================================

    pub async fn insert_in(
        conn: &mut SqliteConnection,
        input: &PromotionInput,
        created_by: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Promotion> {
        debug!(name = %input.name, store_id = ?input.store_id, "Inserting promotion");

        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            "INSERT INTO promotions
                (name, description, discount_type, discount_value, start_date, end_date,
                 store_id, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING {PROMOTION_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.discount_type)
        .bind(input.discount_value)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.store_id)
        .bind(created_by)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok(promotion)
    }

    /// Takes the write lock on a promotion and returns it.
    ///
    /// Issued first in update/delete transactions so the read that feeds
    /// authorization happens under the lock.
    pub async fn lock_in(conn: &mut SqliteConnection, id: i64) -> DbResult<Promotion> {
        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            "UPDATE promotions SET id = id WHERE id = ?1 RETURNING {PROMOTION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        promotion.ok_or_else(|| DbError::not_found("Promotion", id))
    }

    pub async fn update_in(
        conn: &mut SqliteConnection,
        id: i64,
        input: &PromotionInput,
    ) -> DbResult<Promotion> {
        let promotion = sqlx::query_as::<_, Promotion>(&format!(
            "UPDATE promotions
             SET name = ?1, description = ?2, discount_type = ?3, discount_value = ?4,
                 start_date = ?5, end_date = ?6, store_id = ?7
             WHERE id = ?8
             RETURNING {PROMOTION_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.discount_type)
        .bind(input.discount_value)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.store_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        promotion.ok_or_else(|| DbError::not_found("Promotion", id))
    }

    /// Replaces the linked product set. Unknown products fail with a
    /// foreign key violation.
    pub async fn replace_items_in(
        conn: &mut SqliteConnection,
        promotion_id: i64,
        product_ids: &[i64],
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM promotion_items WHERE promotion_id = ?1")
            .bind(promotion_id)
            .execute(&mut *conn)
            .await?;

        let mut ids = product_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        for product_id in ids {
            sqlx::query("INSERT INTO promotion_items (promotion_id, product_id) VALUES (?1, ?2)")
                .bind(promotion_id)
                .bind(product_id)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    /// Removes the links, then the promotion.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM promotion_items WHERE promotion_id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM promotions WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", id));
        }

        Ok(())
    }
}

fn prefixed_columns(alias: &str) -> String {
    PROMOTION_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fresh_db, stocked_product, store, user};
    use crate::Database;
    use retail_core::{DiscountType, Role};

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn input(store_id: Option<i64>, product_ids: Vec<i64>) -> PromotionInput {
        PromotionInput {
            name: "June deals".to_string(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 2000,
            start_date: day("2024-06-01"),
            end_date: day("2024-06-30"),
            store_id,
            product_ids,
        }
    }

    async fn create(db: &Database, input: &PromotionInput, created_by: i64) -> Promotion {
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

    #[tokio::test]
    async fn test_create_with_items() {
        let db = fresh_db().await;
        let shop = store(&db, "Main").await;
        let admin = user(&db, "admin", Role::SystemAdmin, Some(shop.id)).await;
        let a = stocked_product(&db, "A", shop.id, 1, 100).await;
        let b = stocked_product(&db, "B", shop.id, 1, 100).await;

        let promotion = create(&db, &input(None, vec![b, a, b]), admin.id).await;

        assert_eq!(promotion.start_date, day("2024-06-01"));
        assert_eq!(db.promotions().product_ids(promotion.id).await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back_promotion() {
        let db = fresh_db().await;
        let shop = store(&db, "Main").await;
        let admin = user(&db, "admin", Role::SystemAdmin, Some(shop.id)).await;

        {
            let mut tx = db.begin().await.unwrap();
            let promotion =
                PromotionRepository::insert_in(&mut tx, &input(None, vec![999]), admin.id, Utc::now())
                    .await
                    .unwrap();
            let err = PromotionRepository::replace_items_in(&mut tx, promotion.id, &[999])
                .await
                .unwrap_err();
            assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        }

        assert!(db.promotions().list_visible(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_active_queries_respect_dates() {
        let db = fresh_db().await;
        let shop = store(&db, "Main").await;
        let admin = user(&db, "admin", Role::SystemAdmin, Some(shop.id)).await;
        let a = stocked_product(&db, "A", shop.id, 1, 100).await;
        create(&db, &input(None, vec![a]), admin.id).await;

        assert_eq!(db.promotions().active_for_product(a, day("2024-06-30")).await.unwrap().len(), 1);
        assert!(db.promotions().active_for_product(a, day("2024-07-01")).await.unwrap().is_empty());

        let links = db.promotions().active_links(day("2024-06-15")).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].0, a);
    }

    #[tokio::test]
    async fn test_visibility_by_store() {
        let db = fresh_db().await;
        let one = store(&db, "One").await;
        let two = store(&db, "Two").await;
        let admin = user(&db, "admin", Role::SystemAdmin, Some(one.id)).await;
        let a = stocked_product(&db, "A", one.id, 1, 100).await;

        create(&db, &input(None, vec![a]), admin.id).await;
        create(&db, &input(Some(one.id), vec![a]), admin.id).await;
        create(&db, &input(Some(two.id), vec![a]), admin.id).await;

        assert_eq!(db.promotions().list_visible(None).await.unwrap().len(), 3);
        assert_eq!(db.promotions().list_visible(Some(two.id)).await.unwrap().len(), 2);
        assert_eq!(db.promotions().visible_links(Some(two.id)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_lock_update_delete() {
        let db = fresh_db().await;
        let shop = store(&db, "Main").await;
        let admin = user(&db, "admin", Role::SystemAdmin, Some(shop.id)).await;
        let a = stocked_product(&db, "A", shop.id, 1, 100).await;
        let promotion = create(&db, &input(None, vec![a]), admin.id).await;

        let mut tx = db.begin().await.unwrap();
        let locked = PromotionRepository::lock_in(&mut tx, promotion.id).await.unwrap();
        assert_eq!(locked.id, promotion.id);

        let mut changed = input(Some(shop.id), vec![]);
        changed.discount_type = DiscountType::Fixed;
        changed.discount_value = 150;
        let updated = PromotionRepository::update_in(&mut tx, promotion.id, &changed).await.unwrap();
        assert_eq!(updated.store_id, Some(shop.id));
        PromotionRepository::delete_in(&mut tx, promotion.id).await.unwrap();
        tx.commit().await.unwrap();

        assert!(db.promotions().get(promotion.id).await.unwrap().is_none());

        let mut tx = db.begin().await.unwrap();
        let err = PromotionRepository::lock_in(&mut tx, promotion.id).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
