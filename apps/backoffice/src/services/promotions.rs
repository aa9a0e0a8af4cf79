//! Promotion management.
//!
//! A store manager's promotions always belong to their store. The only
//! system-wide promotions a manager can touch are ones they created.
//! Writes also need the matching promotion grant in the permission matrix.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use super::{authorize, require_feature, FeatureGrant};
use crate::error::{ServiceError, ServiceResult};
use crate::AppState;
use retail_core::validation::{validate_date_range, validate_discount, validate_name};
use retail_core::{
    Action, Actor, Feature, PermissionOp, Promotion, PromotionDetail, PromotionInput,
    ResourceScope, ScopeFilter,
};
use retail_db::{PromotionRepository, WorkLogRepository};

const MAX_PROMOTION_NAME: usize = 100;

pub struct PromotionService {
    state: Arc<AppState>,
}

impl PromotionService {
    pub fn new(state: Arc<AppState>) -> Self {
        PromotionService { state }
    }

    pub async fn create_promotion(
        &self,
        actor: &Actor,
        input: &PromotionInput,
    ) -> ServiceResult<PromotionDetail> {
        validate_promotion(input)?;

        let store_id = if actor.is_admin() {
            input.store_id
        } else {
            input.store_id.or(actor.home_store_id)
        };
        authorize(
            actor,
            Action::ManagePromotion,
            &ResourceScope::optional_store(store_id).owned_by(actor.user_id),
        )?;
        require_feature(&self.state.db, actor, Feature::PromotionManagement, PermissionOp::Create)
            .await?;
        self.ensure_store(store_id).await?;

        let input = PromotionInput {
            store_id,
            ..input.clone()
        };
        let now = self.state.clock.now();
        let mut tx = self.state.db.begin().await?;

        let promotion = PromotionRepository::insert_in(&mut tx, &input, actor.user_id, now).await?;
        PromotionRepository::replace_items_in(&mut tx, promotion.id, &input.product_ids).await?;

        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            actor.home_store_id,
            "create_promotion",
            Some(&json!({ "promotion_id": promotion.id, "store_id": promotion.store_id })),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(promotion_id = promotion.id, store_id = ?promotion.store_id, "Promotion created");
        Ok(self.detail(promotion, &input.product_ids))
    }

    /// Rewrites the promotion and replaces its product set.
    pub async fn update_promotion(
        &self,
        actor: &Actor,
        id: i64,
        input: &PromotionInput,
    ) -> ServiceResult<PromotionDetail> {
        validate_promotion(input)?;
        if actor.is_admin() {
            self.ensure_store(input.store_id).await?;
        }
        let grant = FeatureGrant::load(&self.state.db, actor, Feature::PromotionManagement).await?;

        let now = self.state.clock.now();
        let mut tx = self.state.db.begin().await?;

        let existing = PromotionRepository::lock_in(&mut tx, id).await?;
        authorize(actor, Action::ManagePromotion, &promotion_scope(&existing))?;
        grant.require(actor, PermissionOp::Edit)?;

        let store_id = if actor.is_admin() {
            input.store_id
        } else {
            input.store_id.or(existing.store_id)
        };
        authorize(
            actor,
            Action::ManagePromotion,
            &ResourceScope::optional_store(store_id).owned_by(existing.created_by),
        )?;

        let input = PromotionInput {
            store_id,
            ..input.clone()
        };
        let promotion = PromotionRepository::update_in(&mut tx, id, &input).await?;
        PromotionRepository::replace_items_in(&mut tx, id, &input.product_ids).await?;

        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            actor.home_store_id,
            "update_promotion",
            Some(&json!({ "promotion_id": id, "store_id": store_id })),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(promotion_id = id, "Promotion updated");
        Ok(self.detail(promotion, &input.product_ids))
    }

    pub async fn delete_promotion(&self, actor: &Actor, id: i64) -> ServiceResult<()> {
        let grant = FeatureGrant::load(&self.state.db, actor, Feature::PromotionManagement).await?;

        let now = self.state.clock.now();
        let mut tx = self.state.db.begin().await?;

        let existing = PromotionRepository::lock_in(&mut tx, id).await?;
        authorize(actor, Action::ManagePromotion, &promotion_scope(&existing))?;
        grant.require(actor, PermissionOp::Delete)?;

        PromotionRepository::delete_in(&mut tx, id).await?;

        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            actor.home_store_id,
            "delete_promotion",
            Some(&json!({ "promotion_id": id, "name": existing.name })),
            now,
        )
        .await?;

        tx.commit().await?;

        info!(promotion_id = id, "Promotion deleted");
        Ok(())
    }

    /// Promotions visible to `actor` with today's status. Admins may narrow
    /// to what one store sees.
    pub async fn list_promotions(
        &self,
        actor: &Actor,
        store_id: Option<i64>,
    ) -> ServiceResult<Vec<PromotionDetail>> {
        let filter = authorize(actor, Action::ViewPromotions, &ResourceScope::optional_store(store_id))?
            .with_requested_store(store_id);

        let visible_from = match filter {
            ScopeFilter::Unrestricted => None,
            ScopeFilter::Store(store_id) => Some(store_id),
            ScopeFilter::OwnRecords(_) => return Ok(Vec::new()),
        };

        let promotions = self.state.db.promotions().list_visible(visible_from).await?;

        let mut links: HashMap<i64, Vec<i64>> = HashMap::new();
        for (promotion_id, product_id) in self.state.db.promotions().visible_links(visible_from).await? {
            links.entry(promotion_id).or_default().push(product_id);
        }

        let today = self.state.clock.today();
        Ok(promotions
            .into_iter()
            .map(|promotion| PromotionDetail {
                status: promotion.status_on(today),
                product_ids: links.remove(&promotion.id).unwrap_or_default(),
                promotion,
            })
            .collect())
    }

    async fn ensure_store(&self, store_id: Option<i64>) -> ServiceResult<()> {
        if let Some(store_id) = store_id {
            if self.state.db.stores().get(store_id).await?.is_none() {
                return Err(ServiceError::not_found("Store", store_id));
            }
        }
        Ok(())
    }

    fn detail(&self, promotion: Promotion, product_ids: &[i64]) -> PromotionDetail {
        let mut product_ids = product_ids.to_vec();
        product_ids.sort_unstable();
        product_ids.dedup();

        PromotionDetail {
            status: promotion.status_on(self.state.clock.today()),
            promotion,
            product_ids,
        }
    }
}

fn promotion_scope(promotion: &Promotion) -> ResourceScope {
    ResourceScope::optional_store(promotion.store_id).owned_by(promotion.created_by)
}

fn validate_promotion(input: &PromotionInput) -> ServiceResult<()> {
    validate_name("name", &input.name, MAX_PROMOTION_NAME)?;
    validate_discount(input.discount_type, input.discount_value)?;
    validate_date_range(input.start_date, input.end_date)?;

    if input.product_ids.is_empty() {
        return Err(ServiceError::bad_request(
            "A promotion must include at least one product",
        ));
    }

    Ok(())
}
