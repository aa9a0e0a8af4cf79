//! # Deletion Guard
//!
//! Deletes stores, suppliers, categories, products and users only when
//! nothing references them.
//!
//! ```text
//! BEGIN
//!   lock row (no-op write) ─── missing ──► NotFound
//!   authorize ─────────────── denied ───► Forbidden
//!   count dependents ──────── any > 0 ──► Conflict { counts }, ROLLBACK
//!   DELETE row
//!   work log
//! COMMIT
//! ```
//!
//! The lock is the transaction's first statement and takes the SQLite write
//! lock, so no dependent row can be inserted between the count and the
//! delete.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::authorize;
use crate::error::{ServiceError, ServiceResult};
use crate::AppState;
use retail_core::{Action, Actor, EntityKind, ResourceScope, HEAD_OFFICE_STORE_ID};
use retail_db::{DependentsRepository, UserRepository, WorkLogRepository};

pub struct DeletionGuard {
    state: Arc<AppState>,
}

impl DeletionGuard {
    pub fn new(state: Arc<AppState>) -> Self {
        DeletionGuard { state }
    }

    pub async fn guarded_delete(
        &self,
        actor: &Actor,
        entity: EntityKind,
        id: i64,
    ) -> ServiceResult<()> {
        if entity == EntityKind::Store && id == HEAD_OFFICE_STORE_ID {
            return Err(ServiceError::bad_request("The head office store cannot be deleted"));
        }
        if entity == EntityKind::User && id == actor.user_id {
            return Err(ServiceError::bad_request("You cannot delete your own account"));
        }

        let mut tx = self.state.db.begin().await?;

        DependentsRepository::lock_in(&mut tx, entity, id).await?;

        let scope = match entity {
            EntityKind::User => {
                let target = UserRepository::get_in(&mut tx, id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("User", id))?;
                ResourceScope::optional_store(target.store_id).targeting(target.role)
            }
            _ => ResourceScope::any(),
        };
        authorize(actor, delete_action(entity), &scope)?;

        let counts = DependentsRepository::count_in(&mut tx, entity, id).await?;
        if counts.blocks_deletion() {
            warn!(entity = %entity, id, counts = %counts, "Delete blocked by dependents");
            return Err(ServiceError::Conflict { entity, id, counts });
        }

        DependentsRepository::delete_in(&mut tx, entity, id).await?;

        WorkLogRepository::insert_in(
            &mut tx,
            actor.user_id,
            actor.home_store_id,
            &format!("delete_{}", entity.as_str().to_lowercase()),
            Some(&json!({ "id": id })),
            self.state.clock.now(),
        )
        .await?;

        tx.commit().await?;

        info!(entity = %entity, id, deleted_by = actor.user_id, "Entity deleted");
        Ok(())
    }
}

fn delete_action(entity: EntityKind) -> Action {
    match entity {
        EntityKind::Store => Action::ManageStore,
        EntityKind::Supplier => Action::ManageSupplier,
        EntityKind::Category => Action::ManageCategory,
        EntityKind::Product => Action::DeleteProduct,
        EntityKind::User => Action::DeleteUser,
    }
}
