//! Account management.
//!
//! Managers look after the cashiers of their own store and their own
//! account; cashiers only ever see and edit themselves. Role and store
//! changes are checked a second time as [`Action::AssignRole`] against the
//! account's new placement.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::authorize;
use crate::auth::hash_password;
use crate::error::{ServiceError, ServiceResult};
use crate::AppState;
use retail_core::validation::{validate_password, validate_username};
use retail_core::{
    Action, Actor, ResourceScope, Role, User, UserUpdate, HEAD_OFFICE_STORE_ID,
};
use retail_db::{UserChanges, UserRepository, WorkLogRepository};
use sqlx::SqliteConnection;

/// A new account request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    /// Managers may omit this; the account lands in their store.
    pub store_id: Option<i64>,
}

pub struct UserService {
    state: Arc<AppState>,
}

impl UserService {
    pub fn new(state: Arc<AppState>) -> Self {
        UserService { state }
    }

    pub async fn create_user(&self, actor: &Actor, new_user: &NewUser) -> ServiceResult<User> {
        let store_id = match (new_user.role, actor.role) {
            (Role::SystemAdmin, _) => Some(HEAD_OFFICE_STORE_ID),
            (_, Role::StoreManager) => new_user.store_id.or(actor.home_store_id),
            _ => new_user.store_id,
        };

        authorize(
            actor,
            Action::CreateUser,
            &ResourceScope::optional_store(store_id).targeting(new_user.role),
        )?;
        validate_username(&new_user.username)?;
        validate_password(&new_user.password)?;
        self.ensure_store(store_id).await?;

        let password_hash = hash_password(&new_user.password)?;
        let mut tx = self.state.db.begin().await?;
        let user = UserRepository::insert_in(
            &mut tx,
            &new_user.username,
            &password_hash,
            new_user.role,
            store_id,
        )
        .await?;

        self.log_in(
            &mut tx,
            actor,
            "create_user",
            json!({ "user_id": user.id, "role": user.role, "store_id": user.store_id }),
        )
        .await?;
        tx.commit().await?;

        info!(user_id = user.id, username = %user.username, role = %user.role, "User created");
        Ok(user)
    }

    /// Applies a partial update. Fields left `None` keep their value.
    pub async fn update_user(
        &self,
        actor: &Actor,
        id: i64,
        update: &UserUpdate,
    ) -> ServiceResult<User> {
        let target = self
            .state
            .db
            .users()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;

        authorize(
            actor,
            Action::UpdateUser,
            &ResourceScope::optional_store(target.store_id)
                .owned_by(target.id)
                .targeting(target.role),
        )?;

        let mut store_id = update.store_id;
        if update.reassigns() {
            let role = update.role.unwrap_or(target.role);
            if role == Role::SystemAdmin {
                store_id = Some(HEAD_OFFICE_STORE_ID);
            }
            authorize(
                actor,
                Action::AssignRole,
                &ResourceScope::optional_store(store_id.or(target.store_id)).targeting(role),
            )?;
        }

        if let Some(username) = &update.username {
            validate_username(username)?;
        }
        let password_hash = match &update.password {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };
        if update.store_id.is_some() {
            self.ensure_store(store_id).await?;
        }

        let changes = UserChanges {
            username: update.username.as_deref(),
            password_hash: password_hash.as_deref(),
            role: update.role,
            store_id,
        };
        let mut tx = self.state.db.begin().await?;
        let user = UserRepository::update_in(&mut tx, id, &changes).await?;

        self.log_in(
            &mut tx,
            actor,
            "update_user",
            json!({
                "user_id": id,
                "username_changed": update.username.is_some(),
                "password_changed": update.password.is_some(),
                "role": update.role,
                "store_id": store_id,
            }),
        )
        .await?;
        tx.commit().await?;

        info!(user_id = id, updated_by = actor.user_id, "User updated");
        Ok(user)
    }

    /// Admins see every account (narrowed by `store_id` when given),
    /// managers their store's, cashiers only themselves.
    pub async fn list_users(&self, actor: &Actor, store_id: Option<i64>) -> ServiceResult<Vec<User>> {
        let filter = authorize(actor, Action::ViewUsers, &ResourceScope::optional_store(store_id))?
            .with_requested_store(store_id);

        Ok(self.state.db.users().list(filter).await?)
    }

    pub async fn get_user(&self, actor: &Actor, id: i64) -> ServiceResult<User> {
        let user = self
            .state
            .db
            .users()
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;

        authorize(
            actor,
            Action::ViewUsers,
            &ResourceScope::optional_store(user.store_id).owned_by(user.id),
        )?;
        Ok(user)
    }

    async fn ensure_store(&self, store_id: Option<i64>) -> ServiceResult<()> {
        if let Some(store_id) = store_id {
            if self.state.db.stores().get(store_id).await?.is_none() {
                return Err(ServiceError::not_found("Store", store_id));
            }
        }
        Ok(())
    }

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
    use crate::auth::verify_password;
    use crate::test_support::World;

    fn new_user(username: &str, role: Role, store_id: Option<i64>) -> NewUser {
        NewUser {
            username: username.to_string(),
            password: "correct-horse".to_string(),
            role,
            store_id,
        }
    }

    #[tokio::test]
    async fn test_create_user_scoping() {
        let w = World::new().await;
        let service = UserService::new(w.state.clone());

        // Manager without a store: lands in theirs
        let cashier = service
            .create_user(&w.manager, &new_user("cashier.two", Role::Cashier, None))
            .await
            .unwrap();
        assert_eq!(cashier.store_id, Some(w.branch));
        let credentials = w
            .state
            .db
            .users()
            .find_credentials("cashier.two")
            .await
            .unwrap()
            .unwrap();
        assert!(verify_password("correct-horse", &credentials.password_hash));

        let err = service
            .create_user(&w.manager, &new_user("cashier.x", Role::Cashier, Some(w.other_branch)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { rule: "store-cashiers", .. }));

        let err = service
            .create_user(&w.manager, &new_user("manager.x", Role::StoreManager, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let err = service
            .create_user(&w.cashier, &new_user("cashier.y", Role::Cashier, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        // Admin accounts always belong to the head office
        let admin = service
            .create_user(&w.admin, &new_user("admin.two", Role::SystemAdmin, Some(w.branch)))
            .await
            .unwrap();
        assert_eq!(admin.store_id, Some(HEAD_OFFICE_STORE_ID));
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let w = World::new().await;
        let service = UserService::new(w.state.clone());

        let err = service
            .create_user(&w.admin, &new_user("cashier.north", Role::Cashier, Some(w.branch)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let mut short = new_user("cashier.z", Role::Cashier, Some(w.branch));
        short.password = "abc".to_string();
        let err = service.create_user(&w.admin, &short).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = service
            .create_user(&w.admin, &new_user("cashier.z", Role::Cashier, Some(4242)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_user_rules() {
        let w = World::new().await;
        let service = UserService::new(w.state.clone());

        let renamed = service
            .update_user(
                &w.cashier,
                w.cashier.user_id,
                &UserUpdate {
                    username: Some("cashier.north.2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.username, "cashier.north.2");

        // Cashiers cannot move themselves
        let err = service
            .update_user(
                &w.cashier,
                w.cashier.user_id,
                &UserUpdate {
                    store_id: Some(w.other_branch),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let err = service
            .update_user(&w.cashier, w.other_cashier.user_id, &UserUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { rule: "own-records", .. }));

        // Managers may not promote or transfer
        let err = service
            .update_user(
                &w.manager,
                w.cashier.user_id,
                &UserUpdate {
                    role: Some(Role::StoreManager),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let err = service
            .update_user(
                &w.manager,
                w.cashier.user_id,
                &UserUpdate {
                    store_id: Some(w.other_branch),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let err = service
            .update_user(&w.manager, w.other_cashier.user_id, &UserUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));

        let moved = service
            .update_user(
                &w.admin,
                w.cashier.user_id,
                &UserUpdate {
                    role: Some(Role::StoreManager),
                    store_id: Some(w.other_branch),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.role, Role::StoreManager);
        assert_eq!(moved.store_id, Some(w.other_branch));

        let promoted = service
            .update_user(
                &w.admin,
                w.other_cashier.user_id,
                &UserUpdate {
                    role: Some(Role::SystemAdmin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.store_id, Some(HEAD_OFFICE_STORE_ID));
    }

    #[tokio::test]
    async fn test_list_users_scoping() {
        let w = World::new().await;
        let service = UserService::new(w.state.clone());

        assert_eq!(service.list_users(&w.admin, None).await.unwrap().len(), 5);
        assert_eq!(service.list_users(&w.admin, Some(w.branch)).await.unwrap().len(), 2);

        let staff = service.list_users(&w.manager, None).await.unwrap();
        assert!(staff.iter().all(|u| u.store_id == Some(w.branch)));
        assert_eq!(staff.len(), 2);

        let own = service.list_users(&w.cashier, None).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, w.cashier.user_id);

        let err = service.get_user(&w.cashier, w.manager.user_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden { .. }));
        assert_eq!(
            service.get_user(&w.manager, w.cashier.user_id).await.unwrap().id,
            w.cashier.user_id
        );
    }

    #[tokio::test]
    async fn test_failed_log_rolls_back_account_change() {
        let w = World::new().await;
        w.fail_work_log_writes().await;
        let service = UserService::new(w.state.clone());

        let err = service
            .create_user(&w.admin, &new_user("cashier.late", Role::Cashier, Some(w.branch)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StorageFailure(_)));
        assert!(w.state.db.users().find_by_username("cashier.late").await.unwrap().is_none());

        service
            .update_user(
                &w.admin,
                w.cashier.user_id,
                &UserUpdate {
                    role: Some(Role::StoreManager),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        let cashier = w.state.db.users().get(w.cashier.user_id).await.unwrap().unwrap();
        assert_eq!(cashier.role, Role::Cashier);
    }
}
