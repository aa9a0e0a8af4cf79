//! First-run setup: the head office store and an initial administrator.

use tracing::{info, warn};

use crate::auth::hash_password;
use crate::config::BootstrapSettings;
use crate::error::{ServiceError, ServiceResult};
use retail_core::validation::{validate_password, validate_username};
use retail_core::{Role, User, HEAD_OFFICE_STORE_ID};
use retail_db::Database;

pub const HEAD_OFFICE_NAME: &str = "Head Office";

/// Makes sure store 1 exists and at least one system admin can sign in.
///
/// Returns the admin created by this run, or `None` when one already
/// existed. Safe to run on every start.
pub async fn ensure_initial_state(
    db: &Database,
    settings: &BootstrapSettings,
) -> ServiceResult<Option<User>> {
    let head_office = db.stores().ensure_head_office(HEAD_OFFICE_NAME).await?;
    info!(store_id = head_office.id, name = %head_office.name, "Head office ready");

    let admins = db.users().count_by_role(Role::SystemAdmin).await?;
    if admins > 0 {
        info!(admins, "System admin already present");
        return Ok(None);
    }

    let Some(password) = settings.admin_password.as_deref() else {
        warn!("No system admin exists and no bootstrap password is configured");
        return Err(ServiceError::bad_request(
            "bootstrap.admin_password is required to create the first admin \
             (set RETAIL_BOOTSTRAP__ADMIN_PASSWORD)",
        ));
    };

    validate_username(&settings.admin_username)?;
    validate_password(password)?;

    let hash = hash_password(password)?;
    let admin = db
        .users()
        .insert(
            &settings.admin_username,
            &hash,
            Role::SystemAdmin,
            Some(HEAD_OFFICE_STORE_ID),
        )
        .await?;

    info!(user_id = admin.id, username = %admin.username, "Initial system admin created");
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use retail_db::DbConfig;

    fn settings(password: Option<&str>) -> BootstrapSettings {
        BootstrapSettings {
            admin_username: "admin".to_string(),
            admin_password: password.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_creates_admin_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let admin = ensure_initial_state(&db, &settings(Some("change-me-now")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::SystemAdmin);
        assert_eq!(admin.store_id, Some(HEAD_OFFICE_STORE_ID));

        let again = ensure_initial_state(&db, &settings(Some("change-me-now"))).await.unwrap();
        assert!(again.is_none());
        assert_eq!(db.stores().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_password_is_an_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = ensure_initial_state(&db, &settings(None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        // The head office is still created
        assert!(db.stores().get(HEAD_OFFICE_STORE_ID).await.unwrap().is_some());
    }
}
