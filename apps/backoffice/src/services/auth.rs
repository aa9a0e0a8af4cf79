//! Identity provider: login and token-to-actor resolution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::auth::verify_password;
use crate::error::{ServiceError, ServiceResult};
use crate::AppState;
use retail_core::{Actor, User};

/// What a successful login hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user: User,
}

pub struct AuthService {
    state: Arc<AppState>,
}

impl AuthService {
    pub fn new(state: Arc<AppState>) -> Self {
        AuthService { state }
    }

    /// Exchanges a username and password for an access token.
    ///
    /// An unknown username and a wrong password fail identically.
    pub async fn login(&self, username: &str, password: &str) -> ServiceResult<Session> {
        let credentials = self.state.db.users().find_credentials(username.trim()).await?;

        let credentials = match credentials {
            Some(c) if verify_password(password, &c.password_hash) => c,
            _ => {
                warn!(username = %username, "Login failed");
                return Err(ServiceError::Unauthenticated(
                    "Invalid username or password".to_string(),
                ));
            }
        };

        let user = credentials.user;
        let token = self.state.jwt.issue(&user)?;

        self.state
            .db
            .work_logs()
            .insert(
                user.id,
                user.store_id,
                "login",
                Some(&json!({ "username": user.username })),
                self.state.clock.now(),
            )
            .await?;

        info!(user_id = user.id, role = %user.role, "User logged in");

        Ok(Session {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.state.jwt.access_lifetime_secs(),
            user,
        })
    }

    /// Resolves an access token to the acting user.
    ///
    /// The account is re-read, so deleted accounts and changed roles take
    /// effect before the token expires.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<Actor> {
        let claims = self.state.jwt.validate(token)?;
        let user_id = claims.user_id()?;

        let user = self
            .state
            .db
            .users()
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthenticated("Account no longer exists".to_string()))?;

        Ok(Actor::from(&user))
    }
}
