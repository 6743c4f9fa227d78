//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tracing::warn;

use crate::config::SecurityConfig;
use crate::db::repositories::user::{hash_password, verify_password_blocking};
use crate::db::{Store, User};
use crate::domain::UserId;
use crate::services::auth_service::{AuthError, AuthService};

pub struct SeaOrmAuthService {
    store: Store,
    /// Verified against when the email is unknown so both failure paths cost
    /// one Argon2 run.
    dummy_hash: String,
}

impl SeaOrmAuthService {
    pub fn new(store: Store, security: &SecurityConfig) -> anyhow::Result<Self> {
        let dummy_hash = hash_password("warden-dummy-password", security)?;
        Ok(Self { store, dummy_hash })
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let found = self.store.get_user_by_email_with_password(email).await?;

        let Some((user, password_hash)) = found else {
            verify_password_blocking(password, &self.dummy_hash).await?;
            warn!(event = "login_failed", reason = "unknown_email", "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password, &password_hash).await? {
            warn!(
                event = "login_failed",
                reason = "bad_password",
                user_id = %user.id,
                "Login failed"
            );
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    async fn current_user(&self, id: UserId) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user(id).await?)
    }
}
