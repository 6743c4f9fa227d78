//! Domain service for authentication.
//!
//! Verifies email/password pairs and resolves session identities back to
//! accounts. Session storage itself belongs to the web layer.

use thiserror::Error;

use crate::db::User;
use crate::domain::UserId;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password are deliberately the same case.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and returns the matching account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the email is unknown or
    /// the password does not match.
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AuthError>;

    /// Loads the account a session points at. `None` once the row is gone.
    async fn current_user(&self, id: UserId) -> Result<Option<User>, AuthError>;
}
