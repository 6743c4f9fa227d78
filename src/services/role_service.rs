//! Domain service for registration and the admin-approval workflow.
//!
//! Registration picks the stored role from [`Role::on_registration`]; admins
//! then approve or reject `Pending` accounts through [`Role::apply`].

use thiserror::Error;

use crate::db::User;
use crate::domain::{Role, RoleAction, TransitionError, UserId};

#[derive(Debug, Error)]
pub enum RoleError {
    #[error("Only admins may {0} users")]
    PermissionDenied(&'static str),

    #[error("User {0} not found")]
    NotFound(UserId),

    /// The target exists but is not `Pending`.
    #[error("User {} is not awaiting admin approval", .0.username)]
    NotPending(Box<User>),

    #[error("Email already registered")]
    EmailTaken,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for RoleError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for RoleError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Validated registration input. `password` is still clear text here.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub requested_role: Role,
}

#[async_trait::async_trait]
pub trait RoleService: Send + Sync {
    /// Creates the account with the role the workflow assigns.
    ///
    /// # Errors
    ///
    /// Returns [`RoleError::EmailTaken`] if the email is already registered.
    async fn register(&self, registration: Registration) -> Result<User, RoleError>;

    /// Accounts waiting for an admin decision, oldest first.
    async fn pending_users(&self) -> Result<Vec<User>, RoleError>;

    /// Applies `action` to `target` on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// [`RoleError::PermissionDenied`] unless `actor` is an admin,
    /// [`RoleError::NotFound`] for an unknown id and [`RoleError::NotPending`]
    /// when the target is not waiting for approval. None of these change
    /// stored data.
    async fn decide(
        &self,
        actor: &User,
        target: UserId,
        action: RoleAction,
    ) -> Result<User, RoleError>;
}
