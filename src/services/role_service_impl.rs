//! `SeaORM` implementation of the `RoleService` trait.

use async_trait::async_trait;
use sea_orm::TransactionTrait;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::SecurityConfig;
use crate::db::repositories::user::{self as user_repo, hash_password_blocking};
use crate::db::{NewUser, Store, User};
use crate::domain::{Role, RoleAction, UserId};
use crate::services::role_service::{Registration, RoleError, RoleService};

pub struct SeaOrmRoleService {
    store: Store,
    security: SecurityConfig,
    /// Held across the admin check and the insert so two concurrent admin
    /// requests cannot both see "no admin yet".
    registration_lock: Mutex<()>,
}

impl SeaOrmRoleService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig) -> Self {
        Self {
            store,
            security,
            registration_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl RoleService for SeaOrmRoleService {
    async fn register(&self, registration: Registration) -> Result<User, RoleError> {
        let password_hash = hash_password_blocking(&registration.password, &self.security).await?;

        let _guard = self.registration_lock.lock().await;
        let txn = self.store.conn.begin().await?;

        if user_repo::email_exists(&txn, &registration.email).await? {
            return Err(RoleError::EmailTaken);
        }

        let admin_exists = user_repo::admin_exists(&txn).await?;
        let role = Role::on_registration(registration.requested_role, admin_exists)?;

        let user = user_repo::insert(
            &txn,
            NewUser {
                username: registration.username,
                email: registration.email,
                password_hash,
                role,
            },
        )
        .await?;

        txn.commit().await?;

        metrics::counter!("auth_registrations_total", "role" => role.as_str()).increment(1);
        info!(
            event = "user_registered",
            user_id = %user.id,
            requested_role = %registration.requested_role,
            role = %role,
            "Registered user {}",
            user.username
        );

        Ok(user)
    }

    async fn pending_users(&self) -> Result<Vec<User>, RoleError> {
        Ok(self.store.list_users_by_role(Role::Pending).await?)
    }

    async fn decide(
        &self,
        actor: &User,
        target: UserId,
        action: RoleAction,
    ) -> Result<User, RoleError> {
        if !actor.role.is_admin() {
            return Err(RoleError::PermissionDenied(action.verb()));
        }

        let user = self
            .store
            .get_user(target)
            .await?
            .ok_or(RoleError::NotFound(target))?;

        let Ok(next) = user.role.apply(action) else {
            return Err(RoleError::NotPending(Box::new(user)));
        };

        // Conditional on the role just read, so a concurrent decision on the
        // same user cannot be overwritten.
        let Some(updated) = self
            .store
            .transition_user_role(target, user.role, next)
            .await?
        else {
            return Err(match self.store.get_user(target).await? {
                Some(current) => RoleError::NotPending(Box::new(current)),
                None => RoleError::NotFound(target),
            });
        };

        metrics::counter!("role_transitions_total", "action" => action.verb()).increment(1);
        info!(
            event = "role_changed",
            actor_id = %actor.id,
            user_id = %updated.id,
            action = action.verb(),
            from = %user.role,
            to = %updated.role,
            "Role of {} changed",
            updated.username
        );

        Ok(updated)
    }
}
