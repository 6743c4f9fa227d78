use axum::{
    Extension,
    extract::{Path, State},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::CurrentUser;
use super::redirect::found;
use super::session::{self, FlashCategory};
use super::views::{self, PageContext};
use super::{AppState, WebError};
use crate::db::User;
use crate::domain::{RoleAction, UserId};
use crate::services::RoleError;

/// GET /
pub async fn home(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, WebError> {
    if session::current_user(&state, &session).await?.is_some() {
        return Ok(found("/dashboard"));
    }

    let ctx = PageContext {
        user: None,
        flashes: session::take_flashes(&session).await?,
    };
    Ok(Html(views::home_page(&ctx)).into_response())
}

/// GET /dashboard
pub async fn dashboard(
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, WebError> {
    let ctx = PageContext {
        user: Some(&user),
        flashes: session::take_flashes(&session).await?,
    };
    Ok(Html(views::dashboard_page(&ctx, &user)).into_response())
}

/// GET /admin_dashboard
pub async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, WebError> {
    if !user.role.is_admin() {
        session::flash(
            &session,
            FlashCategory::Danger,
            "You do not have permission to access the Admin Dashboard.",
        )
        .await?;
        return Ok(found("/dashboard"));
    }

    let pending = state.role_service.pending_users().await?;

    let ctx = PageContext {
        user: Some(&user),
        flashes: session::take_flashes(&session).await?,
    };
    Ok(Html(views::admin_dashboard_page(&ctx, &pending)).into_response())
}

/// GET /approve_admin/{id}
pub async fn approve_admin(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    decide(&state, &session, &user, &id, RoleAction::Approve).await
}

/// GET /reject_admin/{id}
pub async fn reject_admin(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    decide(&state, &session, &user, &id, RoleAction::Reject).await
}

async fn decide(
    state: &AppState,
    session: &Session,
    actor: &User,
    raw_id: &str,
    action: RoleAction,
) -> Result<Response, WebError> {
    // Non-numeric ids never match a user, same as an unknown number.
    let target = raw_id
        .parse::<i32>()
        .map(UserId::new)
        .map_err(|_| WebError::user_not_found(raw_id))?;

    match state.role_service.decide(actor, target, action).await {
        Ok(updated) => {
            let (category, message) = match action {
                RoleAction::Approve => (
                    FlashCategory::Success,
                    format!("User {} has been approved as an Admin.", updated.username),
                ),
                RoleAction::Reject => (
                    FlashCategory::Danger,
                    format!("User {} has been rejected as an Admin.", updated.username),
                ),
            };
            session::flash(session, category, message).await?;
            Ok(found("/admin_dashboard"))
        }
        Err(RoleError::PermissionDenied(verb)) => {
            tracing::warn!(
                event = "permission_denied",
                actor_id = %actor.id,
                target_id = %target,
                action = verb,
                "Non-admin attempted a role change"
            );
            session::flash(
                session,
                FlashCategory::Danger,
                format!("You do not have permission to {verb} users."),
            )
            .await?;
            Ok(found("/dashboard"))
        }
        Err(RoleError::NotPending(user)) => {
            session::flash(
                session,
                FlashCategory::Warning,
                format!("User {} is not awaiting admin approval.", user.username),
            )
            .await?;
            Ok(found("/admin_dashboard"))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn not_found() -> WebError {
    WebError::NotFound("The requested page does not exist".to_string())
}
