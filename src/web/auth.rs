use axum::{
    Extension, Form,
    extract::{Query, Request, State},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::forms::{self, FieldErrors, LoginForm, RegisterForm};
use super::redirect::{found, login_with_next, safe_next};
use super::session::{self, FlashCategory};
use super::views::{self, PageContext};
use super::{AppState, WebError};
use crate::db::User;
use crate::domain::Role;
use crate::services::{AuthError, RoleError};

/// The logged-in account, placed in request extensions by [`require_login`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

impl NextQuery {
    /// Form action that carries `next` through a POST.
    fn login_action(&self) -> String {
        self.next.as_deref().map_or_else(
            || "/auth/login".to_string(),
            |next| format!("/auth/login?next={}", urlencoding::encode(next)),
        )
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Lets the request through only with a logged-in session; otherwise
/// redirects to the login page with `next` set to the requested path.
pub async fn require_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    if let Some(user) = session::current_user(&state, &session).await? {
        let user_id = user.id;
        request.extensions_mut().insert(CurrentUser(user));

        let mut response = next.run(request).await;
        response.extensions_mut().insert(user_id);
        return Ok(response);
    }

    session::flash(
        &session,
        FlashCategory::Info,
        "Please log in to access this page.",
    )
    .await?;

    let path = request
        .uri()
        .path_and_query()
        .map_or("/", axum::http::uri::PathAndQuery::as_str);
    Ok(found(&login_with_next(path)))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /auth/login
pub async fn login_form(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<NextQuery>,
) -> Result<Response, WebError> {
    if session::current_user(&state, &session).await?.is_some() {
        return Ok(found("/dashboard"));
    }

    render_login(&session, &LoginForm::default(), &FieldErrors::default(), &query).await
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    if session::current_user(&state, &session).await?.is_some() {
        return Ok(found("/dashboard"));
    }

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return render_login(&session, &form, &errors, &query).await,
    };

    let user = match state
        .auth_service
        .authenticate(&input.email, &input.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
            session::flash(
                &session,
                FlashCategory::Danger,
                "Login unsuccessful. Please check email and password",
            )
            .await?;
            return render_login(&session, &form, &FieldErrors::default(), &query).await;
        }
        Err(e) => return Err(e.into()),
    };

    let remember_for = input
        .remember
        .then(|| time::Duration::days(state.config.server.remember_me_days));
    session::log_in(&session, &user, remember_for).await?;

    metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
    tracing::info!(
        event = "login",
        user_id = %user.id,
        remember = input.remember,
        "User {} logged in",
        user.username
    );

    session::flash(&session, FlashCategory::Success, "Login successful!").await?;

    let target = match (query.next.as_deref(), safe_next(query.next.as_deref())) {
        (_, Some(next)) => next,
        (Some(rejected), None) => {
            tracing::warn!(next = rejected, "Ignoring off-site redirect target");
            "/dashboard"
        }
        (None, None) => "/dashboard",
    };

    let mut response = found(target);
    response.extensions_mut().insert(user.id);
    Ok(response)
}

/// GET /auth/register
pub async fn register_form(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response, WebError> {
    if session::current_user(&state, &session).await?.is_some() {
        return Ok(found("/dashboard"));
    }

    render_register(&session, &RegisterForm::default(), &FieldErrors::default()).await
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, WebError> {
    if session::current_user(&state, &session).await?.is_some() {
        return Ok(found("/dashboard"));
    }

    let registration = match form.validate() {
        Ok(registration) => registration,
        Err(errors) => return render_register(&session, &form, &errors).await,
    };

    match state.role_service.register(registration).await {
        Ok(user) if user.role == Role::Pending => {
            session::flash(
                &session,
                FlashCategory::Info,
                "An admin already exists. Your request for admin approval is pending.",
            )
            .await?;
            Ok(found("/admin_dashboard"))
        }
        Ok(_) => {
            session::flash(
                &session,
                FlashCategory::Success,
                "Your account has been created! You can now log in.",
            )
            .await?;
            Ok(found("/auth/login"))
        }
        Err(RoleError::EmailTaken) => {
            let mut errors = FieldErrors::default();
            errors.add("email", forms::EMAIL_TAKEN);
            render_register(&session, &form, &errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/logout
pub async fn logout(
    session: Session,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Response, WebError> {
    session::log_out(&session).await?;
    tracing::info!(event = "logout", user_id = %user.id, "User {} logged out", user.username);

    session::flash(&session, FlashCategory::Info, "You have been logged out.").await?;
    Ok(found("/"))
}

// ============================================================================
// Helpers
// ============================================================================

async fn render_login(
    session: &Session,
    form: &LoginForm,
    errors: &FieldErrors,
    query: &NextQuery,
) -> Result<Response, WebError> {
    let ctx = PageContext {
        user: None,
        flashes: session::take_flashes(session).await?,
    };
    Ok(Html(views::login_page(&ctx, form, errors, &query.login_action())).into_response())
}

async fn render_register(
    session: &Session,
    form: &RegisterForm,
    errors: &FieldErrors,
) -> Result<Response, WebError> {
    let ctx = PageContext {
        user: None,
        flashes: session::take_flashes(session).await?,
    };
    Ok(Html(views::register_page(&ctx, form, errors)).into_response())
}
