use anyhow::Context;
use axum::{Router, middleware, routing::get};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions::{Expiry, SessionManagerLayer, cookie::SameSite};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::Store;
use crate::services::{AuthService, RoleService, SeaOrmAuthService, SeaOrmRoleService};

mod assets;
pub mod auth;
mod error;
pub mod forms;
mod observability;
mod pages;
pub mod redirect;
pub mod session;
pub mod views;

pub use error::WebError;

pub const SESSION_COOKIE: &str = "warden_session";

/// Everything a handler can reach. Built once in [`create_app_state`] and
/// shared through axum state.
pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub role_service: Arc<dyn RoleService>,

    pub prometheus_handle: Option<PrometheusHandle>,
}

pub async fn create_app_state(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let auth_service: Arc<dyn AuthService> =
        Arc::new(SeaOrmAuthService::new(store.clone(), &config.security)?);

    let role_service: Arc<dyn RoleService> = Arc::new(SeaOrmRoleService::new(
        store.clone(),
        config.security.clone(),
    ));

    Ok(Arc::new(AppState {
        config,
        store,
        auth_service,
        role_service,
        prometheus_handle,
    }))
}

pub async fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let session_store = SqliteStore::new(state.store.sqlite_pool());
    session_store
        .migrate()
        .await
        .context("Failed to create session table")?;
    if let Err(e) = session_store.delete_expired().await {
        warn!("Failed to purge expired sessions: {e}");
    }

    let server = &state.config.server;
    let session_layer = SessionManagerLayer::new(session_store)
        .with_name(SESSION_COOKIE)
        .with_secure(server.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_inactivity_minutes,
        )))
        .with_signed(session::signing_key(&state.config.security.secret_key)?);

    let protected_routes = create_protected_router(state.clone());

    let app = Router::new()
        .merge(protected_routes)
        .route("/", get(pages::home))
        .route("/auth/login", get(auth::login_form).post(auth::login))
        .route(
            "/auth/register",
            get(auth::register_form).post(auth::register),
        )
        .route("/static/{*path}", get(assets::serve_asset))
        .route("/healthz", get(observability::healthz))
        .route("/metrics", get(observability::get_metrics))
        .fallback(pages::not_found)
        .layer(session_layer)
        .with_state(state)
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware));

    info!("Router ready");
    Ok(app)
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout", get(auth::logout))
        .route("/dashboard", get(pages::dashboard))
        .route("/admin_dashboard", get(pages::admin_dashboard))
        .route("/approve_admin/{id}", get(pages::approve_admin))
        .route("/reject_admin/{id}", get(pages::reject_admin))
        .route_layer(middleware::from_fn_with_state(state, auth::require_login))
}
