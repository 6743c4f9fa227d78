//! Session-backed identity and flash messages.

use anyhow::Context;
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tower_sessions::cookie::Key;
use tower_sessions::{Expiry, Session};

use super::{AppState, WebError};
use crate::db::User;
use crate::domain::UserId;

const USER_KEY: &str = "user_id";
const FLASH_KEY: &str = "_flashes";
const KEY_SALT: &[u8] = b"warden.session-cookie";

/// 64-byte cookie signing key stretched from the configured secret.
pub fn signing_key(secret: &str) -> anyhow::Result<Key> {
    let mut bytes = [0u8; 64];
    Argon2::default()
        .hash_password_into(secret.as_bytes(), KEY_SALT, &mut bytes)
        .map_err(|e| anyhow::anyhow!("Failed to derive session key: {e}"))?;

    Key::try_from(&bytes[..]).context("Derived session key rejected")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Info,
    Warning,
    Danger,
}

impl FlashCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

/// Queue a notice for the next rendered page.
pub async fn flash(
    session: &Session,
    category: FlashCategory,
    message: impl Into<String>,
) -> Result<(), WebError> {
    let mut flashes: Vec<Flash> = session.get(FLASH_KEY).await?.unwrap_or_default();
    flashes.push(Flash {
        category,
        message: message.into(),
    });
    session.insert(FLASH_KEY, flashes).await?;
    Ok(())
}

/// Drain queued notices; each one is shown exactly once.
pub async fn take_flashes(session: &Session) -> Result<Vec<Flash>, WebError> {
    Ok(session
        .remove::<Vec<Flash>>(FLASH_KEY)
        .await?
        .unwrap_or_default())
}

/// Bind the session to `user`. A fresh id is issued so a pre-login session id
/// cannot be reused.
pub async fn log_in(
    session: &Session,
    user: &User,
    remember_for: Option<Duration>,
) -> Result<(), WebError> {
    session.cycle_id().await?;
    session.insert(USER_KEY, user.id).await?;

    if let Some(lifetime) = remember_for {
        session.set_expiry(Some(Expiry::AtDateTime(
            OffsetDateTime::now_utc() + lifetime,
        )));
    }

    Ok(())
}

pub async fn log_out(session: &Session) -> Result<(), WebError> {
    session.flush().await?;
    Ok(())
}

/// The account this session is logged in as, if any. A session pointing at a
/// vanished account counts as anonymous.
pub async fn current_user(state: &AppState, session: &Session) -> Result<Option<User>, WebError> {
    let Some(id) = session.get::<UserId>(USER_KEY).await? else {
        return Ok(None);
    };

    Ok(state.auth_service.current_user(id).await?)
}
