use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(header::LOCATION, HeaderValue::from_static("/"))])
            .into_response(),
    }
}

/// Login URL that returns to `path` afterwards.
#[must_use]
pub fn login_with_next(path: &str) -> String {
    format!("/auth/login?next={}", urlencoding::encode(path))
}

/// Accepts `next` only when it stays on this site: a path starting with a
/// single `/`, with no scheme, host or backslash tricks.
#[must_use]
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();

    if !next.starts_with('/') || next.starts_with("//") || next.contains('\\') {
        return None;
    }

    if next.chars().any(char::is_control) {
        return None;
    }

    let base = url::Url::parse("http://localhost/").ok()?;
    let resolved = base.join(next).ok()?;
    (resolved.origin() == base.origin()).then_some(next)
}
