//! Server-rendered HTML pages.
//!
//! Pages are plain `format!` strings around one layout. Everything that came
//! from a user or the database goes through `html_escape` first.

use axum::http::StatusCode;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write;

use super::forms::{FieldErrors, LoginForm, RegisterForm};
use super::session::Flash;
use crate::db::User;
use crate::domain::Role;

/// What every full page needs besides its body.
pub struct PageContext<'a> {
    pub user: Option<&'a User>,
    pub flashes: Vec<Flash>,
}

fn layout(title: &str, ctx: &PageContext<'_>, body: &str) -> String {
    let nav = match ctx.user {
        Some(user) if user.role.is_admin() => format!(
            r#"<a href="/dashboard">Dashboard</a> <a href="/admin_dashboard">Admin</a> <span class="who">{}</span> <a href="/auth/logout">Logout</a>"#,
            text(&user.username)
        ),
        Some(user) => format!(
            r#"<a href="/dashboard">Dashboard</a> <span class="who">{}</span> <a href="/auth/logout">Logout</a>"#,
            text(&user.username)
        ),
        None => r#"<a href="/auth/login">Login</a> <a href="/auth/register">Register</a>"#
            .to_string(),
    };

    let flashes = ctx.flashes.iter().fold(String::new(), |mut acc, f| {
        let _ = write!(
            acc,
            r#"<div class="flash flash-{}">{}</div>"#,
            f.category.as_str(),
            text(&f.message)
        );
        acc
    });

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · Warden</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body>
<nav><a class="brand" href="/">Warden</a> {nav}</nav>
<main>
{flashes}
{body}
</main>
</body>
</html>
"#,
        title = text(title),
    )
}

fn field_errors(errors: &FieldErrors, field: &str) -> String {
    errors.get(field).iter().fold(String::new(), |mut acc, msg| {
        let _ = write!(acc, r#"<span class="field-error">{}</span>"#, text(msg));
        acc
    })
}

fn input(label: &str, name: &str, kind: &str, value: &str, errors: &FieldErrors) -> String {
    let invalid = if errors.get(name).is_empty() {
        ""
    } else {
        r#" class="invalid""#
    };

    format!(
        r#"<label for="{name}">{label}</label>
<input id="{name}" name="{name}" type="{kind}" value="{value}"{invalid}>
{errors}"#,
        value = attr(value),
        errors = field_errors(errors, name),
    )
}

#[must_use]
pub fn home_page(ctx: &PageContext<'_>) -> String {
    layout(
        "Welcome",
        ctx,
        r#"<h1>Welcome</h1>
<p>Create an account or log in to continue.</p>
<p><a class="button" href="/auth/login">Login</a> <a class="button" href="/auth/register">Register</a></p>"#,
    )
}

/// `action` carries the `next` query so a re-rendered form keeps it.
#[must_use]
pub fn login_page(
    ctx: &PageContext<'_>,
    form: &LoginForm,
    errors: &FieldErrors,
    action: &str,
) -> String {
    let checked = if form.remember.as_deref().is_some_and(|v| !v.is_empty()) {
        " checked"
    } else {
        ""
    };

    let body = format!(
        r#"<h1>Login</h1>
<form method="post" action="{action}" novalidate>
{email}
{password}
<label class="check"><input type="checkbox" name="remember" value="y"{checked}> Remember me</label>
<button type="submit">Login</button>
</form>
<p>Need an account? <a href="/auth/register">Register</a></p>"#,
        action = attr(action),
        email = input("Email", "email", "email", &form.email, errors),
        password = input("Password", "password", "password", "", errors),
    );

    layout("Login", ctx, &body)
}

#[must_use]
pub fn register_page(ctx: &PageContext<'_>, form: &RegisterForm, errors: &FieldErrors) -> String {
    let options = Role::REQUESTABLE.iter().fold(String::new(), |mut acc, role| {
        let selected = if form.role == role.as_str() {
            " selected"
        } else {
            ""
        };
        let _ = write!(acc, r#"<option value="{role}"{selected}>{role}</option>"#);
        acc
    });

    let body = format!(
        r#"<h1>Register</h1>
<form method="post" action="/auth/register" novalidate>
{username}
{email}
{password}
<label for="role">Role</label>
<select id="role" name="role">{options}</select>
{role_errors}
<button type="submit">Register</button>
</form>
<p>Already registered? <a href="/auth/login">Login</a></p>"#,
        username = input("Username", "username", "text", &form.username, errors),
        email = input("Email", "email", "email", &form.email, errors),
        password = input("Password", "password", "password", "", errors),
        role_errors = field_errors(errors, "role"),
    );

    layout("Register", ctx, &body)
}

#[must_use]
pub fn dashboard_page(ctx: &PageContext<'_>, user: &User) -> String {
    let extra = match user.role {
        Role::Admin => {
            r#"<p><a href="/admin_dashboard">Review pending admin requests</a></p>"#
        }
        Role::Pending => "<p>Your request for admin access is awaiting approval.</p>",
        Role::User => "",
    };

    let body = format!(
        r#"<h1>Dashboard</h1>
<p>Hello, {name}. You are signed in as <strong>{role}</strong>.</p>
{extra}"#,
        name = text(&user.username),
        role = user.role,
    );

    layout("Dashboard", ctx, &body)
}

#[must_use]
pub fn admin_dashboard_page(ctx: &PageContext<'_>, pending: &[User]) -> String {
    let body = if pending.is_empty() {
        "<h1>Admin Dashboard</h1>\n<p>No pending admin requests.</p>".to_string()
    } else {
        let rows = pending.iter().fold(String::new(), |mut acc, user| {
            let _ = write!(
                acc,
                r#"<tr><td>{username}</td><td>{email}</td><td>{requested}</td><td><a class="button" href="/approve_admin/{id}">Approve</a> <a class="button danger" href="/reject_admin/{id}">Reject</a></td></tr>"#,
                username = text(&user.username),
                email = text(&user.email),
                requested = text(&user.created_at),
                id = user.id,
            );
            acc
        });

        format!(
            r#"<h1>Admin Dashboard</h1>
<table>
<thead><tr><th>Username</th><th>Email</th><th>Requested</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>"#
        )
    };

    layout("Admin Dashboard", ctx, &body)
}

#[must_use]
pub fn error_page(status: StatusCode, message: &str) -> String {
    let ctx = PageContext {
        user: None,
        flashes: Vec::new(),
    };
    let title = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        r#"<h1>{code} {title}</h1>
<p>{message}</p>
<p><a href="/">Back to start</a></p>"#,
        code = status.as_u16(),
        title = text(title),
        message = text(message),
    );

    layout(title, &ctx, &body)
}
