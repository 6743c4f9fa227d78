//! Login and registration forms and their field validation.
//!
//! Every field deserializes with a default so a missing field becomes a
//! "required" error on the form instead of a rejected request.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::domain::Role;
use crate::services::Registration;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_EMAIL: &str = "Invalid email address.";
pub const INVALID_CHOICE: &str = "Not a valid choice.";
pub const EMAIL_TAKEN: &str = "That email is already registered.";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("Invalid regex pattern defined in code")
    })
}

/// Field name to messages, in field order for stable rendering.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn required(errors: &mut FieldErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
        false
    } else {
        true
    }
}

fn email(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if required(errors, field, value) && !email_regex().is_match(value.trim()) {
        errors.add(field, INVALID_EMAIL);
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Present ("y", "on", ...) only when the checkbox is ticked.
    pub remember: Option<String>,
}

/// Login input after validation.
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub remember: bool,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginInput, FieldErrors> {
        let mut errors = FieldErrors::default();
        email(&mut errors, "email", &self.email);
        required(&mut errors, "password", &self.password);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(LoginInput {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
            remember: self.remember.as_deref().is_some_and(|v| !v.is_empty()),
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::default();
        required(&mut errors, "username", &self.username);
        email(&mut errors, "email", &self.email);
        required(&mut errors, "password", &self.password);

        let role = if required(&mut errors, "role", &self.role) {
            match self.role.parse::<Role>() {
                Ok(role) if Role::REQUESTABLE.contains(&role) => Some(role),
                _ => {
                    errors.add("role", INVALID_CHOICE);
                    None
                }
            }
        } else {
            None
        };

        match role {
            Some(requested_role) if errors.is_empty() => Ok(Registration {
                username: self.username.trim().to_string(),
                email: self.email.trim().to_string(),
                password: self.password.clone(),
                requested_role,
            }),
            _ => Err(errors),
        }
    }
}
