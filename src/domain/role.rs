//! Account roles and the transitions between them.
//!
//! Registration decides the initial role from the requested one and whether
//! an admin already exists. After that the only moves are an admin approving
//! or rejecting a `Pending` account.

use sea_orm::entity::prelude::*;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Role {
    #[sea_orm(string_value = "User")]
    User,

    #[sea_orm(string_value = "Admin")]
    Admin,

    /// Asked for admin while another admin existed; waits for approval.
    #[sea_orm(string_value = "Pending")]
    Pending,
}

/// Moves an admin can apply to another account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{0} cannot be requested at registration")]
    NotRequestable(Role),

    #[error("account is {0}, not awaiting admin approval")]
    NotPending(Role),
}

impl Role {
    /// Roles offered on the registration form.
    pub const REQUESTABLE: [Self; 2] = [Self::User, Self::Admin];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Admin => "Admin",
            Self::Pending => "Pending",
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Role a new account is stored with.
    pub const fn on_registration(requested: Self, admin_exists: bool) -> Result<Self, TransitionError> {
        match (requested, admin_exists) {
            (Self::User, _) => Ok(Self::User),
            (Self::Admin, false) => Ok(Self::Admin),
            (Self::Admin, true) => Ok(Self::Pending),
            (Self::Pending, _) => Err(TransitionError::NotRequestable(Self::Pending)),
        }
    }

    /// Role after an admin applies `action`. Only `Pending` accounts move.
    pub const fn apply(self, action: RoleAction) -> Result<Self, TransitionError> {
        match (self, action) {
            (Self::Pending, RoleAction::Approve) => Ok(Self::Admin),
            (Self::Pending, RoleAction::Reject) => Ok(Self::User),
            (other, _) => Err(TransitionError::NotPending(other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Self::User),
            "Admin" => Ok(Self::Admin),
            "Pending" => Ok(Self::Pending),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl RoleAction {
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_as_user_is_always_user() {
        assert_eq!(Role::on_registration(Role::User, false), Ok(Role::User));
        assert_eq!(Role::on_registration(Role::User, true), Ok(Role::User));
    }

    #[test]
    fn first_admin_is_admin_then_pending() {
        assert_eq!(Role::on_registration(Role::Admin, false), Ok(Role::Admin));
        assert_eq!(Role::on_registration(Role::Admin, true), Ok(Role::Pending));
    }

    #[test]
    fn pending_cannot_be_requested() {
        assert_eq!(
            Role::on_registration(Role::Pending, false),
            Err(TransitionError::NotRequestable(Role::Pending))
        );
    }

    #[test]
    fn only_pending_moves() {
        assert_eq!(Role::Pending.apply(RoleAction::Approve), Ok(Role::Admin));
        assert_eq!(Role::Pending.apply(RoleAction::Reject), Ok(Role::User));

        for role in [Role::User, Role::Admin] {
            for action in [RoleAction::Approve, RoleAction::Reject] {
                assert_eq!(role.apply(action), Err(TransitionError::NotPending(role)));
            }
        }
    }

    #[test]
    fn parses_exact_names_only() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("Pending".parse::<Role>(), Ok(Role::Pending));
        assert!("admin".parse::<Role>().is_err());
        assert!("Owner".parse::<Role>().is_err());
    }
}
