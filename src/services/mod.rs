pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService};
pub use auth_service_impl::SeaOrmAuthService;

pub mod role_service;
pub mod role_service_impl;
pub use role_service::{Registration, RoleError, RoleService};
pub use role_service_impl::SeaOrmRoleService;
