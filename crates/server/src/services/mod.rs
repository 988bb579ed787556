//! Application services.

pub mod auth;
pub mod tokens;

pub use auth::{AuthError, AuthService};
pub use tokens::{AccessClaims, RefreshClaims, TokenError, TokenService};
