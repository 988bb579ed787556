//! Authentication error types.

use thiserror::Error;

use agricraft_core::EmailError;

use crate::services::tokens::TokenError;
use crate::store::StoreError;

/// Errors from signup/login/refresh/logout flows.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email format failed validation.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password failed the policy check.
    #[error("{0}")]
    WeakPassword(String),

    /// Email already registered.
    #[error("email already in use")]
    UserAlreadyExists,

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Refresh token failed validation, or no longer matches the stored
    /// reference (rotated or revoked).
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// Password hashing/verification machinery failed.
    #[error("password hashing error: {0}")]
    Hashing(String),

    /// Token signing failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
