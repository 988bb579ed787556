//! Token service: issues and validates the two JWT classes.
//!
//! Access tokens carry subject and role and are validated on every request;
//! refresh tokens carry only the subject, are signed with a *different*
//! secret, and are additionally checked against the user's stored reference
//! (single active token per user - see [`crate::services::auth`]).
//!
//! Validation here is signature + expiry only; revocation state lives on the
//! user record, not in the token.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use agricraft_core::{Role, UserId};

use crate::models::User;

/// Token validation/signing errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, wrong token class, garbage input, or expired.
    #[error("invalid or expired token")]
    Invalid,

    /// Signing failed; indicates a key problem, not client input.
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject: the user id.
    pub sub: UserId,
    /// Role at issue time. Authorization still re-checks the live record.
    pub role: Role,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Claims carried by a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject: the user id.
    pub sub: UserId,
    /// Unique token id, so each rotation yields a distinct token even
    /// within the same second.
    pub jti: Uuid,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Issues and validates access/refresh JWTs (HS256).
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    /// Build a token service from the two signing secrets and TTLs.
    #[must_use]
    pub fn new(
        access_secret: &SecretString,
        refresh_secret: &SecretString,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.expose_secret().as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.expose_secret().as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.expose_secret().as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.expose_secret().as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue a signed access token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue_access_token(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.access_encoding).map_err(TokenError::Signing)
    }

    /// Issue a signed refresh token for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue_refresh_token(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user.id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.refresh_encoding).map_err(TokenError::Signing)
    }

    /// Validate an access token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] for any verification failure.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }

    /// Validate a refresh token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] for any verification failure.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use agricraft_core::Email;

    fn service() -> TokenService {
        TokenService::new(
            &SecretString::from("access-secret-for-tests-0123456789abcdef"),
            &SecretString::from("refresh-secret-for-tests-0123456789abcdef"),
            Duration::days(7),
            Duration::days(30),
        )
    }

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            name: None,
            email: Email::parse("t@example.com").unwrap(),
            password_hash: "hash".to_owned(),
            role,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_access_round_trip() {
        let service = service();
        let user = user(Role::Farmer);
        let token = service.issue_access_token(&user).unwrap();
        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Farmer);
    }

    #[test]
    fn test_refresh_round_trip() {
        let service = service();
        let user = user(Role::Buyer);
        let token = service.issue_refresh_token(&user).unwrap();
        let claims = service.validate_refresh_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
    }

    #[test]
    fn test_token_classes_are_not_interchangeable() {
        let service = service();
        let user = user(Role::Buyer);
        let refresh = service.issue_refresh_token(&user).unwrap();
        assert!(matches!(
            service.validate_access_token(&refresh),
            Err(TokenError::Invalid)
        ));
        let access = service.issue_access_token(&user).unwrap();
        assert!(matches!(
            service.validate_refresh_token(&access),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let service = service();
        assert!(matches!(
            service.validate_access_token("not-a-jwt"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_rotation_yields_distinct_tokens() {
        let service = service();
        let user = user(Role::Buyer);
        let first = service.issue_refresh_token(&user).unwrap();
        let second = service.issue_refresh_token(&user).unwrap();
        assert_ne!(first, second);
    }
}
