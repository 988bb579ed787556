//! Authentication middleware and extractors.
//!
//! Provides an extractor for requiring bearer-token authentication in route
//! handlers. The token is validated against the access-token secret and the
//! subject is re-fetched from the store, so a deleted user is rejected even
//! while holding an unexpired token, and role changes take effect immediately.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use agricraft_core::{Email, Role, UserId};

use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller, resolved from the access token.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Email,
    pub role: Role,
}

impl Identity {
    /// Check that the caller holds one of `allowed` roles.
    ///
    /// An empty slice means any authenticated caller is allowed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the role is not in the list.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.is_empty() || allowed.contains(&self.role) {
            return Ok(());
        }
        Err(AppError::Forbidden(format!(
            "role '{}' may not perform this action",
            self.role
        )))
    }
}

/// Extractor that requires a valid `Authorization: Bearer` access token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(identity): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", identity.email)
/// }
/// ```
pub struct RequireAuth(pub Identity);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let claims = state.tokens().validate_access_token(token)?;

        // Re-fetch so revoked accounts fail even with an unexpired token.
        let user = state
            .store()
            .user_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown user".to_string()))?;

        Ok(Self(Identity {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }))
    }
}

/// Pull the token out of the `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::generate(),
            name: None,
            email: Email::parse("a@x.com").unwrap(),
            role,
        }
    }

    #[test]
    fn test_require_role_empty_allows_any() {
        assert!(identity(Role::Buyer).require_role(&[]).is_ok());
    }

    #[test]
    fn test_require_role_enforced() {
        let farmer = identity(Role::Farmer);
        assert!(farmer.require_role(&[Role::Farmer, Role::Admin]).is_ok());
        assert!(matches!(
            identity(Role::Buyer).require_role(&[Role::Farmer, Role::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }
}
