//! Authentication service.
//!
//! Password signup/login plus refresh-token rotation. Each user has at most
//! one active refresh token: login, signup, and refresh all mint a fresh one
//! and overwrite the stored reference *before* the token is returned, so a
//! previously issued refresh token stops working the moment a new one
//! exists, expired or not.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;

use agricraft_core::{Email, Role, UserId};

use crate::models::User;
use crate::services::tokens::TokenService;
use crate::store::{Store, StoreError};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

/// Authentication service.
///
/// Constructed per request from the shared store and token service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, tokens: &'a TokenService) -> Self {
        Self { store, tokens }
    }

    /// Register a new user and issue the first token pair.
    ///
    /// The refresh token is written into the user record in the same create,
    /// so there is no window where the user exists without its reference.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed email,
    /// `AuthError::WeakPassword` for a too-short password, and
    /// `AuthError::UserAlreadyExists` when the email is taken.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
        role: Role,
    ) -> Result<(User, AuthTokens), AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let now = Utc::now();
        let mut user = User {
            id: UserId::generate(),
            name,
            email,
            password_hash,
            role,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        let refresh = self.tokens.issue_refresh_token(&user)?;
        user.refresh_token = Some(refresh.clone());

        let user = self.store.create_user(user).await.map_err(|e| match e {
            StoreError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Store(other),
        })?;

        let access = self.tokens.issue_access_token(&user)?;
        Ok((
            user,
            AuthTokens {
                access,
                refresh,
            },
        ))
    }

    /// Login with email and password, rotating the refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown email or a
    /// wrong password; the two are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, AuthTokens), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        let tokens = self.issue_rotated(&user).await?;
        Ok((user, tokens))
    }

    /// Exchange a refresh token for a new token pair, rotating it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRefreshToken` when the token fails
    /// validation, the subject no longer exists, or the token no longer
    /// matches the stored reference (already rotated or revoked).
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, AuthTokens), AuthError> {
        let claims = self
            .tokens
            .validate_refresh_token(refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let user = self
            .store
            .user_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        // Single active token: an older token fails here even if unexpired.
        if user.refresh_token.as_deref() != Some(refresh_token) {
            return Err(AuthError::InvalidRefreshToken);
        }

        let tokens = self.issue_rotated(&user).await?;
        Ok((user, tokens))
    }

    /// Revoke the user's refresh token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the write fails.
    pub async fn logout(&self, user_id: UserId) -> Result<(), AuthError> {
        self.store.set_refresh_token(user_id, None).await?;
        Ok(())
    }

    /// Issue a fresh pair, persisting the rotated refresh token before
    /// returning it.
    async fn issue_rotated(&self, user: &User) -> Result<AuthTokens, AuthError> {
        let refresh = self.tokens.issue_refresh_token(user)?;
        self.store.set_refresh_token(user.id, Some(&refresh)).await?;
        let access = self.tokens.issue_access_token(user)?;
        Ok(AuthTokens { access, refresh })
    }
}

/// Check the password against the policy.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` when too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2 and a random salt.
///
/// # Errors
///
/// Returns `AuthError::Hashing` if the hasher fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch and
/// `AuthError::Hashing` for an unparsable stored hash.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::json::JsonStore;
    use chrono::Duration;
    use secrecy::SecretString;

    fn token_service() -> TokenService {
        TokenService::new(
            &SecretString::from("access-secret-for-tests-0123456789abcdef"),
            &SecretString::from("refresh-secret-for-tests-0123456789abcdef"),
            Duration::days(7),
            Duration::days(30),
        )
    }

    async fn store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("db.json")).await.unwrap();
        (dir, store)
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("pw123456").unwrap();
        assert!(verify_password("pw123456", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_password_policy() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("pw123456").is_ok());
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let (_dir, store) = store().await;
        let tokens = token_service();
        let auth = AuthService::new(&store, &tokens);

        let (created, _) = auth
            .signup("a@x.com", "pw123456", None, Role::Buyer)
            .await
            .unwrap();
        let (logged_in, pair) = auth.login("a@x.com", "pw123456").await.unwrap();
        assert_eq!(logged_in.id, created.id);
        assert_eq!(logged_in.role, Role::Buyer);
        assert!(!pair.access.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_signup_conflicts() {
        let (_dir, store) = store().await;
        let tokens = token_service();
        let auth = AuthService::new(&store, &tokens);

        auth.signup("a@x.com", "pw123456", None, Role::Buyer)
            .await
            .unwrap();
        assert!(matches!(
            auth.signup("a@x.com", "pw123456", None, Role::Farmer).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (_dir, store) = store().await;
        let tokens = token_service();
        let auth = AuthService::new(&store, &tokens);

        auth.signup("a@x.com", "pw123456", None, Role::Buyer)
            .await
            .unwrap();
        assert!(matches!(
            auth.login("a@x.com", "nope-nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("unknown@x.com", "pw123456").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotation_revokes_previous() {
        let (_dir, store) = store().await;
        let tokens = token_service();
        let auth = AuthService::new(&store, &tokens);

        let (_, first) = auth
            .signup("a@x.com", "pw123456", None, Role::Buyer)
            .await
            .unwrap();

        let (_, second) = auth.refresh(&first.refresh).await.unwrap();
        assert_ne!(first.refresh, second.refresh);

        // The first token no longer matches the stored reference.
        assert!(matches!(
            auth.refresh(&first.refresh).await,
            Err(AuthError::InvalidRefreshToken)
        ));
        // The rotated one still works.
        assert!(auth.refresh(&second.refresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_revokes_refresh() {
        let (_dir, store) = store().await;
        let tokens = token_service();
        let auth = AuthService::new(&store, &tokens);

        let (user, pair) = auth
            .signup("a@x.com", "pw123456", None, Role::Buyer)
            .await
            .unwrap();
        auth.logout(user.id).await.unwrap();
        assert!(matches!(
            auth.refresh(&pair.refresh).await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }
}
