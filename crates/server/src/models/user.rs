//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agricraft_core::{Email, Role, UserId};

/// A marketplace user as persisted.
///
/// Carries the credential fields (`password_hash`, the active
/// `refresh_token`); this struct must never be serialized into an API
/// response. Use [`User::profile`] for anything caller-visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Email address, unique across users.
    pub email: Email,
    /// Argon2 hash of the password. Plaintext is never stored.
    pub password_hash: String,
    /// Role deciding what this user may do.
    pub role: Role,
    /// The single active refresh token, if any. Rotated on every
    /// login/refresh, cleared on logout.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// When the user signed up.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Credential-free projection for API responses.
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// Public view of a user: everything except credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: Role,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            name: Some("Asha".to_owned()),
            email: Email::parse("asha@example.com").unwrap(),
            password_hash: "$argon2id$stub".to_owned(),
            role: Role::Farmer,
            refresh_token: Some("token".to_owned()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_profile_excludes_credentials() {
        let user = sample_user();
        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("refreshToken").is_none());
        assert_eq!(json["email"], "asha@example.com");
        assert_eq!(json["role"], "farmer");
    }
}
