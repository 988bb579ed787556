//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AGRICRAFT_ACCESS_SECRET` - Access-token signing secret (min 32 chars, high entropy)
//! - `AGRICRAFT_REFRESH_SECRET` - Refresh-token signing secret (min 32 chars, high entropy)
//! - `AGRICRAFT_DATABASE_URL` - `PostgreSQL` connection string (only when `AGRICRAFT_STORE=postgres`)
//!
//! ## Optional
//! - `AGRICRAFT_HOST` - Bind address (default: 127.0.0.1)
//! - `AGRICRAFT_PORT` - Listen port (default: 3000)
//! - `AGRICRAFT_STORE` - Store backend, `postgres` or `json` (default: postgres)
//! - `AGRICRAFT_DB_PATH` - Path to the JSON store file (default: data/agricraft.json)
//! - `AGRICRAFT_ACCESS_TTL_SECS` - Access token lifetime (default: 604800 = 7 days)
//! - `AGRICRAFT_REFRESH_TTL_SECS` - Refresh token lifetime (default: 2592000 = 30 days)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const MIN_SIGNING_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default access token lifetime: 7 days.
const DEFAULT_ACCESS_TTL_SECS: &str = "604800";
/// Default refresh token lifetime: 30 days.
const DEFAULT_REFRESH_TTL_SECS: &str = "2592000";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Which persistence backend to run against.
#[derive(Debug, Clone)]
pub enum StoreBackendConfig {
    /// `PostgreSQL` via a connection pool.
    Postgres { database_url: SecretString },
    /// Single-file JSON document store.
    Json { path: PathBuf },
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Persistence backend selection
    pub store: StoreBackendConfig,
    /// Access-token signing secret
    pub access_secret: SecretString,
    /// Refresh-token signing secret
    pub refresh_secret: SecretString,
    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("AGRICRAFT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("AGRICRAFT_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("AGRICRAFT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("AGRICRAFT_PORT".to_string(), e.to_string()))?;

        let store = match get_env_or_default("AGRICRAFT_STORE", "postgres").as_str() {
            "postgres" => StoreBackendConfig::Postgres {
                database_url: get_database_url("AGRICRAFT_DATABASE_URL")?,
            },
            "json" => StoreBackendConfig::Json {
                path: PathBuf::from(get_env_or_default(
                    "AGRICRAFT_DB_PATH",
                    "data/agricraft.json",
                )),
            },
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "AGRICRAFT_STORE".to_string(),
                    format!("expected 'postgres' or 'json', got '{other}'"),
                ));
            }
        };

        let access_secret = get_validated_secret("AGRICRAFT_ACCESS_SECRET")?;
        let refresh_secret = get_validated_secret("AGRICRAFT_REFRESH_SECRET")?;

        let access_ttl_secs = get_positive_secs("AGRICRAFT_ACCESS_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_ttl_secs =
            get_positive_secs("AGRICRAFT_REFRESH_TTL_SECS", DEFAULT_REFRESH_TTL_SECS)?;

        Ok(Self {
            host,
            port,
            store,
            access_secret,
            refresh_secret,
            access_ttl_secs,
            refresh_ttl_secs,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by managed postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a strictly positive seconds value.
fn get_positive_secs(key: &str, default: &str) -> Result<i64, ConfigError> {
    let secs = get_env_or_default(key, default)
        .parse::<i64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs <= 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be a positive number of seconds".to_string(),
        ));
    }
    Ok(secs)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient length and entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    if secret.len() < MIN_SIGNING_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SIGNING_SECRET_LENGTH,
                secret.len()
            ),
        ));
    }

    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a signing secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here-your-api-key-here", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_too_short() {
        let result = validate_secret_strength("aB3$xY9!", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_accepts_random() {
        let result = validate_secret_strength("kJ8#mP2$vQ9@xR4!bT6%nW1&zL5*cH3^", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_positive_secs_rejects_zero() {
        // Uses the default path so we stay off the process environment.
        assert!(get_positive_secs("AGRICRAFT_TEST_UNSET_TTL", "0").is_err());
        assert_eq!(
            get_positive_secs("AGRICRAFT_TEST_UNSET_TTL", "604800").unwrap(),
            604_800
        );
    }
}
