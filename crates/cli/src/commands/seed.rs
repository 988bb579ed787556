//! Store seeding commands.
//!
//! # Usage
//!
//! ```bash
//! # Seed demo users (admin/farmer/buyer) and a handful of products
//! agricraft-cli seed
//!
//! # Create a single user with a chosen role
//! agricraft-cli user create -e admin@example.com -p <password> -r admin
//! ```
//!
//! # Environment Variables
//!
//! - `AGRICRAFT_STORE` - `postgres` (default) or `json`
//! - `AGRICRAFT_DATABASE_URL` - `PostgreSQL` connection string
//! - `AGRICRAFT_DB_PATH` - JSON store file path (default: data/agricraft.json)

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use agricraft_core::{Email, EmailError, ProductId, Role, UserId};
use agricraft_server::models::{Product, User};
use agricraft_server::services::auth::{AuthError, hash_password};
use agricraft_server::store::json::JsonStore;
use agricraft_server::store::postgres::{PgStore, create_pool};
use agricraft_server::store::{Store, StoreError};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Unknown store backend.
    #[error("Invalid store backend: {0}. Valid backends: postgres, json")]
    InvalidBackend(String),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: buyer, farmer, admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password hashing failed.
    #[error("Hashing error: {0}")]
    Hashing(String),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Open the store selected by `AGRICRAFT_STORE`.
async fn open_store() -> Result<Arc<dyn Store>, SeedError> {
    dotenvy::dotenv().ok();

    let backend = std::env::var("AGRICRAFT_STORE").unwrap_or_else(|_| "postgres".to_owned());
    match backend.as_str() {
        "postgres" => {
            let database_url = std::env::var("AGRICRAFT_DATABASE_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map(SecretString::from)
                .map_err(|_| SeedError::MissingEnvVar("AGRICRAFT_DATABASE_URL"))?;
            let pool = create_pool(&database_url).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        "json" => {
            let path = std::env::var("AGRICRAFT_DB_PATH")
                .unwrap_or_else(|_| "data/agricraft.json".to_owned());
            Ok(Arc::new(JsonStore::open(path).await?))
        }
        other => Err(SeedError::InvalidBackend(other.to_owned())),
    }
}

fn build_user(
    email: &str,
    password: &str,
    name: Option<String>,
    role: Role,
) -> Result<User, SeedError> {
    let now = Utc::now();
    Ok(User {
        id: UserId::generate(),
        name,
        email: Email::parse(email)?,
        password_hash: hash_password(password).map_err(|e| match e {
            AuthError::Hashing(msg) => SeedError::Hashing(msg),
            other => SeedError::Hashing(other.to_string()),
        })?,
        role,
        refresh_token: None,
        created_at: now,
        updated_at: now,
    })
}

/// Create a single user with a chosen role.
///
/// # Errors
///
/// Returns [`SeedError`] on invalid input or store failure.
pub async fn create_user(
    email: &str,
    password: &str,
    name: Option<String>,
    role: &str,
) -> Result<(), SeedError> {
    let role: Role = role
        .parse()
        .map_err(|_| SeedError::InvalidRole(role.to_owned()))?;

    let store = open_store().await?;
    let user = store.create_user(build_user(email, password, name, role)?).await?;
    tracing::info!(user_id = %user.id, email = %user.email, role = %user.role, "user created");
    Ok(())
}

/// Seed demo users and products.
///
/// Creates one admin, one farmer, and one buyer (all with the password
/// `pw123456`), plus a handful of products owned by the farmer. Intended
/// for local development against a fresh store.
///
/// # Errors
///
/// Returns [`SeedError`] on store failure, including when the demo emails
/// already exist.
pub async fn run() -> Result<(), SeedError> {
    let store = open_store().await?;

    tracing::info!("Seeding demo users...");
    let admin = store
        .create_user(build_user(
            "admin@agricraft.dev",
            "pw123456",
            Some("Demo Admin".to_owned()),
            Role::Admin,
        )?)
        .await?;
    let farmer = store
        .create_user(build_user(
            "farmer@agricraft.dev",
            "pw123456",
            Some("Demo Farmer".to_owned()),
            Role::Farmer,
        )?)
        .await?;
    let buyer = store
        .create_user(build_user(
            "buyer@agricraft.dev",
            "pw123456",
            Some("Demo Buyer".to_owned()),
            Role::Buyer,
        )?)
        .await?;
    tracing::info!(admin = %admin.id, farmer = %farmer.id, buyer = %buyer.id, "demo users created");

    tracing::info!("Seeding demo products...");
    let demo_products = [
        ("Alphonso Mangoes", "Sweet seasonal mangoes, 1kg box", 450, 40, "Fruit"),
        ("Organic Tomatoes", "Vine-ripened organic tomatoes, 500g", 60, 120, "Vegetables"),
        ("Raw Forest Honey", "Unfiltered wild honey, 250ml jar", 320, 25, "Pantry"),
        ("Basmati Rice", "Aged long-grain basmati, 5kg sack", 780, 60, "Grains"),
    ];
    for (title, description, price, stock, category) in demo_products {
        let now = Utc::now();
        let product = store
            .create_product(Product {
                id: ProductId::generate(),
                title: title.to_owned(),
                description: description.to_owned(),
                price: Decimal::from(price),
                stock,
                images: Vec::new(),
                category: category.to_owned(),
                farmer_id: Some(farmer.id),
                status: agricraft_core::ProductStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await?;
        tracing::info!(product_id = %product.id, title = %product.title, "product created");
    }

    tracing::info!("Seeding complete!");
    Ok(())
}
