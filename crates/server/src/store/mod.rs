//! Persistence seam.
//!
//! All handlers talk to one polymorphic [`Store`] held in app state as an
//! `Arc<dyn Store>`; the backend is chosen once at startup from
//! configuration. Two implementations exist:
//!
//! - [`postgres::PgStore`] - `PostgreSQL` via sqlx, the production backend.
//! - [`json::JsonStore`] - a single JSON document on disk, the local
//!   development fallback.
//!
//! Every operation is scoped to a single record keyed by its id; there are
//! no cross-record transactions. Concurrent writers to the same record race
//! last-write-wins (see DESIGN.md on optimistic concurrency).

pub mod json;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use agricraft_core::{Email, OrderId, ProductId, UserId};

use crate::models::{Cart, Order, Product, User};

/// Errors surfaced by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint was violated (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record id did not resolve.
    #[error("not found")]
    NotFound,

    /// The database rejected or failed the operation.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The JSON document file could not be read or written.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted record no longer deserializes or carries invalid data.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Which orders a listing should return.
///
/// The scope is applied before the newest-first cap so a farmer match deep
/// in the history is not crowded out by other tenants' recent orders.
#[derive(Debug, Clone)]
pub enum OrderScope {
    /// Every order (admin).
    All,
    /// Orders placed by one buyer.
    Buyer(UserId),
    /// Orders containing at least one line item whose product id is in the
    /// given set (farmer visibility).
    ContainsProduct(Vec<ProductId>),
}

/// Storage backend capability.
///
/// Mutations take and return whole records: handlers load, modify in memory,
/// and write back, mirroring the document-store shape of the data.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity check for the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    // -- users ---------------------------------------------------------

    /// Persist a new user. Fails with [`StoreError::Conflict`] when the
    /// email is already taken.
    async fn create_user(&self, user: User) -> Result<User, StoreError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    /// All users, oldest first, capped at `limit`.
    async fn list_users(&self, limit: i64) -> Result<Vec<User>, StoreError>;

    /// Overwrite the stored refresh-token reference. `None` revokes it.
    /// The write completes before the new token is handed to the client.
    async fn set_refresh_token(
        &self,
        id: UserId,
        refresh_token: Option<&str>,
    ) -> Result<(), StoreError>;

    // -- products ------------------------------------------------------

    async fn create_product(&self, product: Product) -> Result<Product, StoreError>;

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Newest-first page of products, optionally filtered by a
    /// case-insensitive substring over title/description.
    async fn list_products(
        &self,
        query: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, StoreError>;

    /// Replace a product record. Fails with [`StoreError::NotFound`] if the
    /// id does not resolve.
    async fn update_product(&self, product: Product) -> Result<Product, StoreError>;

    /// Returns whether a record was deleted.
    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError>;

    /// Ids of every product owned by the given farmer.
    async fn product_ids_owned_by(&self, farmer: UserId) -> Result<Vec<ProductId>, StoreError>;

    // -- carts ---------------------------------------------------------

    /// The user's cart, created lazily (and persisted) on first access.
    async fn cart_for_user(&self, user: UserId) -> Result<Cart, StoreError>;

    /// Write back a cart after mutation.
    async fn put_cart(&self, cart: Cart) -> Result<Cart, StoreError>;

    // -- orders --------------------------------------------------------

    async fn create_order(&self, order: Order) -> Result<Order, StoreError>;

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Orders within `scope`, newest first, capped at `limit`.
    async fn list_orders(&self, scope: OrderScope, limit: i64) -> Result<Vec<Order>, StoreError>;

    /// Replace an order record. Fails with [`StoreError::NotFound`] if the
    /// id does not resolve.
    async fn update_order(&self, order: Order) -> Result<Order, StoreError>;
}
