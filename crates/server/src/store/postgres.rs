//! `PostgreSQL` storage backend.
//!
//! Documents (cart items, order items, billing, tracking, meta) live in
//! JSONB columns, keeping the row shape close to the document model; scalar
//! columns carry what the queries filter and sort on. Uses the runtime sqlx
//! query API. Schema migrations live in `crates/server/migrations/` and run
//! via `agricraft-cli migrate`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use agricraft_core::{Email, OrderId, ProductId, UserId};

use crate::models::{BillingAddress, Cart, CartItem, Order, OrderItem, Product, Tracking, User};

use super::{OrderScope, Store, StoreError};

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// sqlx-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Borrow the underlying pool (readiness checks).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: Option<String>,
    email: String,
    password_hash: String,
    role: String,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email: Email::parse(&row.email)
                .map_err(|e| StoreError::DataCorruption(format!("invalid email in database: {e}")))?,
            password_hash: row.password_hash,
            role: row
                .role
                .parse()
                .map_err(|e| StoreError::DataCorruption(format!("invalid role in database: {e}")))?,
            refresh_token: row.refresh_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    title: String,
    description: String,
    price: Decimal,
    stock: i64,
    images: Json<Vec<String>>,
    category: String,
    farmer_id: Option<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: ProductId::new(row.id),
            title: row.title,
            description: row.description,
            price: row.price,
            stock: row.stock,
            images: row.images.0,
            category: row.category,
            farmer_id: row.farmer_id.map(UserId::new),
            status: row.status.parse().map_err(|e| {
                StoreError::DataCorruption(format!("invalid product status in database: {e}"))
            })?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<CartItem>>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            items: row.items.0,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    items: Json<Vec<OrderItem>>,
    total: Decimal,
    billing: Json<BillingAddress>,
    status: String,
    tracking: Json<Tracking>,
    meta: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, StoreError> {
        Ok(Self {
            id: OrderId::new(row.id),
            buyer_id: UserId::new(row.buyer_id),
            items: row.items.0,
            total: row.total,
            billing: row.billing.0,
            status: row.status.parse().map_err(|e| {
                StoreError::DataCorruption(format!("invalid order status in database: {e}"))
            })?,
            tracking: row.tracking.0,
            meta: row.meta.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Map a unique-constraint violation to [`StoreError::Conflict`].
fn map_unique_violation(err: sqlx::Error, message: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return StoreError::Conflict(message.to_owned());
    }
    StoreError::Database(err)
}

/// Escape LIKE metacharacters in a user-supplied search string.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ============================================================================
// Store implementation
// ============================================================================

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, email, password_hash, role, refresh_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(&user.refresh_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "email already in use"))?;

        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, limit: i64) -> Result<Vec<User>, StoreError> {
        let rows: Vec<UserRow> =
            sqlx::query_as("SELECT * FROM users ORDER BY created_at ASC LIMIT $1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn set_refresh_token(
        &self,
        id: UserId,
        refresh_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET refresh_token = $1, updated_at = NOW() WHERE id = $2")
            .bind(refresh_token)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn create_product(&self, product: Product) -> Result<Product, StoreError> {
        sqlx::query(
            r"
            INSERT INTO products (id, title, description, price, stock, images, category, farmer_id, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(Json(&product.images))
        .bind(&product.category)
        .bind(product.farmer_id.map(UserId::as_uuid))
        .bind(product.status.to_string())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row: Option<ProductRow> = sqlx::query_as("SELECT * FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn list_products(
        &self,
        query: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, StoreError> {
        let rows: Vec<ProductRow> = match query {
            Some(q) => {
                let pattern = format!("%{}%", escape_like(q));
                sqlx::query_as(
                    r"
                    SELECT * FROM products
                    WHERE title ILIKE $1 OR description ILIKE $1
                    ORDER BY created_at DESC
                    LIMIT $2 OFFSET $3
                    ",
                )
                .bind(pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn update_product(&self, product: Product) -> Result<Product, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE products
            SET title = $1, description = $2, price = $3, stock = $4, images = $5,
                category = $6, farmer_id = $7, status = $8, updated_at = $9
            WHERE id = $10
            ",
        )
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(Json(&product.images))
        .bind(&product.category)
        .bind(product.farmer_id.map(UserId::as_uuid))
        .bind(product.status.to_string())
        .bind(product.updated_at)
        .bind(product.id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn product_ids_owned_by(&self, farmer: UserId) -> Result<Vec<ProductId>, StoreError> {
        let rows = sqlx::query("SELECT id FROM products WHERE farmer_id = $1")
            .bind(farmer.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| Ok(ProductId::new(row.try_get("id")?)))
            .collect()
    }

    async fn cart_for_user(&self, user: UserId) -> Result<Cart, StoreError> {
        let existing: Option<CartRow> = sqlx::query_as("SELECT * FROM carts WHERE user_id = $1")
            .bind(user.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = existing {
            return Ok(row.into());
        }

        let cart = Cart::new(user);
        // Another request may create the cart between the select and this
        // insert; the unique index on user_id makes the insert a no-op then.
        sqlx::query(
            r"
            INSERT INTO carts (id, user_id, items, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(cart.id.as_uuid())
        .bind(cart.user_id.as_uuid())
        .bind(Json(&cart.items))
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;

        let row: CartRow = sqlx::query_as("SELECT * FROM carts WHERE user_id = $1")
            .bind(user.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn put_cart(&self, cart: Cart) -> Result<Cart, StoreError> {
        sqlx::query(
            r"
            INSERT INTO carts (id, user_id, items, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items, updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(cart.id.as_uuid())
        .bind(cart.user_id.as_uuid())
        .bind(Json(&cart.items))
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(cart)
    }

    async fn create_order(&self, order: Order) -> Result<Order, StoreError> {
        sqlx::query(
            r"
            INSERT INTO orders (id, buyer_id, items, total, billing, status, tracking, meta, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(Json(&order.items))
        .bind(order.total)
        .bind(Json(&order.billing))
        .bind(order.status.to_string())
        .bind(Json(&order.tracking))
        .bind(Json(&order.meta))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(order)
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_orders(&self, scope: OrderScope, limit: i64) -> Result<Vec<Order>, StoreError> {
        let rows: Vec<OrderRow> = match scope {
            OrderScope::All => {
                sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC LIMIT $1")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            OrderScope::Buyer(buyer) => {
                sqlx::query_as(
                    "SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC LIMIT $2",
                )
                .bind(buyer.as_uuid())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            OrderScope::ContainsProduct(ids) => {
                let ids: Vec<Uuid> = ids.into_iter().map(ProductId::as_uuid).collect();
                sqlx::query_as(
                    r"
                    SELECT * FROM orders
                    WHERE EXISTS (
                        SELECT 1 FROM jsonb_array_elements(items) AS item
                        WHERE (item->>'productId')::uuid = ANY($1)
                    )
                    ORDER BY created_at DESC
                    LIMIT $2
                    ",
                )
                .bind(&ids)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn update_order(&self, order: Order) -> Result<Order, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET items = $1, total = $2, billing = $3, status = $4, tracking = $5,
                meta = $6, updated_at = $7
            WHERE id = $8
            ",
        )
        .bind(Json(&order.items))
        .bind(order.total)
        .bind(Json(&order.billing))
        .bind(order.status.to_string())
        .bind(Json(&order.tracking))
        .bind(Json(&order.meta))
        .bind(order.updated_at)
        .bind(order.id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off_deal"), "50\\% off\\_deal");
        assert_eq!(escape_like("plain"), "plain");
    }
}
