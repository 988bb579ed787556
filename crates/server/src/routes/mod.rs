//! HTTP route handlers for the marketplace API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check
//!
//! # Users
//! POST /users/signup               - Register (201 {token, refreshToken, user})
//! POST /users/login                - Login (200 {token, refreshToken, user})
//! POST /users/refresh              - Exchange refresh token, rotating it
//! POST /users/logout               - Revoke refresh token (204)
//! GET  /users                      - List users, admin only
//!
//! # Products
//! GET    /products                 - Public listing, ?q= substring filter
//! GET    /products/{id}            - Public detail
//! POST   /products                 - Create, farmer/admin (farmer owner forced)
//! PUT    /products/{id}            - Update, owner or admin
//! DELETE /products/{id}            - Delete, owner or admin (204)
//!
//! # Carts (all authenticated, all return the updated cart)
//! GET    /carts                    - Fetch (lazily created)
//! PUT    /carts                    - Replace all items (sync)
//! DELETE /carts                    - Clear
//! POST   /carts/items              - Add item, merges by productId
//! PUT    /carts/items/{productId}  - Set quantity (0 removes)
//! DELETE /carts/items/{productId}  - Remove item (no-op if absent)
//!
//! # Orders
//! GET  /orders                     - Role-scoped listing, newest-first
//! POST /orders                     - Checkout, buyer only
//! PUT  /orders/{id}                - Status/tracking update, admin or owning farmer
//! ```

pub mod carts;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the user/auth routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route("/signup", post(users::signup))
        .route("/login", post(users::login))
        .route("/refresh", post(users::refresh))
        .route("/logout", post(users::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::remove),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(carts::show).put(carts::sync).delete(carts::clear),
        )
        .route("/items", post(carts::add_item))
        .route(
            "/items/{productId}",
            put(carts::set_quantity).delete(carts::remove_item),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list).post(orders::create))
        .route("/{id}", put(orders::update))
}

/// Create all routes for the API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/carts", cart_routes())
        .nest("/orders", order_routes())
}
