//! Cart routes. All require authentication and operate on the caller's own
//! cart, which is created lazily on first access. Every handler returns the
//! updated cart with its total recomputed from the line items.

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use agricraft_core::ProductId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Cart, CartItem};
use crate::state::AppState;

/// Wire shape of a cart response: the cart plus its recomputed total.
///
/// The total is never persisted; it is derived on every read so it cannot
/// go stale against the line items.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub total: Decimal,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let total = cart.total();
        Self { cart, total }
    }
}

/// Fetch the caller's cart, creating an empty one if none exists.
///
/// GET /carts
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<CartView>> {
    let cart = state.store().cart_for_user(identity.id).await?;
    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Option<ProductId>,
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
    pub image: Option<String>,
}

/// Add an item, merging by product id.
///
/// POST /carts/items
pub async fn add_item(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let (Some(product_id), Some(title), Some(price)) = (body.product_id, body.title, body.price)
    else {
        return Err(AppError::Validation(
            "missing required fields: productId, title, price".to_string(),
        ));
    };
    let quantity = body.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::Validation("quantity must be positive".to_string()));
    }

    let mut cart = state.store().cart_for_user(identity.id).await?;
    cart.add_item(CartItem {
        product_id,
        title,
        price,
        quantity,
        image: body.image.unwrap_or_default(),
    });
    cart.updated_at = Utc::now();

    let cart = state.store().put_cart(cart).await?;
    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: Option<i64>,
}

/// Set a line item's quantity. Zero removes the item.
///
/// PUT /carts/items/{productId}
pub async fn set_quantity(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(body): Json<SetQuantityRequest>,
) -> Result<Json<CartView>> {
    let quantity = match body.quantity {
        Some(q) if q >= 0 => q,
        _ => return Err(AppError::Validation("valid quantity required".to_string())),
    };

    let mut cart = state.store().cart_for_user(identity.id).await?;
    if !cart.set_quantity(product_id, quantity) {
        return Err(AppError::NotFound("item not found in cart".to_string()));
    }
    cart.updated_at = Utc::now();

    let cart = state.store().put_cart(cart).await?;
    Ok(Json(cart.into()))
}

/// Remove a line item. A no-op (not an error) if the item is absent.
///
/// DELETE /carts/items/{productId}
pub async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartView>> {
    let mut cart = state.store().cart_for_user(identity.id).await?;
    cart.remove_item(product_id);
    cart.updated_at = Utc::now();

    let cart = state.store().put_cart(cart).await?;
    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub items: Option<Vec<CartItem>>,
}

/// Replace the cart's entire item list (client-side sync).
///
/// PUT /carts
pub async fn sync(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Json(body): Json<SyncRequest>,
) -> Result<Json<CartView>> {
    let Some(items) = body.items else {
        return Err(AppError::Validation("items must be an array".to_string()));
    };

    let mut cart = state.store().cart_for_user(identity.id).await?;
    cart.items = items;
    cart.updated_at = Utc::now();

    let cart = state.store().put_cart(cart).await?;
    Ok(Json(cart.into()))
}

/// Empty the caller's cart.
///
/// DELETE /carts
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<CartView>> {
    let mut cart = state.store().cart_for_user(identity.id).await?;
    cart.clear();
    cart.updated_at = Utc::now();

    let cart = state.store().put_cart(cart).await?;
    Ok(Json(cart.into()))
}
