//! Order routes: role-scoped listing, checkout, and status updates.
//!
//! Listing scope by role: admins see everything, farmers see orders
//! containing at least one of their products (the whole order record, not
//! just their lines), buyers see their own orders. All paths are capped at
//! the 200 most recent, newest first.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use agricraft_core::{OrderId, OrderStatus, Role};

use crate::error::{AppError, Result};
use crate::middleware::{Identity, RequireAuth};
use crate::models::{BillingAddress, Order, OrderItem};
use crate::state::AppState;

/// Cap on every order listing, regardless of role.
const ORDER_LIST_LIMIT: i64 = 200;

/// List orders visible to the caller.
///
/// GET /orders
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let scope = order_scope(&state, &identity).await?;
    let orders = state.store().list_orders(scope, ORDER_LIST_LIMIT).await?;
    Ok(Json(orders))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Option<Vec<OrderItem>>,
    /// Accepted for wire compatibility but ignored: the stored total is
    /// always recomputed server-side from the line items.
    pub total: Option<rust_decimal::Decimal>,
    pub billing: Option<BillingAddress>,
    pub meta: Option<serde_json::Value>,
}

/// Create an order from cart contents and billing info. Buyer only.
///
/// On success the buyer's cart is cleared best-effort: a cart-clear failure
/// is logged and swallowed, never rolled back into the order.
///
/// POST /orders
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    identity.require_role(&[Role::Buyer])?;

    let Some(items) = body.items.filter(|items| !items.is_empty()) else {
        return Err(AppError::Validation(
            "order must contain at least one item".to_string(),
        ));
    };
    for item in &items {
        if item.quantity <= 0 {
            return Err(AppError::Validation(
                "item quantities must be positive".to_string(),
            ));
        }
        if item.price.is_sign_negative() {
            return Err(AppError::Validation(
                "item prices must be non-negative".to_string(),
            ));
        }
    }
    let Some(billing) = body.billing.filter(BillingAddress::is_complete) else {
        return Err(AppError::Validation(
            "all billing fields are required".to_string(),
        ));
    };

    let order = Order::new(
        identity.id,
        items,
        billing,
        body.meta.unwrap_or_default(),
    );
    if order.total <= rust_decimal::Decimal::ZERO {
        return Err(AppError::Validation(
            "order total must be positive".to_string(),
        ));
    }

    let order = state.store().create_order(order).await?;
    tracing::info!(order_id = %order.id, buyer = %identity.id, total = %order.total, "order created");

    // Cart hygiene is best-effort; the order is already durable.
    if let Err(err) = clear_cart(&state, &identity).await {
        tracing::warn!(buyer = %identity.id, error = %err, "failed to clear cart after checkout");
    }

    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    /// RFC 3339 timestamp.
    pub estimated_delivery: Option<String>,
}

/// Update an order's status and tracking details.
///
/// Admins may update any order; farmers only orders containing one of their
/// products; buyers never. Tracking fields are partial updates: only the
/// provided fields are overwritten.
///
/// PUT /orders/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<Json<Order>> {
    identity.require_role(&[Role::Farmer, Role::Admin])?;

    let Some(raw_status) = body.status else {
        return Err(AppError::Validation("status required".to_string()));
    };
    let status = raw_status
        .parse::<OrderStatus>()
        .map_err(|_| AppError::Validation(format!("unknown status '{raw_status}'")))?;

    let mut order = state
        .store()
        .order_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

    if identity.role == Role::Farmer {
        let owned = state.store().product_ids_owned_by(identity.id).await?;
        if !order.contains_any(&owned) {
            return Err(AppError::Forbidden(
                "order does not contain any of your products".to_string(),
            ));
        }
    }

    if !order.status.can_transition_to(status) {
        return Err(AppError::Validation(format!(
            "cannot move order from '{}' to '{}'",
            order.status, status
        )));
    }

    order.apply_status(status);
    if let Some(carrier) = body.carrier {
        order.tracking.carrier = Some(carrier);
    }
    if let Some(tracking_number) = body.tracking_number {
        order.tracking.tracking_number = Some(tracking_number);
    }
    if let Some(raw) = body.estimated_delivery {
        let estimated = chrono::DateTime::parse_from_rfc3339(&raw)
            .map_err(|_| AppError::Validation(format!("invalid estimatedDelivery '{raw}'")))?;
        order.tracking.estimated_delivery = Some(estimated.with_timezone(&chrono::Utc));
    }

    let order = state.store().update_order(order).await?;
    tracing::info!(order_id = %order.id, status = %order.status, actor = %identity.id, "order status updated");
    Ok(Json(order))
}

/// Resolve the listing scope for the caller's role.
async fn order_scope(state: &AppState, identity: &Identity) -> Result<crate::store::OrderScope> {
    use crate::store::OrderScope;

    Ok(match identity.role {
        Role::Admin => OrderScope::All,
        Role::Buyer => OrderScope::Buyer(identity.id),
        Role::Farmer => {
            let owned = state.store().product_ids_owned_by(identity.id).await?;
            OrderScope::ContainsProduct(owned)
        }
    })
}

async fn clear_cart(state: &AppState, identity: &Identity) -> Result<()> {
    let mut cart = state.store().cart_for_user(identity.id).await?;
    cart.clear();
    cart.updated_at = chrono::Utc::now();
    state.store().put_cart(cart).await?;
    Ok(())
}
