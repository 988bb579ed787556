//! Product catalog routes.
//!
//! Listing and detail are public. Creation requires farmer or admin; a
//! farmer's products are always attributed to the authenticated farmer,
//! never to a `farmerId` supplied in the payload. Update and delete are
//! owner-scoped: the owning farmer or an admin.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use agricraft_core::{ProductId, ProductStatus, Role, UserId};

use crate::error::{AppError, Result};
use crate::middleware::{Identity, RequireAuth};
use crate::models::Product;
use crate::state::AppState;

/// Default and maximum page size for the public listing.
const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for the public listing.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Case-insensitive substring filter over title/description.
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// List products, newest first.
///
/// GET /products
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Product>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let products = state
        .store()
        .list_products(params.q.as_deref(), limit, offset)
        .await?;
    Ok(Json(products))
}

/// Fetch one product.
///
/// GET /products/{id}
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    let product = state
        .store()
        .product_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_string()))?;
    Ok(Json(product))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    /// Honored only for admin callers; farmers always own what they create.
    pub farmer_id: Option<UserId>,
    pub status: Option<ProductStatus>,
}

/// Create a product.
///
/// POST /products
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    identity.require_role(&[Role::Farmer, Role::Admin])?;

    let Some(title) = body.title.filter(|t| !t.trim().is_empty()) else {
        return Err(AppError::Validation("title required".to_string()));
    };
    let Some(price) = body.price else {
        return Err(AppError::Validation("price required".to_string()));
    };
    validate_price(price)?;
    let stock = body.stock.unwrap_or(0);
    if stock < 0 {
        return Err(AppError::Validation("stock must be non-negative".to_string()));
    }

    // Payloads cannot attribute a product to someone else: a farmer always
    // owns what they create. Admins may set an explicit owner.
    let farmer_id = if identity.role == Role::Farmer {
        Some(identity.id)
    } else {
        body.farmer_id
    };

    let now = Utc::now();
    let product = Product {
        id: ProductId::generate(),
        title,
        description: body.description.unwrap_or_default(),
        price,
        stock,
        images: body.images.unwrap_or_default(),
        category: body.category.unwrap_or_else(|| "General".to_string()),
        farmer_id,
        status: body.status.unwrap_or_default(),
        created_at: now,
        updated_at: now,
    };

    let product = state.store().create_product(product).await?;
    tracing::info!(product_id = %product.id, actor = %identity.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
}

/// Partially update a product. Owner or admin.
///
/// PUT /products/{id}
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<ProductId>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    let mut product = owned_product(&state, &identity, id).await?;

    if let Some(title) = body.title {
        if title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        product.title = title;
    }
    if let Some(description) = body.description {
        product.description = description;
    }
    if let Some(price) = body.price {
        validate_price(price)?;
        product.price = price;
    }
    if let Some(stock) = body.stock {
        if stock < 0 {
            return Err(AppError::Validation("stock must be non-negative".to_string()));
        }
        product.stock = stock;
    }
    if let Some(images) = body.images {
        product.images = images;
    }
    if let Some(category) = body.category {
        product.category = category;
    }
    if let Some(status) = body.status {
        product.status = status;
    }
    product.updated_at = Utc::now();

    let product = state.store().update_product(product).await?;
    Ok(Json(product))
}

/// Delete a product. Owner or admin.
///
/// DELETE /products/{id}
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    owned_product(&state, &identity, id).await?;

    if !state.store().delete_product(id).await? {
        return Err(AppError::NotFound("product not found".to_string()));
    }
    tracing::info!(product_id = %id, actor = %identity.id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Fetch a product and enforce the ownership rule: admin, or the farmer
/// who owns it. NotFound takes precedence over Forbidden.
async fn owned_product(
    state: &AppState,
    identity: &Identity,
    id: ProductId,
) -> Result<Product> {
    let product = state
        .store()
        .product_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product not found".to_string()))?;

    if identity.role != Role::Admin && !product.is_owned_by(identity.id) {
        return Err(AppError::Forbidden(
            "only the owning farmer or an admin may modify this product".to_string(),
        ));
    }
    Ok(product)
}

fn validate_price(price: Decimal) -> Result<()> {
    if price.is_sign_negative() {
        return Err(AppError::Validation("price must be non-negative".to_string()));
    }
    Ok(())
}
