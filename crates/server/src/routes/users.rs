//! User and auth routes: signup, login, refresh, logout, admin listing.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use agricraft_core::Role;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::UserProfile;
use crate::services::auth::{AuthService, AuthTokens};
use crate::state::AppState;

/// Cap on the admin user listing.
const USER_LIST_LIMIT: i64 = 500;

/// Token pair plus the public user projection, returned by every auth flow.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

impl AuthResponse {
    fn new(user: UserProfile, tokens: AuthTokens) -> Self {
        Self {
            token: tokens.access,
            refresh_token: tokens.refresh,
            user,
        }
    }
}

/// Signup request body. Fields are validated by hand so a missing field
/// yields a 400 with a sensible message rather than a deserialization error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Register a new user.
///
/// POST /users/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(AppError::Validation("email and password required".to_string()));
    };
    let role = match body.role.as_deref() {
        None => Role::default(),
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|_| AppError::Validation(format!("unknown role '{raw}'")))?,
    };

    let auth = AuthService::new(state.store(), state.tokens());
    let (user, tokens) = auth.signup(&email, &password, body.name, role).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user signed up");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new(user.profile(), tokens)),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login with email and password.
///
/// POST /users/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(AppError::Validation("email and password required".to_string()));
    };

    let auth = AuthService::new(state.store(), state.tokens());
    let (user, tokens) = auth.login(&email, &password).await?;

    Ok(Json(AuthResponse::new(user.profile(), tokens)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Exchange a refresh token for a new pair, rotating it.
///
/// POST /users/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>> {
    let Some(refresh_token) = body.refresh_token else {
        return Err(AppError::Validation("refreshToken required".to_string()));
    };

    let auth = AuthService::new(state.store(), state.tokens());
    let (user, tokens) = auth.refresh(&refresh_token).await?;

    Ok(Json(AuthResponse::new(user.profile(), tokens)))
}

/// Revoke the caller's refresh token.
///
/// POST /users/logout
pub async fn logout(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<StatusCode> {
    let auth = AuthService::new(state.store(), state.tokens());
    auth.logout(identity.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List users without their credential fields. Admin only.
///
/// GET /users
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(identity): RequireAuth,
) -> Result<Json<Vec<UserProfile>>> {
    identity.require_role(&[Role::Admin])?;

    let users = state.store().list_users(USER_LIST_LIMIT).await?;
    Ok(Json(users.into_iter().map(|u| u.profile()).collect()))
}
