// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    models::{
        response::ApiResponse,
        user::{LoginRequest, RefreshRequest, RegisterRequest},
    },
    services::AuthService,
    utils::{extract::ValidatedJson, jwt::Claims},
};

/// Registers a new user.
///
/// Returns 201 Created with the public user and a fresh token pair.
pub async fn register(
    State(auth): State<AuthService>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = auth.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(res, "User registered successfully")),
    ))
}

/// Authenticates a user and returns a new token pair.
pub async fn login(
    State(auth): State<AuthService>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = auth.login(payload).await?;
    Ok(Json(ApiResponse::success(res, "Login successful")))
}

/// Exchanges a refresh token for a new access token.
pub async fn refresh(
    State(auth): State<AuthService>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = auth.refresh(&payload.refresh_token).await?;
    Ok(Json(ApiResponse::success(res, "Token refreshed successfully")))
}

/// Tokens are stateless, the client just drops them.
pub async fn logout(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    tracing::info!(user_id = %claims.sub, "user logged out");
    Json(ApiResponse::empty("Logout successful"))
}

pub async fn me(
    State(auth): State<AuthService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = auth.current_user(&claims.sub).await?;
    Ok(Json(ApiResponse::success(user, "User retrieved successfully")))
}
