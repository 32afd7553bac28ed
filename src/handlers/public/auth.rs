//! Public authentication endpoints: login, refresh, logout.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::password;
use crate::error::ApiError;
use crate::middleware::bearer_token;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// POST /auth/login - exchange credentials for an access/refresh pair
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(payload) = payload
        .map_err(|e| ApiError::invalid_json(format!("Request body is not valid JSON: {}", e)))?;

    let mut field_errors = HashMap::new();
    if payload.email.trim().is_empty() {
        field_errors.insert("email".to_string(), "This field is required".to_string());
    }
    if payload.password.is_empty() {
        field_errors.insert("password".to_string(), "This field is required".to_string());
    }
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Missing required fields", Some(field_errors)));
    }

    // Same response for unknown email and wrong password
    let user = state
        .users
        .find_by_email(payload.email.trim())
        .await
        .filter(|u| password::verify(&payload.password, &u.password_hash, &u.password_salt))
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized("User account is disabled"));
    }

    let tokens = state.sessions.issue(&user).await?;

    Ok(ApiResponse::success(json!({
        "user": user,
        "tokens": tokens,
    })))
}

/// POST /auth/refresh - mint a new access token from a refresh token
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(payload) = payload
        .map_err(|e| ApiError::invalid_json(format!("Request body is not valid JSON: {}", e)))?;

    if payload.refresh_token.trim().is_empty() {
        let mut field_errors = HashMap::new();
        field_errors.insert("refresh_token".to_string(), "This field is required".to_string());
        return Err(ApiError::validation_error("Missing required fields", Some(field_errors)));
    }

    let refreshed = state.sessions.refresh(payload.refresh_token.trim()).await?;
    Ok(ApiResponse::success(json!(refreshed)))
}

/// POST /auth/logout - revoke the bearer token, if one was sent.
/// Idempotent: always succeeds, with or without a token.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Value> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token).await;
    }
    Ok(ApiResponse::success(json!({ "message": "Logged out" })))
}
