//! Request identity resolution.
//!
//! Establishes *who* is calling (bearer token or anonymous fallback) and
//! attaches a typed `RequestUser` to the request extensions. Role gating
//! is a separate, later check applied by individual handlers via
//! `RequestUser::require_role`.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::auth::token;
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::{Role, User};

pub const ANONYMOUS_SESSION_HEADER: &str = "X-Anonymous-Session";

/// Resolved caller identity for the duration of one request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub anonymous: bool,
}

impl RequestUser {
    fn from_user(user: &User, anonymous: bool) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            anonymous,
        }
    }

    /// Role gate for handlers. Anonymous callers never pass anything above
    /// viewer regardless of what a forged record might claim.
    pub fn require_role(&self, required: Role) -> Result<(), ApiError> {
        let effective = if self.anonymous { Role::Viewer } else { self.role };
        if effective >= required {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("This operation requires the {} role", required)))
        }
    }
}

/// Paths on the public allow-list skip authentication entirely.
pub fn is_public_path(path: &str, prefixes: &[String]) -> bool {
    path == "/" || prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
}

/// Authentication middleware implementing the identity state machine:
/// bearer token (verify, blacklist, active-user) or anonymous fallback.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();
    if is_public_path(path, &state.config.security.public_path_prefixes) {
        return Ok(next.run(request).await);
    }

    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        // No Authorization header: try the anonymous-session fallback
        if let Some(handle) = headers.get(ANONYMOUS_SESSION_HEADER).and_then(|v| v.to_str().ok()) {
            return match state.anonymous.resolve(handle).await? {
                Some(user) => {
                    request.extensions_mut().insert(RequestUser::from_user(&user, true));
                    Ok(next.run(request).await)
                }
                None => Err(ApiError::unauthorized("Invalid or expired anonymous session")),
            };
        }
        return Err(ApiError::unauthorized("Missing authentication token"));
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid authorization header format"))?;
    let Some(token_str) = auth_str.strip_prefix("Bearer ") else {
        return Err(ApiError::unauthorized("Authorization header must use Bearer token format"));
    };
    let token_str = token_str.trim();
    if token_str.is_empty() {
        return Err(ApiError::unauthorized("Empty bearer token"));
    }

    let claims = token::verify(token_str, state.sessions.secret())
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;
    if claims.is_refresh() {
        return Err(ApiError::unauthorized("Refresh tokens cannot authenticate requests"));
    }

    // Signature validity alone is not enough; revocation is layered on top
    if state.sessions.is_revoked(token_str).await {
        return Err(ApiError::unauthorized("Token has been revoked"));
    }

    let user = state
        .users
        .find_by_id(claims.sub)
        .await
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("User not found or inactive"))?;

    tracing::debug!(user_id = user.id, path = %request.uri().path(), "Authenticated request");

    request.extensions_mut().insert(RequestUser::from_user(&user, false));

    // Sliding session expiry; failures are logged inside and never fail
    // the request they piggyback on
    state.sessions.touch(token_str).await;

    Ok(next.run(request).await)
}
