//! Rate-limit enforcement ahead of authentication.
//!
//! Runs before the auth middleware, so the optional per-user key component
//! comes from a signature check of the bearer token rather than a resolved
//! identity; there is no store round-trip on that path.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use super::{bearer_token, client_ip};
use crate::auth::token;
use crate::error::ApiError;
use crate::ratelimit::{classify, Decision};
use crate::state::AppState;

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();
    if path == state.config.security.health_path {
        return Ok(next.run(request).await);
    }

    let class = classify(path);
    let ip = client_ip(request.headers(), peer.as_ref());
    let user_id = bearer_token(request.headers())
        .and_then(|t| token::verify(t, state.sessions.secret()))
        .map(|claims| claims.sub);

    match state.limiter.check(class, &ip, user_id).await {
        Decision::Allowed { .. } => Ok(next.run(request).await),
        Decision::Denied { limit, retry_after_secs } => {
            Err(ApiError::too_many_requests("Rate limit exceeded", limit, retry_after_secs))
        }
    }
}
