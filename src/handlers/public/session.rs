//! Anonymous session minting.

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::auth::ANONYMOUS_SESSION_HEADER;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /auth/session - mint a guest handle, presented back on later
/// requests through the anonymous-session header.
pub async fn create(State(state): State<AppState>) -> ApiResult<Value> {
    let handle = state.anonymous.create().await?;

    Ok(ApiResponse::created(json!({
        "session_id": handle,
        "header": ANONYMOUS_SESSION_HEADER,
        "expires_in": state.anonymous.ttl_secs(),
    })))
}
