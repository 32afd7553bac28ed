//! Protected session endpoints.

use axum::Extension;
use serde_json::{json, Value};

use crate::middleware::auth::RequestUser;
use crate::middleware::response::{ApiResponse, ApiResult};

/// GET /api/auth/whoami - the identity the middleware resolved for this
/// request, authenticated or anonymous.
pub async fn whoami(Extension(user): Extension<RequestUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "role": user.role,
        "anonymous": user.anonymous,
    })))
}
