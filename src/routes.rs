//! Router assembly and middleware ordering.
//!
//! Request flow: context (request id / timing / deferred log) -> CORS ->
//! rate limit (health exempt) -> auth (public prefixes exempt) -> handler.

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::handlers::{protected, public};
use crate::middleware::auth::auth_middleware;
use crate::middleware::context::context_middleware;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Public auth routes (token acquisition)
        .route("/auth/login", post(public::auth::login))
        .route("/auth/refresh", post(public::auth::refresh))
        .route("/auth/logout", post(public::auth::logout))
        .route("/auth/session", post(public::session::create))
        // Protected API
        .route("/api/auth/whoami", get(protected::auth::whoami))
        // Middleware, innermost first: auth -> rate limit -> CORS -> trace -> context
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(state.clone(), context_middleware))
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Research Gateway",
            "version": version,
            "description": "Authentication, session, and rate-limiting gateway",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "POST /auth/login (public)",
                "refresh": "POST /auth/refresh (public)",
                "logout": "POST /auth/logout (public)",
                "anonymous_session": "POST /auth/session (public)",
                "whoami": "GET /api/auth/whoami (protected)",
            }
        }
    }))
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    let probe = async {
        state.store.put("health:probe", "ok", Duration::from_secs(60)).await?;
        state.store.get("health:probe").await
    }
    .await;

    match probe {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "ephemeral store unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "store_error": e.to_string()
                }
            })),
        ),
    }
}
