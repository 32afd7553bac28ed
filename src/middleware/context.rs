//! Per-request context: correlation id, processing time, deferred logging.
//!
//! Outermost middleware in the pipeline. The access-log entry is queued on
//! the logger channel after the response is built; the client never waits
//! on the write.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

use super::client_ip;
use crate::logging::RequestLog;
use crate::state::AppState;

/// Correlation id, also exposed to handlers via request extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn context_middleware(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let ip = client_ip(request.headers(), peer.as_ref());
    let start = Instant::now();

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let headers = response.headers_mut();
    if let Ok(v) = request_id.parse() {
        headers.insert("X-Request-Id", v);
    }
    if let Ok(v) = latency_ms.to_string().parse() {
        headers.insert("X-Process-Time-Ms", v);
    }

    // Fire and forget: queued for the background writer, never awaited
    state.logger.record(RequestLog {
        request_id,
        method,
        path,
        status: response.status().as_u16(),
        client_ip: ip,
        latency_ms,
    });

    response
}
