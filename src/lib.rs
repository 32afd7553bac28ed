//! Research Gateway - authentication, session, and rate-limiting core for a
//! multi-tenant research tools API.
//!
//! The crate is organized around a small set of seams:
//! - [`store::EphemeralStore`] abstracts the TTL key/value backend used for
//!   sessions, revocation marks, and rate-limit counters.
//! - [`auth::token`] signs and verifies the three-segment HMAC tokens.
//! - [`session::SessionManager`] owns the login/refresh/logout lifecycle.
//! - [`ratelimit::RateLimiter`] applies fixed-window limits per route class.
//! - [`middleware`] wires identity and limits into the axum request pipeline.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod ratelimit;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod users;
