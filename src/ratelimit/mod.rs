//! Fixed-window request counters keyed by route class and caller identity.
//!
//! The read-then-increment against the store is not atomic: concurrent
//! requests in the same window can both observe a count below the
//! threshold, so this is an approximate cap, not an exact one. On store
//! trouble the limiter fails open rather than blocking traffic.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{RateLimitConfig, RateLimitRule};
use crate::store::EphemeralStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Login,
    Register,
    Ai,
    Export,
    Default,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Login => "login",
            RouteClass::Register => "register",
            RouteClass::Ai => "ai",
            RouteClass::Export => "export",
            RouteClass::Default => "default",
        }
    }
}

/// Map a request path to its limiter class. Login/register/AI/export get
/// the stricter windows from the rule table; everything else shares the
/// default bucket.
pub fn classify(path: &str) -> RouteClass {
    if path.starts_with("/auth/login") {
        RouteClass::Login
    } else if path.starts_with("/auth/register") {
        RouteClass::Register
    } else if path.starts_with("/api/ai") {
        RouteClass::Ai
    } else if path.starts_with("/api/export") || path.ends_with("/export") {
        RouteClass::Export
    } else {
        RouteClass::Default
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { limit: u32, remaining: u32 },
    Denied { limit: u32, retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn EphemeralStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn EphemeralStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn rule(&self, class: RouteClass) -> RateLimitRule {
        match class {
            RouteClass::Login => self.config.login,
            RouteClass::Register => self.config.register,
            RouteClass::Ai => self.config.ai,
            RouteClass::Export => self.config.export,
            RouteClass::Default => self.config.default,
        }
    }

    /// Count a request against its window. Authenticated callers are
    /// limited per-user-per-IP; anonymous callers share an IP bucket.
    pub async fn check(&self, class: RouteClass, ip: &str, user_id: Option<i64>) -> Decision {
        let rule = self.rule(class);
        if !self.config.enabled {
            return Decision::Allowed { limit: rule.max_requests, remaining: rule.max_requests };
        }

        let key = match user_id {
            Some(uid) => format!("rate_limit:{}:{}:{}", class.as_str(), ip, uid),
            None => format!("rate_limit:{}:{}", class.as_str(), ip),
        };
        let window = Duration::from_secs(rule.window_secs);

        let count = match self.store.get(&key).await {
            Ok(raw) => raw.and_then(|v| v.parse::<u32>().ok()).unwrap_or(0),
            Err(e) => {
                tracing::warn!("Rate limit read failed, allowing request: {}", e);
                return Decision::Allowed { limit: rule.max_requests, remaining: rule.max_requests };
            }
        };

        if count >= rule.max_requests {
            tracing::warn!(key = %key, count, "Rate limit exceeded");
            return Decision::Denied {
                limit: rule.max_requests,
                retry_after_secs: rule.window_secs,
            };
        }

        // First write in a window establishes its expiry; later writes in
        // the same window push it out again (accepted simplification).
        if let Err(e) = self.store.put(&key, &(count + 1).to_string(), window).await {
            tracing::warn!("Rate limit write failed, allowing request: {}", e);
            return Decision::Allowed { limit: rule.max_requests, remaining: rule.max_requests };
        }

        Decision::Allowed {
            limit: rule.max_requests,
            remaining: rule.max_requests.saturating_sub(count + 1),
        }
    }
}
