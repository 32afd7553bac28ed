use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::logging::RequestLogger;
use crate::ratelimit::RateLimiter;
use crate::session::anonymous::AnonymousSessionManager;
use crate::session::SessionManager;
use crate::store::EphemeralStore;
use crate::users::UserDirectory;

/// Shared application state threaded through the router. Everything here
/// is cheaply cloneable; cross-request state lives in the injected store,
/// never in process memory.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn EphemeralStore>,
    pub users: Arc<dyn UserDirectory>,
    pub sessions: SessionManager,
    pub anonymous: AnonymousSessionManager,
    pub limiter: RateLimiter,
    pub logger: RequestLogger,
}

impl AppState {
    /// Wire the components together. Must be called inside a tokio runtime
    /// (the request logger spawns its worker task here).
    pub fn new(
        config: AppConfig,
        store: Arc<dyn EphemeralStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let config = Arc::new(config);
        let sessions = SessionManager::new(
            store.clone(),
            users.clone(),
            config.security.token_secret.clone(),
            config.security.access_token_ttl_secs,
            Duration::from_secs(config.security.session_ttl_secs),
        );
        let anonymous = AnonymousSessionManager::new(
            store.clone(),
            Duration::from_secs(config.security.anonymous_ttl_secs),
        );
        let limiter = RateLimiter::new(store.clone(), config.rate_limits.clone());
        let logger = RequestLogger::spawn();

        Self { config, store, users, sessions, anonymous, limiter, logger }
    }
}
