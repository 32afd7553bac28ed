use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub security: SecurityConfig,
    pub rate_limits: RateLimitConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HMAC secret used for both access and refresh tokens.
    pub token_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    /// Session records outlive the access token on purpose, so an expired
    /// but not-yet-evicted record can still answer "was this once valid".
    pub session_ttl_secs: u64,
    pub anonymous_ttl_secs: u64,
    /// Request paths matched by prefix that skip authentication entirely.
    pub public_path_prefixes: Vec<String>,
    /// Liveness endpoint, exempt from rate limiting.
    pub health_path: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub window_secs: u64,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub login: RateLimitRule,
    pub register: RateLimitRule,
    pub ai: RateLimitRule,
    pub export: RateLimitRule,
    pub default: RateLimitRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Exact origins; an empty list means permissive (development only).
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("GATEWAY_TOKEN_SECRET") {
            self.security.token_secret = v;
        }
        if let Ok(v) = env::var("GATEWAY_ACCESS_TOKEN_TTL_SECS") {
            self.security.access_token_ttl_secs = v.parse().unwrap_or(self.security.access_token_ttl_secs);
        }
        if let Ok(v) = env::var("GATEWAY_SESSION_TTL_SECS") {
            self.security.session_ttl_secs = v.parse().unwrap_or(self.security.session_ttl_secs);
        }
        if let Ok(v) = env::var("GATEWAY_PUBLIC_PATHS") {
            self.security.public_path_prefixes = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("GATEWAY_CORS_ORIGINS") {
            self.cors.allowed_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("GATEWAY_RATE_LIMIT_ENABLED") {
            self.rate_limits.enabled = v.parse().unwrap_or(self.rate_limits.enabled);
        }
        if let Ok(v) = env::var("GATEWAY_LOGIN_MAX_REQUESTS") {
            self.rate_limits.login.max_requests = v.parse().unwrap_or(self.rate_limits.login.max_requests);
        }
        if let Ok(v) = env::var("GATEWAY_LOGIN_WINDOW_SECS") {
            self.rate_limits.login.window_secs = v.parse().unwrap_or(self.rate_limits.login.window_secs);
        }
        if let Ok(v) = env::var("GATEWAY_DEFAULT_MAX_REQUESTS") {
            self.rate_limits.default.max_requests = v.parse().unwrap_or(self.rate_limits.default.max_requests);
        }
        if let Ok(v) = env::var("GATEWAY_DEFAULT_WINDOW_SECS") {
            self.rate_limits.default.window_secs = v.parse().unwrap_or(self.rate_limits.default.window_secs);
        }

        self
    }

    fn base_security(secret: &str) -> SecurityConfig {
        SecurityConfig {
            token_secret: secret.to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 7 * 24 * 3600,
            session_ttl_secs: 24 * 3600,
            anonymous_ttl_secs: 24 * 3600,
            public_path_prefixes: vec!["/health".to_string(), "/auth".to_string()],
            health_path: "/health".to_string(),
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            security: Self::base_security("dev-secret-change-me"),
            rate_limits: RateLimitConfig {
                enabled: true,
                login: RateLimitRule { window_secs: 60, max_requests: 50 },
                register: RateLimitRule { window_secs: 60, max_requests: 50 },
                ai: RateLimitRule { window_secs: 60, max_requests: 100 },
                export: RateLimitRule { window_secs: 60, max_requests: 100 },
                default: RateLimitRule { window_secs: 60, max_requests: 1000 },
            },
            cors: CorsConfig { allowed_origins: vec![] },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            security: Self::base_security(""),
            rate_limits: RateLimitConfig {
                enabled: true,
                login: RateLimitRule { window_secs: 60, max_requests: 10 },
                register: RateLimitRule { window_secs: 60, max_requests: 10 },
                ai: RateLimitRule { window_secs: 60, max_requests: 30 },
                export: RateLimitRule { window_secs: 60, max_requests: 30 },
                default: RateLimitRule { window_secs: 60, max_requests: 100 },
            },
            cors: CorsConfig {
                allowed_origins: vec!["https://staging.researchtools.example".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            security: Self::base_security(""),
            rate_limits: RateLimitConfig {
                enabled: true,
                login: RateLimitRule { window_secs: 60, max_requests: 5 },
                register: RateLimitRule { window_secs: 60, max_requests: 5 },
                ai: RateLimitRule { window_secs: 60, max_requests: 10 },
                export: RateLimitRule { window_secs: 60, max_requests: 10 },
                default: RateLimitRule { window_secs: 60, max_requests: 60 },
            },
            cors: CorsConfig {
                allowed_origins: vec!["https://app.researchtools.example".to_string()],
            },
        }
    }
}

// Global config - initialized once at startup. Components receive the
// values they need at construction rather than reaching for this directly.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults_are_loose() {
        let config = AppConfig::development();
        assert_eq!(config.rate_limits.default.max_requests, 1000);
        assert_eq!(config.rate_limits.login.max_requests, 50);
        assert!(config.cors.allowed_origins.is_empty());
        assert!(!config.security.token_secret.is_empty());
    }

    #[test]
    fn production_defaults_are_strict() {
        let config = AppConfig::production();
        assert_eq!(config.rate_limits.default.max_requests, 60);
        assert_eq!(config.rate_limits.login.max_requests, 5);
        // Production refuses to invent a secret; it must come from the env
        assert!(config.security.token_secret.is_empty());
    }

    #[test]
    fn access_token_is_shorter_lived_than_session() {
        let config = AppConfig::development();
        assert!((config.security.access_token_ttl_secs as u64) < config.security.session_ttl_secs);
    }
}
