//! Short-lived guest identities.
//!
//! Anonymous sessions are cheap to mint (no password, no email) and must
//! never grant elevated capability: resolution always synthesizes a
//! `viewer` pseudo-user with the id 0 sentinel, which is never persisted.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::store::{EphemeralStore, StoreError};
use crate::users::{Role, User, ANONYMOUS_USER_ID};

pub const HANDLE_LEN: usize = 16;

fn anon_key(handle: &str) -> String {
    format!("anon:{}", handle)
}

/// Malformed handles are rejected before any store access.
pub fn is_valid_handle(handle: &str) -> bool {
    handle.len() == HANDLE_LEN && handle.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnonymousRecord {
    handle: String,
    created_at: i64,
    last_accessed_at: i64,
    data: Value,
}

#[derive(Clone)]
pub struct AnonymousSessionManager {
    store: Arc<dyn EphemeralStore>,
    ttl: Duration,
}

impl AnonymousSessionManager {
    pub fn new(store: Arc<dyn EphemeralStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Mint a fresh 16-character alphanumeric handle.
    pub async fn create(&self) -> Result<String, StoreError> {
        let handle: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(HANDLE_LEN)
            .map(char::from)
            .collect();

        let now = Utc::now().timestamp();
        let record = AnonymousRecord {
            handle: handle.clone(),
            created_at: now,
            last_accessed_at: now,
            data: Value::Object(Default::default()),
        };
        let raw = serde_json::to_string(&record).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.store.put(&anon_key(&handle), &raw, self.ttl).await?;

        tracing::debug!(handle = %handle, "Created anonymous session");
        Ok(handle)
    }

    /// Resolve a handle to a read-only pseudo-user, refreshing the sliding
    /// TTL on the way. Records older than the TTL are deleted even if the
    /// store's own eviction lags.
    pub async fn resolve(&self, handle: &str) -> Result<Option<User>, StoreError> {
        if !is_valid_handle(handle) {
            return Ok(None);
        }

        let key = anon_key(handle);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let Ok(mut record) = serde_json::from_str::<AnonymousRecord>(&raw) else {
            // Unreadable record: drop it rather than trusting it
            self.store.delete(&key).await?;
            return Ok(None);
        };

        let now = Utc::now().timestamp();
        if now - record.created_at > self.ttl.as_secs() as i64 {
            self.store.delete(&key).await?;
            return Ok(None);
        }

        record.last_accessed_at = now;
        let raw = serde_json::to_string(&record).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.store.put(&key, &raw, self.ttl).await?;

        Ok(Some(pseudo_user(handle, record.created_at)))
    }
}

/// The synthesized guest user. Never written back as a persistent user.
fn pseudo_user(handle: &str, created_at: i64) -> User {
    User {
        id: ANONYMOUS_USER_ID,
        username: format!("guest_{}", handle),
        email: format!("{}@anonymous.invalid", handle),
        role: Role::Viewer,
        password_hash: String::new(),
        password_salt: String::new(),
        is_active: true,
        is_verified: false,
        created_at: chrono::DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        last_login: None,
    }
}
