//! Authenticated session lifecycle: issue, refresh, revoke, touch.
//!
//! Sessions and the revocation set live in the ephemeral store under
//! `session:<token>` and `blacklist:<token>`. Records self-expire; the
//! manager never sweeps.

pub mod anonymous;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::auth::token::{self, Claims, TokenError};
use crate::store::{EphemeralStore, StoreError};
use crate::users::{Role, User, UserDirectory};

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

fn blacklist_key(token: &str) -> String {
    format!("blacklist:{}", token)
}

/// Stored per access token; outlives the token itself so diagnostics can
/// still answer "was this once valid" after expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: i64,
    pub role: Role,
    pub created_at: i64,
    pub last_activity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshedAccess {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid or expired refresh token")]
    InvalidRefreshToken,
    #[error("user not found")]
    UserNotFound,
    #[error("user is inactive")]
    UserInactive,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn EphemeralStore>,
    users: Arc<dyn UserDirectory>,
    secret: String,
    access_ttl_secs: i64,
    session_ttl: Duration,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        users: Arc<dyn UserDirectory>,
        secret: String,
        access_ttl_secs: i64,
        session_ttl: Duration,
    ) -> Self {
        Self { store, users, secret, access_ttl_secs, session_ttl }
    }

    /// Sign an access/refresh pair and record the session.
    pub async fn issue(&self, user: &User) -> Result<TokenPair, SessionError> {
        let claims = Claims::for_user(user.id, &user.email, &user.username, user.role);
        let access_token = token::sign(claims, &self.secret, self.access_ttl_secs)?;
        let refresh_token = token::sign_refresh(user.id, &self.secret)?;

        self.write_record(&access_token, user.id, user.role).await?;

        tracing::info!(user_id = user.id, "Issued session tokens");

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_secs,
            token_type: "bearer",
        })
    }

    /// Mint a new access token from a refresh token. The refresh token
    /// itself is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, SessionError> {
        let claims = token::verify(refresh_token, &self.secret)
            .filter(|c| c.is_refresh())
            .ok_or(SessionError::InvalidRefreshToken)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await
            .ok_or(SessionError::UserNotFound)?;
        if !user.is_active {
            return Err(SessionError::UserInactive);
        }

        let claims = Claims::for_user(user.id, &user.email, &user.username, user.role);
        let access_token = token::sign(claims, &self.secret, self.access_ttl_secs)?;
        self.write_record(&access_token, user.id, user.role).await?;

        tracing::info!(user_id = user.id, "Refreshed access token");

        Ok(RefreshedAccess {
            access_token,
            expires_in: self.access_ttl_secs,
            token_type: "bearer",
        })
    }

    /// Blacklist a token and drop its session record. Idempotent; store
    /// trouble is logged and swallowed so logout always succeeds.
    pub async fn revoke(&self, access_token: &str) {
        if let Err(e) = self
            .store
            .put(&blacklist_key(access_token), "revoked", self.session_ttl)
            .await
        {
            tracing::warn!("Failed to write blacklist entry: {}", e);
        }
        if let Err(e) = self.store.delete(&session_key(access_token)).await {
            tracing::warn!("Failed to delete session record: {}", e);
        }
    }

    /// Blacklist presence check. Presence of any value means revoked; a
    /// store error fails open so the cache cannot take down all
    /// authenticated traffic.
    pub async fn is_revoked(&self, access_token: &str) -> bool {
        match self.store.get(&blacklist_key(access_token)).await {
            Ok(entry) => entry.is_some(),
            Err(e) => {
                tracing::warn!("Blacklist check failed, allowing request: {}", e);
                false
            }
        }
    }

    /// Sliding-expiry update on each authenticated request. Best-effort: a
    /// failure here must never fail the request it piggybacks on.
    pub async fn touch(&self, access_token: &str) {
        let key = session_key(access_token);
        let record = match self.store.get(&key).await {
            Ok(Some(raw)) => serde_json::from_str::<SessionRecord>(&raw).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Session touch read failed: {}", e);
                return;
            }
        };

        let Some(mut record) = record else { return };
        record.last_activity = Utc::now().timestamp();

        match serde_json::to_string(&record) {
            Ok(raw) => {
                if let Err(e) = self.store.put(&key, &raw, self.session_ttl).await {
                    tracing::warn!("Session touch write failed: {}", e);
                }
            }
            Err(e) => tracing::warn!("Session record serialization failed: {}", e),
        }
    }

    pub async fn session_record(&self, access_token: &str) -> Option<SessionRecord> {
        let raw = self.store.get(&session_key(access_token)).await.ok()??;
        serde_json::from_str(&raw).ok()
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    async fn write_record(&self, access_token: &str, user_id: i64, role: Role) -> Result<(), StoreError> {
        let now = Utc::now().timestamp();
        let record = SessionRecord { user_id, role, created_at: now, last_activity: now };
        let raw = serde_json::to_string(&record)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.store.put(&session_key(access_token), &raw, self.session_ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::users::{make_user, MemoryUserDirectory};

    const SECRET: &str = "session-test-secret";

    async fn manager() -> (SessionManager, Arc<MemoryUserDirectory>) {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(MemoryUserDirectory::new());
        let manager = SessionManager::new(
            store,
            users.clone(),
            SECRET.to_string(),
            3600,
            Duration::from_secs(24 * 3600),
        );
        (manager, users)
    }

    #[tokio::test]
    async fn issue_signs_tokens_and_records_session() {
        let (manager, _) = manager().await;
        let user = make_user(5, "analyst", "analyst@example.com", Role::Analyst, "pw");

        let pair = manager.issue(&user).await.unwrap();
        assert_eq!(pair.expires_in, 3600);
        assert_eq!(pair.token_type, "bearer");

        let claims = token::verify(&pair.access_token, SECRET).unwrap();
        assert_eq!(claims.sub, 5);
        assert!(!claims.is_refresh());

        let refresh = token::verify(&pair.refresh_token, SECRET).unwrap();
        assert!(refresh.is_refresh());

        let record = manager.session_record(&pair.access_token).await.unwrap();
        assert_eq!(record.user_id, 5);
        assert_eq!(record.role, Role::Analyst);
    }

    #[tokio::test]
    async fn revoke_blacklists_and_drops_record() {
        let (manager, _) = manager().await;
        let user = make_user(5, "analyst", "analyst@example.com", Role::Analyst, "pw");
        let pair = manager.issue(&user).await.unwrap();

        assert!(!manager.is_revoked(&pair.access_token).await);
        manager.revoke(&pair.access_token).await;
        assert!(manager.is_revoked(&pair.access_token).await);
        assert!(manager.session_record(&pair.access_token).await.is_none());

        // The token itself still verifies; revocation is a layer above
        assert!(token::verify(&pair.access_token, SECRET).is_some());

        // Revoking twice is harmless
        manager.revoke(&pair.access_token).await;
        assert!(manager.is_revoked(&pair.access_token).await);
    }

    #[tokio::test]
    async fn touch_advances_last_activity() {
        let (manager, _) = manager().await;
        let user = make_user(5, "analyst", "analyst@example.com", Role::Analyst, "pw");
        let pair = manager.issue(&user).await.unwrap();

        // Backdate the record, then touch
        let stale = SessionRecord {
            user_id: 5,
            role: Role::Analyst,
            created_at: Utc::now().timestamp() - 500,
            last_activity: Utc::now().timestamp() - 500,
        };
        manager
            .store
            .put(
                &session_key(&pair.access_token),
                &serde_json::to_string(&stale).unwrap(),
                Duration::from_secs(3600),
            )
            .await
            .unwrap();

        manager.touch(&pair.access_token).await;
        let record = manager.session_record(&pair.access_token).await.unwrap();
        assert!(record.last_activity >= Utc::now().timestamp() - 5);
        // created_at is preserved
        assert_eq!(record.created_at, stale.created_at);
    }

    #[tokio::test]
    async fn touch_on_unknown_token_is_a_no_op() {
        let (manager, _) = manager().await;
        manager.touch("no-such-token").await;
    }

    #[tokio::test]
    async fn refresh_reissues_access_for_active_user() {
        let (manager, users) = manager().await;
        let user = make_user(9, "casey", "casey@example.com", Role::Researcher, "pw");
        users.insert(user.clone()).await;
        let pair = manager.issue(&user).await.unwrap();

        let refreshed = manager.refresh(&pair.refresh_token).await.unwrap();
        let claims = token::verify(&refreshed.access_token, SECRET).unwrap();
        assert_eq!(claims.sub, 9);
        assert_eq!(claims.role, Some(Role::Researcher));
        assert!(manager.session_record(&refreshed.access_token).await.is_some());
    }

    #[tokio::test]
    async fn refresh_rejects_access_tokens() {
        let (manager, users) = manager().await;
        let user = make_user(9, "casey", "casey@example.com", Role::Researcher, "pw");
        users.insert(user.clone()).await;
        let pair = manager.issue(&user).await.unwrap();

        // An access token is signature-valid but carries no refresh type
        let err = manager.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn refresh_rejects_inactive_or_unknown_users() {
        let (manager, users) = manager().await;
        let mut user = make_user(9, "casey", "casey@example.com", Role::Researcher, "pw");
        let refresh_token = token::sign_refresh(9, SECRET).unwrap();

        let err = manager.refresh(&refresh_token).await.unwrap_err();
        assert!(matches!(err, SessionError::UserNotFound));

        user.is_active = false;
        users.insert(user).await;
        let err = manager.refresh(&refresh_token).await.unwrap_err();
        assert!(matches!(err, SessionError::UserInactive));
    }
}
