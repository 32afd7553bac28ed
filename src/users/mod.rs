//! User model and lookup interface.
//!
//! The relational store that owns user rows is an external collaborator;
//! the gateway only needs to resolve "user by id" and "user by email".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::auth::password;

/// Roles in ascending order of privilege; the derived ordering is what
/// `RequestUser::require_role` compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Researcher,
    Analyst,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Viewer => "viewer",
            Role::Researcher => "researcher",
            Role::Analyst => "analyst",
            Role::Admin => "admin",
        };
        write!(f, "{}", name)
    }
}

/// Sentinel id carried by the pseudo-user synthesized for anonymous
/// sessions; every authorization check must treat it as unprivileged.
pub const ANONYMOUS_USER_ID: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub password_salt: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Option<User>;
    async fn find_by_email(&self, email: &str) -> Option<User>;
}

/// In-memory directory for development and tests.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<i64, User>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: User) {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
    }

    /// Seed accounts for non-production environments.
    pub async fn with_dev_users() -> Self {
        let directory = Self::new();
        directory.insert(make_user(1, "admin", "admin@example.com", Role::Admin, "admin-password")).await;
        directory
            .insert(make_user(2, "analyst", "analyst@example.com", Role::Analyst, "analyst-password"))
            .await;
        directory
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: i64) -> Option<User> {
        let users = self.users.read().await;
        users.get(&id).cloned()
    }

    async fn find_by_email(&self, email: &str) -> Option<User> {
        let users = self.users.read().await;
        users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned()
    }
}

/// Build a user record with a freshly derived password hash.
pub fn make_user(id: i64, username: &str, email: &str, role: Role, password: &str) -> User {
    let derived = password::hash(password);
    User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        role,
        password_hash: derived.hash,
        password_salt: derived.salt,
        is_active: true,
        is_verified: true,
        created_at: Utc::now(),
        last_login: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering_matches_privilege() {
        assert!(Role::Admin > Role::Analyst);
        assert!(Role::Analyst > Role::Researcher);
        assert!(Role::Researcher > Role::Viewer);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Analyst).unwrap(), "\"analyst\"");
        let parsed: Role = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(parsed, Role::Viewer);
    }

    #[test]
    fn serialized_user_never_leaks_credentials() {
        let user = make_user(7, "casey", "casey@example.com", Role::Researcher, "hunter2");
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_salt").is_none());
        assert_eq!(json["email"], "casey@example.com");
    }

    #[tokio::test]
    async fn directory_lookups() {
        let directory = MemoryUserDirectory::with_dev_users().await;
        let by_email = directory.find_by_email("Admin@Example.com").await.unwrap();
        assert_eq!(by_email.id, 1);
        assert_eq!(by_email.role, Role::Admin);

        assert!(directory.find_by_id(2).await.is_some());
        assert!(directory.find_by_id(99).await.is_none());
    }
}
