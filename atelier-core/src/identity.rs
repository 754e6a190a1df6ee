use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "CUSTOMER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CUSTOMER" => Some(Role::Customer),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A registered storefront customer. The password hash never leaves the
/// repository layer; API responses carry a projection without it.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            role: Role::Customer,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("user not found")]
    NotFound,

    #[error("email already registered: {0}")]
    EmailTaken(String),

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> Result<(), IdentityError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, IdentityError>;
}

/// In-memory user store for tests and local development.
pub struct MemoryUsers {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUsers {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryUsers {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn insert(&self, user: &User) -> Result<(), IdentityError> {
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(IdentityError::EmailTaken(user.email.clone()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, IdentityError> {
        let users = self.users.lock().await;
        Ok(users.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let users = MemoryUsers::new();
        let first = User::new("a@example.com".into(), "A".into(), "hash".into());
        users.insert(&first).await.unwrap();

        let second = User::new("a@example.com".into(), "B".into(), "hash".into());
        let err = users.insert(&second).await.unwrap_err();
        assert!(matches!(err, IdentityError::EmailTaken(_)));

        let found = users.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.role, Role::Customer);
    }
}
