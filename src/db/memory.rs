use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{RefreshToken, User};
use crate::db::operations::CredentialStore;
use crate::error::DatabaseError;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

/// In-process [`CredentialStore`] for tests and local runs.
///
/// Each operation takes the table lock once, so a revoke and a concurrent
/// lookup of the same token are serialized like row-level updates.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh_token_count(&self) -> usize {
        self.tables.read().await.refresh_tokens.len()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.refresh_tokens.contains_key(token) {
            return Err(DatabaseError::Duplicate);
        }
        let record = RefreshToken {
            token: token.to_string(),
            user_id,
            created_at,
            updated_at: created_at,
            expires_at,
            revoked_at: None,
        };
        tables.refresh_tokens.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, DatabaseError> {
        Ok(self.tables.read().await.refresh_tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<RefreshToken, DatabaseError> {
        let mut tables = self.tables.write().await;
        let record = tables
            .refresh_tokens
            .get_mut(token)
            .ok_or(DatabaseError::NotFound)?;
        if record.revoked_at.is_none() {
            record.revoked_at = Some(revoked_at);
            record.updated_at = revoked_at;
        }
        Ok(record.clone())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id) || tables.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email && u.id != id) {
            return Err(DatabaseError::Duplicate);
        }
        let user = tables.users.get_mut(&id).ok_or(DatabaseError::NotFound)?;
        user.email = email.to_string();
        user.hashed_password = hashed_password.to_string();
        user.updated_at = updated_at;
        Ok(())
    }
}
