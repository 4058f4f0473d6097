use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use std::sync::Arc;

use crate::auth::clock::Clock;
use crate::db::models::RefreshToken;
use crate::db::operations::CredentialStore;
use crate::error::DatabaseError;

const TOKEN_BYTES: usize = 32;

/// 256 bits from the thread-local CSPRNG, URL-safe base64 without padding.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lifecycle of opaque refresh tokens on top of a [`CredentialStore`].
///
/// Records are never deleted here. A token stops being usable when it is
/// revoked or when `expires_at` passes; see [`RefreshToken::state`].
pub struct RefreshTokenStore {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl RefreshTokenStore {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, user_id: uuid::Uuid) -> Result<RefreshToken, DatabaseError> {
        let template = RefreshToken::new(generate_refresh_token(), user_id, self.clock.now());
        self.store
            .create_refresh_token(&template.token, user_id, template.created_at, template.expires_at)
            .await
    }

    pub async fn lookup(&self, token: &str) -> Result<RefreshToken, DatabaseError> {
        self.store
            .get_refresh_token(token)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    /// Revoking an already revoked token succeeds and keeps the first `revoked_at`.
    pub async fn revoke(&self, token: &str) -> Result<RefreshToken, DatabaseError> {
        self.store.revoke_refresh_token(token, self.clock.now()).await
    }

    /// The record, only if it is still active.
    pub async fn lookup_active(&self, token: &str) -> Result<Option<RefreshToken>, DatabaseError> {
        let now = self.clock.now();
        Ok(self
            .store
            .get_refresh_token(token)
            .await?
            .filter(|record| record.is_active(now)))
    }
}
