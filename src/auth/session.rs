use actix_web::http::header::HeaderMap;
use chrono::Duration;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::extract::{extract_api_key, extract_bearer};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh::RefreshTokenStore;
use crate::auth::token::{access_token_ttl, issue_access_token, verify_access_token};
use crate::config::{AuthConfig, SecretString};
use crate::db::models::{PublicUser, User};
use crate::db::operations::CredentialStore;
use crate::error::{AuthError, DatabaseError};

// Well-formed Argon2id hash that matches no password. Verifying against it on an
// unknown email keeps that path about as slow as a wrong password.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Orchestrates login, refresh, revoke and request authorization.
///
/// Holds no mutable state; share it behind an `Arc` across workers.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    refresh_tokens: RefreshTokenStore,
    clock: Arc<dyn Clock>,
    jwt_secret: SecretString,
    api_key_digest: Vec<u8>,
    access_ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, auth: &AuthConfig) -> Self {
        Self::with_clock(store, auth, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn CredentialStore>, auth: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            refresh_tokens: RefreshTokenStore::new(store.clone(), clock.clone()),
            store,
            clock,
            jwt_secret: auth.jwt_secret.clone(),
            api_key_digest: Sha256::digest(auth.api_key.expose().as_bytes()).to_vec(),
            access_ttl: access_token_ttl(),
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<PublicUser, AuthError> {
        let hashed = hash_password(password)?;
        let user = self.store.create_user(&User::new(email.to_string(), hashed, self.clock.now())).await?;
        info!("Registered user {}", user.id);
        Ok(PublicUser::from(&user))
    }

    /// Verify credentials and open a session.
    ///
    /// All or nothing: if the refresh token cannot be stored the whole login
    /// fails and the access token is dropped.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, AuthError> {
        let user = match self.store.get_user_by_email(email).await? {
            Some(user) => user,
            None => {
                let _ = verify_password(password, DUMMY_HASH);
                debug!("Login rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.hashed_password) {
            debug!("Login rejected: password mismatch for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.issue(user.id)?;
        let refresh = self.refresh_tokens.create(user.id).await.map_err(|e| {
            warn!("Could not store refresh token for user {}: {}", user.id, e);
            AuthError::from(e)
        })?;

        info!("Login succeeded for user {}", user.id);
        Ok(LoginSession {
            user: PublicUser::from(&user),
            access_token,
            refresh_token: refresh.token,
        })
    }

    /// Exchange an active refresh token for a new access token.
    ///
    /// Unknown, expired and revoked tokens are all `InvalidToken`. The refresh
    /// token itself is not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let record = self
            .refresh_tokens
            .lookup_active(refresh_token)
            .await?
            .ok_or_else(|| {
                debug!("Refresh rejected: token unknown, expired or revoked");
                AuthError::InvalidToken
            })?;

        self.issue(record.user_id)
    }

    /// Mark a refresh token revoked. Anyone holding the token may revoke it.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        match self.refresh_tokens.revoke(refresh_token).await {
            Ok(record) => {
                info!("Revoked refresh token for user {}", record.user_id);
                Ok(())
            }
            Err(DatabaseError::NotFound) => Err(AuthError::InvalidToken),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the caller from `Authorization: Bearer <access token>`.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        let token = extract_bearer(headers).map_err(|_| AuthError::Unauthorized)?;
        verify_access_token(token, self.jwt_secret.expose().as_bytes()).map_err(|_| AuthError::Unauthorized)
    }

    pub fn authorize_ownership(&self, user_id: Uuid, owner_id: Uuid) -> Result<(), AuthError> {
        if user_id == owner_id {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Check `Authorization: ApiKey <key>` against the configured key.
    ///
    /// Digests are compared rather than the raw keys, so the comparison time
    /// says nothing about how much of the configured key was guessed.
    pub fn authorize_api_key(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let key = extract_api_key(headers).map_err(|_| AuthError::Unauthorized)?;
        if Sha256::digest(key.as_bytes()).as_slice() == self.api_key_digest.as_slice() {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, AuthError> {
        let hashed = hash_password(password)?;
        match self.store.update_user(user_id, email, &hashed, self.clock.now()).await {
            Ok(()) => {}
            Err(DatabaseError::NotFound) => return Err(AuthError::Unauthorized),
            Err(e) => return Err(e.into()),
        }

        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        info!("Updated credentials for user {}", user.id);
        Ok(PublicUser::from(&user))
    }

    fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        issue_access_token(user_id, self.jwt_secret.expose().as_bytes(), self.access_ttl)
    }
}
