use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Refresh tokens live for sixty days from creation.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

/// A user credential row.
///
/// Not `Serialize`: the password hash must never reach a response body.
/// Use [`PublicUser`] for that.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_chirpy_red: bool,
}

impl User {
    pub fn new(email: String, hashed_password: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            hashed_password,
            created_at: now,
            updated_at: now,
            is_chirpy_red: false,
        }
    }
}

/// The part of a [`User`] that may be shown to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_chirpy_red: bool,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
            is_chirpy_red: user.is_chirpy_red,
        }
    }
}

/// Lifecycle state of a refresh token at a given instant.
///
/// `Expired` and `Revoked` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Expired,
    Revoked,
}

#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn new(token: String, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            token,
            user_id,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(REFRESH_TOKEN_TTL_DAYS),
            revoked_at: None,
        }
    }

    // Revocation wins over expiry so a revoked token reports as revoked forever.
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        if self.revoked_at.is_some() {
            TokenState::Revoked
        } else if self.expires_at <= now {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == TokenState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_token_expiry_offset() {
        let now = Utc::now();
        let token = RefreshToken::new("t".into(), Uuid::new_v4(), now);
        assert_eq!(token.expires_at - token.created_at, Duration::days(60));
        assert!(token.revoked_at.is_none());
    }

    #[test]
    fn test_refresh_token_states() {
        let now = Utc::now();
        let mut token = RefreshToken::new("t".into(), Uuid::new_v4(), now);

        assert_eq!(token.state(now), TokenState::Active);
        assert_eq!(token.state(token.expires_at - Duration::seconds(1)), TokenState::Active);
        assert_eq!(token.state(token.expires_at), TokenState::Expired);
        assert_eq!(token.state(token.expires_at + Duration::days(1)), TokenState::Expired);

        token.revoked_at = Some(now);
        assert_eq!(token.state(now), TokenState::Revoked);
        assert_eq!(token.state(token.expires_at + Duration::days(1)), TokenState::Revoked);
        assert!(!token.is_active(now));
    }

    #[test]
    fn test_public_user_drops_hash() {
        let user = User::new("a@b.com".into(), "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(), Utc::now());
        let public = PublicUser::from(&user);
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(public.id, user.id);
        assert_eq!(public.email, "a@b.com");
    }
}
