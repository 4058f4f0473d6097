use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// `iss` claim on every access token.
pub const ISSUER: &str = "chirpy";

/// Access tokens are valid for one hour.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

pub fn access_token_ttl() -> Duration {
    Duration::seconds(ACCESS_TOKEN_TTL_SECS)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String, // User ID
    pub iat: i64,    // Issued at
    pub exp: i64,    // Expiration time
}

/// Sign an HS256 access token for `user_id`.
///
/// Timestamps have second precision, so two tokens issued for the same user
/// within the same second are identical.
pub fn issue_access_token(user_id: Uuid, secret: &[u8], ttl: Duration) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        iss: ISSUER.to_string(),
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::SigningFailure(e.to_string()))
}

/// Verify signature, issuer and expiry, and return the subject.
pub fn verify_access_token(token: &str, secret: &[u8]) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|_| AuthError::InvalidToken)?;

    // jsonwebtoken accepts exp == now; a token is dead at its expiry second.
    if data.claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::InvalidToken);
    }

    Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key";

    fn sign_raw(claims: &Claims, secret: &[u8]) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    #[test]
    fn test_issue_has_three_segments() {
        let user_id = Uuid::new_v4();
        for ttl in [Duration::hours(1), Duration::hours(24), Duration::minutes(1)] {
            let token = issue_access_token(user_id, SECRET, ttl).unwrap();
            assert_eq!(token.split('.').count(), 3);
        }
        // An empty key still signs.
        assert!(issue_access_token(user_id, b"", Duration::hours(1)).is_ok());
    }

    #[test]
    fn test_issue_then_verify() {
        let user_id = Uuid::new_v4();
        let token = issue_access_token(user_id, SECRET, access_token_ttl()).unwrap();
        assert_eq!(verify_access_token(&token, SECRET).unwrap(), user_id);
    }

    #[test]
    fn test_verify_with_other_secret_fails() {
        let user_id = Uuid::new_v4();
        let token = issue_access_token(user_id, b"secret-one", Duration::hours(1)).unwrap();
        assert!(matches!(verify_access_token(&token, b"secret-two"), Err(AuthError::InvalidToken)));
        assert!(matches!(verify_access_token(&token, b""), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::hours(-1)).unwrap();
        assert!(matches!(verify_access_token(&token, SECRET), Err(AuthError::InvalidToken)));

        let token = issue_access_token(Uuid::new_v4(), SECRET, Duration::zero()).unwrap();
        assert!(matches!(verify_access_token(&token, SECRET), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        for token in ["", "invalid-token", "not.a.valid.jwt", "a.b.c"] {
            assert!(
                matches!(verify_access_token(token, SECRET), Err(AuthError::InvalidToken)),
                "expected rejection for {:?}",
                token
            );
        }
    }

    #[test]
    fn test_non_uuid_subject_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: "1234567890".to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = sign_raw(&claims, SECRET);
        assert!(matches!(verify_access_token(&token, SECRET), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: "someone-else".to_string(),
            sub: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 3600,
        };
        let token = sign_raw(&claims, SECRET);
        assert!(matches!(verify_access_token(&token, SECRET), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tokens_differ_across_seconds() {
        let user_id = Uuid::new_v4();
        let first = issue_access_token(user_id, SECRET, Duration::hours(1)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = issue_access_token(user_id, SECRET, Duration::hours(1)).unwrap();
        assert_ne!(first, second);
    }
}
