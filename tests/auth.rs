use chirpy_auth::{
    auth::{verify_access_token, Clock, SessionManager},
    config::{AuthConfig, SecretString},
    db::{CredentialStore, MemoryStore, TokenState},
    error::AuthError,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

const SECRET: &str = "integration-secret";

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn new() -> Self {
        Self(Mutex::new(Utc::now()))
    }

    fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: SecretString::new(SECRET),
        api_key: SecretString::new("webhook-key"),
    }
}

async fn setup() -> (MemoryStore, Arc<ManualClock>, SessionManager) {
    let store = MemoryStore::new();
    let clock = Arc::new(ManualClock::new());
    let manager = SessionManager::with_clock(Arc::new(store.clone()), &auth_config(), clock.clone());
    manager.register("a@b.com", "pw").await.unwrap();
    (store, clock, manager)
}

#[tokio::test]
async fn test_login_flow() {
    let (store, clock, manager) = setup().await;

    let session = manager.login("a@b.com", "pw").await.unwrap();

    let user_id = verify_access_token(&session.access_token, SECRET.as_bytes()).unwrap();
    assert_eq!(user_id, session.user.id);

    let record = store.get_refresh_token(&session.refresh_token).await.unwrap().unwrap();
    assert_eq!(record.user_id, user_id);
    assert!(record.revoked_at.is_none());
    assert_eq!(record.expires_at - record.created_at, Duration::days(60));
    assert_eq!(record.state(clock.now()), TokenState::Active);
}

#[tokio::test]
async fn test_wrong_password_leaves_no_session() {
    let (store, _clock, manager) = setup().await;

    let result = manager.login("a@b.com", "wrong").await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));

    let result = manager.login("nobody@b.com", "pw").await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));

    assert_eq!(store.refresh_token_count().await, 0);
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token() {
    let (_store, _clock, manager) = setup().await;
    let session = manager.login("a@b.com", "pw").await.unwrap();

    let first = manager.refresh(&session.refresh_token).await.unwrap();
    let second = manager.refresh(&session.refresh_token).await.unwrap();

    assert_eq!(verify_access_token(&first, SECRET.as_bytes()).unwrap(), session.user.id);
    assert_eq!(verify_access_token(&second, SECRET.as_bytes()).unwrap(), session.user.id);
}

#[tokio::test]
async fn test_revoke_then_refresh() {
    let (store, clock, manager) = setup().await;
    let session = manager.login("a@b.com", "pw").await.unwrap();

    manager.revoke(&session.refresh_token).await.unwrap();
    let revoked_at = store
        .get_refresh_token(&session.refresh_token)
        .await
        .unwrap()
        .unwrap()
        .revoked_at;
    assert!(revoked_at.is_some());

    let result = manager.refresh(&session.refresh_token).await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));

    // A second revoke succeeds but does not move the timestamp.
    clock.advance(Duration::minutes(5));
    manager.revoke(&session.refresh_token).await.unwrap();
    let record = store.get_refresh_token(&session.refresh_token).await.unwrap().unwrap();
    assert_eq!(record.revoked_at, revoked_at);
    assert_eq!(record.state(clock.now()), TokenState::Revoked);
}

#[tokio::test]
async fn test_refresh_after_expiry() {
    let (store, clock, manager) = setup().await;
    let session = manager.login("a@b.com", "pw").await.unwrap();

    clock.advance(Duration::days(59));
    assert!(manager.refresh(&session.refresh_token).await.is_ok());

    clock.advance(Duration::days(1));
    let result = manager.refresh(&session.refresh_token).await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));

    // Expired rows are kept; expiry is only checked on use.
    let record = store.get_refresh_token(&session.refresh_token).await.unwrap().unwrap();
    assert!(record.revoked_at.is_none());
    assert_eq!(record.state(clock.now()), TokenState::Expired);
}

#[tokio::test]
async fn test_unknown_refresh_token() {
    let (_store, _clock, manager) = setup().await;

    assert!(matches!(manager.refresh("").await, Err(AuthError::InvalidToken)));
    assert!(matches!(manager.refresh("made-up").await, Err(AuthError::InvalidToken)));
    assert!(matches!(manager.revoke("made-up").await, Err(AuthError::InvalidToken)));
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let (_store, _clock, manager) = setup().await;
    let first = manager.login("a@b.com", "pw").await.unwrap();
    let second = manager.login("a@b.com", "pw").await.unwrap();
    assert_ne!(first.refresh_token, second.refresh_token);

    manager.revoke(&first.refresh_token).await.unwrap();

    assert!(manager.refresh(&first.refresh_token).await.is_err());
    assert!(manager.refresh(&second.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_revoke_and_refresh() {
    let (_store, _clock, manager) = setup().await;
    let manager = Arc::new(manager);
    let session = manager.login("a@b.com", "pw").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let manager = manager.clone();
        let token = session.refresh_token.clone();
        handles.push(tokio::spawn(async move {
            if i == 8 {
                manager.revoke(&token).await.map(|_| None)
            } else {
                manager.refresh(&token).await.map(Some)
            }
        }));
    }
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) | Err(AuthError::InvalidToken) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert!(matches!(
        manager.refresh(&session.refresh_token).await,
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_update_credentials() {
    let (_store, clock, manager) = setup().await;
    let session = manager.login("a@b.com", "pw").await.unwrap();
    assert_eq!(session.user.created_at, clock.now());

    clock.advance(Duration::days(3));
    let updated = manager
        .update_credentials(session.user.id, "new@b.com", "new-pw")
        .await
        .unwrap();
    assert_eq!(updated.email, "new@b.com");
    assert_eq!(updated.updated_at, clock.now());
    assert_eq!(updated.created_at, session.user.created_at);

    assert!(matches!(
        manager.login("a@b.com", "pw").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        manager.login("new@b.com", "pw").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(manager.login("new@b.com", "new-pw").await.is_ok());
}
