use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::extract::extract_bearer;
use crate::db::models::PublicUser;
use crate::error::{AppError, AuthError};
use crate::AppState;

fn app_state(req: &HttpRequest) -> Result<&web::Data<AppState>, AppError> {
    req.app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalError("Application state not configured".into()))
}

/// Caller identity resolved from a bearer access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = app_state(req).and_then(|state| {
            state
                .sessions
                .authorize(req.headers())
                .map(AuthenticatedUser)
                .map_err(AppError::from)
        });
        ready(result)
    }
}

/// Marker for requests carrying the configured webhook API key.
///
/// `configure` mounts no route with it; the embedding app puts it on its
/// webhook handlers.
#[derive(Debug, Clone, Copy)]
pub struct ApiKeyAuthorized;

impl FromRequest for ApiKeyAuthorized {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = app_state(req).and_then(|state| {
            state
                .sessions
                .authorize_api_key(req.headers())
                .map(|_| ApiKeyAuthorized)
                .map_err(AppError::from)
        });
        ready(result)
    }
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: PublicUser,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

pub async fn register(
    req: web::Json<CredentialsRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request");
    match state.sessions.register(&req.email, &req.password).await {
        Ok(user) => Ok(HttpResponse::Created().json(user)),
        Err(e) => {
            error!("Registration failed: {}", e);
            Err(e.into())
        }
    }
}

pub async fn login(
    req: web::Json<CredentialsRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request");
    match state.sessions.login(&req.email, &req.password).await {
        Ok(session) => Ok(HttpResponse::Ok().json(LoginResponse {
            user: session.user,
            token: session.access_token,
            refresh_token: session.refresh_token,
        })),
        Err(e) => {
            if e.is_internal() {
                error!("Login failed: {}", e);
            } else {
                warn!("Login rejected: {}", e);
            }
            Err(e.into())
        }
    }
}

pub async fn refresh(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = extract_bearer(req.headers()).map_err(|_| AuthError::InvalidToken)?;
    let access_token = state.sessions.refresh(token).await?;
    Ok(HttpResponse::Ok().json(TokenResponse { token: access_token }))
}

pub async fn revoke(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = extract_bearer(req.headers()).map_err(|_| AuthError::InvalidToken)?;
    state.sessions.revoke(token).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn update_user(
    user: AuthenticatedUser,
    req: web::Json<CredentialsRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let updated: PublicUser = state
        .sessions
        .update_credentials(user.0, &req.email, &req.password)
        .await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// Routes served by this crate, for mounting into an `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/users")
            .route(web::post().to(register))
            .route(web::put().to(update_user)),
    )
    .route("/api/login", web::post().to(login))
    .route("/api/refresh", web::post().to(refresh))
    .route("/api/revoke", web::post().to(revoke));
}
