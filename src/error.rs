use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

// Implement conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.into())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl AppError {
    /// Message safe to put in a response body.
    ///
    /// Internal causes (hashing, signing, persistence detail) stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::AuthError(AuthError::Persistence(DatabaseError::Duplicate)) => {
                "Resource already exists".to_string()
            }
            AppError::AuthError(e) if e.is_internal() => "Internal server error".to_string(),
            AppError::AuthError(e) => e.to_string(),
            AppError::DatabaseError(DatabaseError::NotFound) => "Record not found".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let response = json!({
            "error": {
                "status": status.as_u16(),
                "message": self.public_message()
            }
        });
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
                AuthError::MissingCredential => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::Persistence(DatabaseError::Duplicate) => StatusCode::CONFLICT,
                AuthError::HashingFailure(_)
                | AuthError::SigningFailure(_)
                | AuthError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::DatabaseError(DatabaseError::NotFound) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Outcomes of the credential and session core.
///
/// The first five variants are what a caller is allowed to learn. They are
/// intentionally coarse: an unknown email and a wrong password are both
/// `InvalidCredentials`, and an unknown, expired or revoked refresh token is
/// always `InvalidToken`. The remaining variants are internal failures and
/// surface to clients only as a generic 500.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Missing credential")]
    MissingCredential,

    #[error("Password hashing failed: {0}")]
    HashingFailure(String),

    #[error("Token signing failed: {0}")]
    SigningFailure(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] DatabaseError),
}

impl AuthError {
    /// True for hashing, signing and persistence failures.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::HashingFailure(_) | AuthError::SigningFailure(_) | AuthError::Persistence(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DatabaseError::ConnectionError(err.to_string())
            }
            sqlx::Error::Database(ref db) if db.is_unique_violation() => DatabaseError::Duplicate,
            _ => DatabaseError::QueryError(err.to_string()),
        }
    }
}
