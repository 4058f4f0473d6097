use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";
const API_KEY_PREFIX: &str = "ApiKey ";

/// A credential pulled from the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    ApiKey(String),
}

impl Credential {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        extract_bearer(headers)
            .map(|token| Credential::Bearer(token.to_string()))
            .or_else(|_| extract_api_key(headers).map(|key| Credential::ApiKey(key.to_string())))
    }
}

/// Token after a case-sensitive `"Bearer "` prefix, returned verbatim.
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    strip_scheme(headers, BEARER_PREFIX)
}

/// Key after a case-sensitive `"ApiKey "` prefix, returned verbatim.
pub fn extract_api_key(headers: &HeaderMap) -> Result<&str, AuthError> {
    strip_scheme(headers, API_KEY_PREFIX)
}

fn strip_scheme<'a>(headers: &'a HeaderMap, prefix: &str) -> Result<&'a str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(prefix))
        .ok_or(AuthError::MissingCredential)
}
