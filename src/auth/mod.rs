//! Authentication module for the Chirpy API
//!
//! Password hashing, `Authorization` header parsing, access token signing,
//! the refresh-token lifecycle and the session manager composing them.

pub mod clock;
pub mod extract;
pub mod handlers;
pub mod password;
pub mod refresh;
pub mod session;
pub mod token;

pub use clock::{Clock, SystemClock};
pub use extract::{extract_api_key, extract_bearer, Credential};
pub use handlers::{ApiKeyAuthorized, AuthenticatedUser};
pub use password::{hash_password, verify_password};
pub use refresh::{generate_refresh_token, RefreshTokenStore};
pub use session::{LoginSession, SessionManager};
pub use token::{issue_access_token, verify_access_token, Claims};
