//! Persistence for the session core.
//!
//! `CredentialStore` is the seam: `DbOperations` talks to Postgres,
//! `MemoryStore` keeps everything in process.

pub mod memory;
pub mod models;
pub mod operations;

pub use memory::MemoryStore;
pub use models::{PublicUser, RefreshToken, TokenState, User};
pub use operations::{CredentialStore, DbOperations};

#[cfg(test)]
pub use operations::MockCredentialStore;
