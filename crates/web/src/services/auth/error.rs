//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during credential verification and registration.
///
/// A wrong password or unknown email is not an error; it resolves to
/// [`super::IdentityResolution::NoMatch`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error, including a malformed stored hash.
    #[error("password hashing error")]
    PasswordHash,
}
