//! User domain types.

use snippetbox_core::{Email, UserId};

/// A user account ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Login identifier, unique across all accounts.
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Whether the account may log in as an administrator.
    pub is_admin: bool,
}

/// The data the credential verifier needs about an account.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    /// Account ID.
    pub id: UserId,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Administrator flag.
    pub is_admin: bool,
}
