//! Authentication service.
//!
//! Resolves an email and password to an identity and registers accounts.
//!
//! # Resolution order
//!
//! 1. Look for an administrator record with that email. If one exists the
//!    password is checked against it alone: a match is [`IdentityResolution::Admin`],
//!    a mismatch is [`IdentityResolution::NoMatch`].
//! 2. Otherwise look for any record with that email: a match is
//!    [`IdentityResolution::User`], anything else is `NoMatch`.

mod error;

pub use error::AuthError;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use snippetbox_core::{Email, UserId};

use crate::db::{RepositoryError, Storage};
use crate::models::NewUser;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Outcome of checking an email and password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityResolution {
    /// No account matched, or the password was wrong.
    NoMatch,
    /// A regular account matched.
    User(UserId),
    /// An administrator account matched.
    Admin(UserId),
}

/// Argon2id password hasher.
///
/// Cost parameters only apply to new hashes; verification reads them from
/// the stored PHC string.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl CredentialHasher {
    /// Create a hasher with explicit cost parameters.
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    }

    /// Check a password against a stored hash in constant time.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordHash` if the stored hash is malformed.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(AuthError::PasswordHash),
        }
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    storage: &'a dyn Storage,
    hasher: &'a CredentialHasher,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(storage: &'a dyn Storage, hasher: &'a CredentialHasher) -> Self {
        Self { storage, hasher }
    }

    /// Resolve an email and password to an identity.
    ///
    /// Surrounding whitespace is ignored, as it is at signup. An email that
    /// does not parse cannot belong to any account and resolves to `NoMatch`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if storage fails and
    /// `AuthError::PasswordHash` if a stored hash is malformed.
    pub async fn resolve(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IdentityResolution, AuthError> {
        let Ok(email) = Email::parse(email.trim()) else {
            return Ok(IdentityResolution::NoMatch);
        };

        if let Some(admin) = self.storage.find_credential_record(&email, true).await? {
            return Ok(if self.hasher.verify(password, &admin.password_hash)? {
                IdentityResolution::Admin(admin.id)
            } else {
                IdentityResolution::NoMatch
            });
        }

        let Some(record) = self.storage.find_credential_record(&email, false).await? else {
            return Ok(IdentityResolution::NoMatch);
        };

        Ok(if self.hasher.verify(password, &record.password_hash)? {
            IdentityResolution::User(record.id)
        } else {
            IdentityResolution::NoMatch
        })
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &str,
        is_admin: bool,
    ) -> Result<UserId, AuthError> {
        validate_password(password)?;

        let user = NewUser {
            name: name.to_owned(),
            email: email.clone(),
            password_hash: self.hasher.hash(password)?,
            is_admin,
        };

        self.storage
            .insert_user(&user)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is shorter than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::new(Params::new(8, 1, 1, None).unwrap())
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_verify_uses_cost_from_hash() {
        let hash = fast_hasher().hash("correct horse").unwrap();
        let other = CredentialHasher::new(Params::new(16, 2, 1, None).unwrap());
        assert!(other.verify("correct horse", &hash).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash_is_failure() {
        let result = fast_hasher().verify("anything", "not-a-phc-string");
        assert!(matches!(result, Err(AuthError::PasswordHash)));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
        // Counted in characters, not bytes
        assert!(validate_password("ééééééé").is_err());
    }
}
