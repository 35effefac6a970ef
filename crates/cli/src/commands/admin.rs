//! Administrator account commands.
//!
//! Admin signup in the web app is itself gated on an administrator session,
//! so the first account has to be created here.
//!
//! # Usage
//!
//! ```bash
//! echo 'long secret' | snippetbox-cli admin create -e root@example.com -n "Root"
//! ```
//!
//! The password is read from the first line of stdin.

use std::io::BufRead;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use snippetbox_core::{Email, UserId};
use snippetbox_web::db::PgStorage;
use snippetbox_web::services::{AuthError, AuthService, CredentialHasher};

use super::{CommandError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password could not be read.
    #[error("Failed to read password from stdin: {0}")]
    Stdin(#[from] std::io::Error),

    /// Registration failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a new administrator account.
///
/// # Errors
///
/// Returns `AdminError` if the email is invalid, the password is too short,
/// the email is already registered or the database fails.
pub async fn create(email: &str, name: &str) -> Result<UserId, AdminError> {
    let email = Email::parse(email).map_err(|e| AdminError::InvalidEmail(e.to_string()))?;
    let password = read_password(std::io::stdin().lock())?;

    let pool = connect().await?;
    let storage = PgStorage::new(pool);
    let hasher = CredentialHasher::default();

    tracing::info!("Creating administrator: {}", email);
    let id = AuthService::new(&storage, &hasher)
        .register(name, &email, password.expose_secret(), true)
        .await?;

    tracing::info!("Administrator created successfully! ID: {}, Email: {}", id, email);
    Ok(id)
}

fn read_password(mut input: impl BufRead) -> Result<SecretString, std::io::Error> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned().into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_read_password_strips_newline() {
        let password = read_password("hunter2hunter2\r\n".as_bytes()).unwrap();
        assert_eq!(password.expose_secret(), "hunter2hunter2");
    }

    #[test]
    fn test_read_password_keeps_inner_spaces() {
        let password = read_password(" two words \n".as_bytes()).unwrap();
        assert_eq!(password.expose_secret(), " two words ");
    }
}
