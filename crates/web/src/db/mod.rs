//! Storage for snippets and user accounts.
//!
//! # Tables
//!
//! - `snippets` - Snippet bodies with creation and expiry times
//! - `users` - Accounts with unique email and an administrator flag
//! - `user_sessions`, `admin_sessions` - Tower-sessions storage, one per scope
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p snippetbox-cli -- migrate
//! ```
//!
//! Handlers talk to storage through the object-safe [`Storage`] trait so that
//! router tests can swap in an in-memory implementation.

pub mod snippets;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use snippetbox_core::{Email, SnippetId, UserId};

use crate::models::{CredentialRecord, NewSnippet, NewUser, Snippet};

pub use snippets::SnippetRepository;
pub use users::UserRepository;

/// Number of snippets shown on listing pages.
pub const LATEST_SNIPPETS_LIMIT: i64 = 10;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Persistent storage of snippets and credential records.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Check that storage is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Fetch an unexpired snippet by ID.
    async fn get_snippet(&self, id: SnippetId) -> Result<Option<Snippet>, RepositoryError>;

    /// The newest unexpired snippets, most recent first.
    async fn latest_snippets(&self, limit: i64) -> Result<Vec<Snippet>, RepositoryError>;

    /// Insert a snippet and return its ID.
    async fn insert_snippet(&self, snippet: &NewSnippet) -> Result<SnippetId, RepositoryError>;

    /// Delete a snippet. Returns `false` if no row had that ID.
    async fn delete_snippet(&self, id: SnippetId) -> Result<bool, RepositoryError>;

    /// Insert an account.
    ///
    /// Fails with [`RepositoryError::Conflict`] if the email is taken in any
    /// letter case.
    async fn insert_user(&self, user: &NewUser) -> Result<UserId, RepositoryError>;

    /// Find the credential record for `email`, restricted to administrators
    /// when `require_admin` is set.
    async fn find_credential_record(
        &self,
        email: &Email,
        require_admin: bool,
    ) -> Result<Option<CredentialRecord>, RepositoryError>;
}

/// [`Storage`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_snippet(&self, id: SnippetId) -> Result<Option<Snippet>, RepositoryError> {
        SnippetRepository::new(&self.pool).get(id).await
    }

    async fn latest_snippets(&self, limit: i64) -> Result<Vec<Snippet>, RepositoryError> {
        SnippetRepository::new(&self.pool).latest(limit).await
    }

    async fn insert_snippet(&self, snippet: &NewSnippet) -> Result<SnippetId, RepositoryError> {
        SnippetRepository::new(&self.pool).insert(snippet).await
    }

    async fn delete_snippet(&self, id: SnippetId) -> Result<bool, RepositoryError> {
        SnippetRepository::new(&self.pool).delete(id).await
    }

    async fn insert_user(&self, user: &NewUser) -> Result<UserId, RepositoryError> {
        UserRepository::new(&self.pool).insert(user).await
    }

    async fn find_credential_record(
        &self,
        email: &Email,
        require_admin: bool,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        UserRepository::new(&self.pool)
            .find_credential_record(email, require_admin)
            .await
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
