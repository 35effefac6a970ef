//! User repository for database operations.

use sqlx::PgPool;

use snippetbox_core::{Email, UserId};

use super::RepositoryError;
use crate::models::{CredentialRecord, NewUser};

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id: UserId,
    hashed_password: String,
    admin: bool,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists in any
    /// letter case. Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, user: &NewUser) -> Result<UserId, RepositoryError> {
        let id: UserId = sqlx::query_scalar(
            r"
            INSERT INTO users (name, email, hashed_password, admin, created)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id
            ",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(id)
    }

    /// Look up the credential record for an email, ignoring letter case.
    ///
    /// With `require_admin` only administrator accounts match.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_credential_record(
        &self,
        email: &Email,
        require_admin: bool,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, hashed_password, admin
            FROM users
            WHERE lower(email) = lower($1) AND (admin OR NOT $2)
            ",
        )
        .bind(email)
        .bind(require_admin)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| CredentialRecord {
            id: r.id,
            password_hash: r.hashed_password,
            is_admin: r.admin,
        }))
    }
}
