//! Snippet repository.
//!
//! Queries are checked at runtime; expired rows are filtered in SQL so that
//! an expired snippet is indistinguishable from a missing one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use snippetbox_core::SnippetId;

use super::RepositoryError;
use crate::models::{NewSnippet, Snippet};

#[derive(sqlx::FromRow)]
struct SnippetRow {
    id: SnippetId,
    title: String,
    content: String,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
}

impl From<SnippetRow> for Snippet {
    fn from(row: SnippetRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            created: row.created,
            expires: row.expires,
        }
    }
}

/// Repository for snippet database operations.
pub struct SnippetRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SnippetRepository<'a> {
    /// Create a new snippet repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an unexpired snippet by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SnippetId) -> Result<Option<Snippet>, RepositoryError> {
        let row = sqlx::query_as::<_, SnippetRow>(
            r"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW() AND id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Snippet::from))
    }

    /// Get the newest unexpired snippets.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest(&self, limit: i64) -> Result<Vec<Snippet>, RepositoryError> {
        let rows = sqlx::query_as::<_, SnippetRow>(
            r"
            SELECT id, title, content, created, expires
            FROM snippets
            WHERE expires > NOW()
            ORDER BY created DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Snippet::from).collect())
    }

    /// Insert a snippet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(&self, snippet: &NewSnippet) -> Result<SnippetId, RepositoryError> {
        let id: SnippetId = sqlx::query_scalar(
            r"
            INSERT INTO snippets (title, content, created, expires)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(&snippet.title)
        .bind(&snippet.content)
        .bind(snippet.created)
        .bind(snippet.expires)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Delete a snippet by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: SnippetId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM snippets WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
