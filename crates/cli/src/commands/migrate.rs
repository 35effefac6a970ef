//! Database migration command.
//!
//! Applies the schema migrations in `crates/web/migrations/`, then creates
//! the session tables of both cookie scopes.
//!
//! # Environment Variables
//!
//! - `SNIPPETBOX_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use thiserror::Error;

use snippetbox_web::middleware::{AdminScope, SessionScope, UserScope, postgres_store};

use super::{CommandError, connect};

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session table migration failed for {scope}: {source}")]
    SessionTable {
        scope: &'static str,
        source: sqlx::Error,
    },
}

/// Run all migrations.
///
/// # Errors
///
/// Returns `MigrationError` if connecting or any migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running schema migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    migrate_session_table::<UserScope>(&pool).await?;
    migrate_session_table::<AdminScope>(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

async fn migrate_session_table<S: SessionScope>(pool: &sqlx::PgPool) -> Result<(), MigrationError> {
    tracing::info!(scope = S::NAME, table = S::TABLE_NAME, "Creating session table...");
    postgres_store::<S>(pool)
        .migrate()
        .await
        .map_err(|source| MigrationError::SessionTable {
            scope: S::NAME,
            source,
        })
}
