//! Session table maintenance.
//!
//! Expired rows are skipped when a session loads but are never removed by the
//! web server. Run `sessions prune` from cron or a systemd timer to delete them.
//!
//! # Environment Variables
//!
//! - `SNIPPETBOX_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

use thiserror::Error;
use tower_sessions::session_store::{self, ExpiredDeletion};

use snippetbox_web::middleware::{AdminScope, SessionScope, UserScope, postgres_store};

use super::{CommandError, connect};

/// Errors that can occur while pruning.
#[derive(Debug, Error)]
pub enum PruneError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Pruning expired sessions failed for {scope}: {source}")]
    Store {
        scope: &'static str,
        source: session_store::Error,
    },
}

/// Delete expired sessions of both cookie scopes.
///
/// # Errors
///
/// Returns `PruneError` if connecting or either deletion fails.
pub async fn prune() -> Result<(), PruneError> {
    let pool = connect().await?;

    prune_scope::<UserScope>(&pool).await?;
    prune_scope::<AdminScope>(&pool).await?;

    tracing::info!("Expired sessions pruned");
    Ok(())
}

async fn prune_scope<S: SessionScope>(pool: &sqlx::PgPool) -> Result<(), PruneError> {
    tracing::info!(scope = S::NAME, table = S::TABLE_NAME, "Deleting expired sessions...");
    postgres_store::<S>(pool)
        .delete_expired()
        .await
        .map_err(|source| PruneError::Store {
            scope: S::NAME,
            source,
        })
}
