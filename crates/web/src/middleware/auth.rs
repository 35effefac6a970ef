//! Access gates.
//!
//! Route layers that let a request through only when the matching session
//! scope carries its identity marker. Anything else is redirected to the
//! login page and the wrapped handler never runs.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::AppError;
use crate::middleware::session::{AdminScope, ScopedSession, SessionScope, UserScope};

/// Where unauthenticated requests are sent.
pub const LOGIN_PATH: &str = "/user/login";

async fn gate<S: SessionScope>(request: Request, next: Next) -> Result<Response, AppError> {
    let session = request
        .extensions()
        .get::<ScopedSession<S>>()
        .cloned()
        .ok_or_else(|| AppError::Internal(format!("{} session layer missing", S::NAME)))?;

    if !session.is_authenticated().await? {
        tracing::info!(
            scope = S::NAME,
            path = %request.uri().path(),
            "unauthenticated request redirected to login"
        );
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    }

    Ok(next.run(request).await)
}

/// Require a logged-in user (`currentUserID` in the user scope).
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn require_user(request: Request, next: Next) -> Result<Response, AppError> {
    gate::<UserScope>(request, next).await
}

/// Require a logged-in administrator (`currentAdminID` in the admin scope).
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    gate::<AdminScope>(request, next).await
}
