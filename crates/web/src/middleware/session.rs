//! Session scopes.
//!
//! A browser carries two independent sessions: one for the user track and
//! one for the administrator track. Each has its own cookie, signing key and
//! store table, and neither reads the other's cookie.
//!
//! Both are served by one generic type, [`ScopedSession<S>`], parameterized by
//! a zero-sized [`SessionScope`] marker. `tower-sessions` always publishes the
//! loaded session as a bare [`Session`] request extension, so every session
//! manager layer is paired with a [`rescope`] layer that moves the bare
//! session into its typed slot before the next manager runs.
//!
//! Layer order, outermost first:
//!
//! ```text
//! user SessionManagerLayer -> rescope::<UserScope> -> admin SessionManagerLayer -> rescope::<AdminScope> -> router
//! ```

use std::marker::PhantomData;

use axum::{
    Router,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::{Next, from_fn},
    response::Response,
};
use secrecy::ExposeSecret;
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer, SessionStore, cookie::Key};
use tower_sessions_sqlx_store::PostgresStore;

use snippetbox_core::UserId;

use crate::config::SessionScopeConfig;
use crate::error::AppError;
use crate::models::session_keys;

/// Session store failure in a named scope.
#[derive(Debug, thiserror::Error)]
#[error("{scope} session store failed: {source}")]
pub struct SessionError {
    scope: &'static str,
    source: tower_sessions::session::Error,
}

/// A cookie scope with its own identity marker.
pub trait SessionScope: Send + Sync + 'static {
    /// Human-readable scope name used in logs.
    const NAME: &'static str;
    /// Cookie carrying this scope's session id.
    const COOKIE_NAME: &'static str;
    /// Key whose presence means the caller is authenticated in this scope.
    const MARKER_KEY: &'static str;
    /// Store table for this scope's records.
    const TABLE_NAME: &'static str;
}

/// The user session scope.
#[derive(Debug)]
pub enum UserScope {}

impl SessionScope for UserScope {
    const NAME: &'static str = "user";
    const COOKIE_NAME: &'static str = "snippetbox_session";
    const MARKER_KEY: &'static str = session_keys::CURRENT_USER_ID;
    const TABLE_NAME: &'static str = "user_sessions";
}

/// The administrator session scope.
#[derive(Debug)]
pub enum AdminScope {}

impl SessionScope for AdminScope {
    const NAME: &'static str = "admin";
    const COOKIE_NAME: &'static str = "snippetbox_admin_session";
    const MARKER_KEY: &'static str = session_keys::CURRENT_ADMIN_ID;
    const TABLE_NAME: &'static str = "admin_sessions";
}

/// A session bound to one scope.
///
/// Also an extractor: handlers take `UserSession` or `AdminSession` directly.
pub struct ScopedSession<S> {
    session: Session,
    _scope: PhantomData<fn() -> S>,
}

/// Session of the user track.
pub type UserSession = ScopedSession<UserScope>;

/// Session of the administrator track.
pub type AdminSession = ScopedSession<AdminScope>;

impl<S> Clone for ScopedSession<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            _scope: PhantomData,
        }
    }
}

impl<S: SessionScope> ScopedSession<S> {
    /// Bind a loaded session to this scope.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self {
            session,
            _scope: PhantomData,
        }
    }

    const fn fail(source: tower_sessions::session::Error) -> SessionError {
        SessionError {
            scope: S::NAME,
            source,
        }
    }

    /// Read a typed value.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails or the value has another type.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        self.session.get(key).await.map_err(Self::fail)
    }

    /// Write a typed value. Creates the session on first write.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn insert<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: T,
    ) -> Result<(), SessionError> {
        self.session.insert(key, value).await.map_err(Self::fail)
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.session
            .remove_value(key)
            .await
            .map(|_| ())
            .map_err(Self::fail)
    }

    /// Whether a key is present. Expired sessions report `false`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn exists(&self, key: &str) -> Result<bool, SessionError> {
        self.session
            .get_value(key)
            .await
            .map(|value| value.is_some())
            .map_err(Self::fail)
    }

    /// Remove a string and return it. A second call returns `None`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn pop_string(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.session.remove::<String>(key).await.map_err(Self::fail)
    }

    /// Store a message for the next rendered page, replacing any pending one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn flash(&self, message: &str) -> Result<(), SessionError> {
        self.insert(session_keys::FLASH, message).await
    }

    /// Take the pending flash message.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn take_flash(&self) -> Result<Option<String>, SessionError> {
        self.pop_string(session_keys::FLASH).await
    }

    /// Whether the scope's identity marker is set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn is_authenticated(&self) -> Result<bool, SessionError> {
        self.exists(S::MARKER_KEY).await
    }

    /// The id stored under the identity marker.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn current_id(&self) -> Result<Option<UserId>, SessionError> {
        self.get(S::MARKER_KEY).await
    }

    /// Set the identity marker under a fresh session id.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn log_in(&self, id: UserId) -> Result<(), SessionError> {
        self.session.cycle_id().await.map_err(Self::fail)?;
        self.insert(S::MARKER_KEY, id).await
    }

    /// Remove the identity marker.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store fails.
    pub async fn log_out(&self) -> Result<(), SessionError> {
        self.delete(S::MARKER_KEY).await
    }
}

impl<S, St> FromRequestParts<St> for ScopedSession<S>
where
    S: SessionScope,
    St: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("{} session layer missing", S::NAME)))
    }
}

/// Move the bare [`Session`] published by the scope's manager into its typed slot.
///
/// # Errors
///
/// Returns `AppError::Internal` if no session manager ran before this layer.
pub async fn rescope<S: SessionScope>(
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = request
        .extensions_mut()
        .remove::<Session>()
        .ok_or_else(|| AppError::Internal(format!("{} session layer missing", S::NAME)))?;
    request
        .extensions_mut()
        .insert(ScopedSession::<S>::new(session));
    Ok(next.run(request).await)
}

/// Derive a 64-byte cookie signing key from a configured secret.
fn signing_key(config: &SessionScopeConfig) -> Key {
    let digest = Sha512::digest(config.secret.expose_secret().as_bytes());
    Key::from(digest.as_slice())
}

/// `PostgreSQL` session store writing to the scope's own table.
///
/// # Panics
///
/// Panics if the table name is invalid (never happens with the hardcoded
/// scope table names).
#[must_use]
pub fn postgres_store<S: SessionScope>(pool: &PgPool) -> PostgresStore {
    PostgresStore::new(pool.clone())
        .with_table_name(S::TABLE_NAME)
        .expect("valid table name")
}

/// Wrap `router` in one scope's session manager and its [`rescope`] layer.
pub fn layer_scope<S, Store, St>(
    router: Router<St>,
    store: Store,
    config: &SessionScopeConfig,
) -> Router<St>
where
    S: SessionScope,
    Store: SessionStore + Clone,
    St: Clone + Send + Sync + 'static,
{
    let expiry = if config.persist {
        Expiry::OnInactivity(config.lifetime)
    } else {
        Expiry::OnSessionEnd
    };

    let manager = SessionManagerLayer::new(store)
        .with_name(S::COOKIE_NAME)
        .with_expiry(expiry)
        .with_secure(config.secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config));

    router.layer(from_fn(rescope::<S>)).layer(manager)
}

/// Install both session scopes around `router`.
///
/// The user scope is outermost.
pub fn with_session_scopes<UserStore, AdminStore, St>(
    router: Router<St>,
    user_store: UserStore,
    user_config: &SessionScopeConfig,
    admin_store: AdminStore,
    admin_config: &SessionScopeConfig,
) -> Router<St>
where
    UserStore: SessionStore + Clone,
    AdminStore: SessionStore + Clone,
    St: Clone + Send + Sync + 'static,
{
    let router = layer_scope::<AdminScope, _, _>(router, admin_store, admin_config);
    layer_scope::<UserScope, _, _>(router, user_store, user_config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;
    use tower_sessions::cookie::time::{Duration, OffsetDateTime};

    use super::*;

    fn user_session() -> UserSession {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        ScopedSession::new(session)
    }

    #[tokio::test]
    async fn test_flash_pops_exactly_once() {
        let session = user_session();
        session.flash("saved").await.unwrap();

        assert_eq!(session.take_flash().await.unwrap().as_deref(), Some("saved"));
        assert_eq!(session.take_flash().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flash_keeps_only_latest() {
        let session = user_session();
        session.flash("first").await.unwrap();
        session.flash("second").await.unwrap();

        assert_eq!(session.take_flash().await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_marker_round_trip() {
        let session = user_session();
        assert!(!session.is_authenticated().await.unwrap());

        session.log_in(UserId::new(7)).await.unwrap();
        assert!(session.is_authenticated().await.unwrap());
        assert_eq!(session.current_id().await.unwrap(), Some(UserId::new(7)));

        session.log_out().await.unwrap();
        assert!(!session.is_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn test_scopes_use_distinct_markers() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let admin: AdminSession = ScopedSession::new(session.clone());
        let user: UserSession = ScopedSession::new(session);

        admin.log_in(UserId::new(1)).await.unwrap();
        assert!(admin.is_authenticated().await.unwrap());
        assert!(!user.is_authenticated().await.unwrap());
    }

    /// Log in under `expiry`, save, then load the record again by id.
    async fn reload_after_login(expiry: Expiry) -> UserSession {
        let store = Arc::new(MemoryStore::default());
        let session = Session::new(None, store.clone(), Some(expiry));
        let user: UserSession = ScopedSession::new(session.clone());
        user.log_in(UserId::new(3)).await.unwrap();
        session.save().await.unwrap();

        let id = session.id().unwrap();
        ScopedSession::new(Session::new(Some(id), store, None))
    }

    #[tokio::test]
    async fn test_expired_session_is_not_authenticated() {
        let past = OffsetDateTime::now_utc() - Duration::hours(1);
        let reloaded = reload_after_login(Expiry::AtDateTime(past)).await;

        assert!(!reloaded.is_authenticated().await.unwrap());
        assert!(!reloaded.exists(UserScope::MARKER_KEY).await.unwrap());
        assert_eq!(reloaded.current_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unexpired_session_stays_authenticated() {
        let future = OffsetDateTime::now_utc() + Duration::hours(1);
        let reloaded = reload_after_login(Expiry::AtDateTime(future)).await;

        assert!(reloaded.is_authenticated().await.unwrap());
        assert_eq!(reloaded.current_id().await.unwrap(), Some(UserId::new(3)));
    }

    #[test]
    fn test_signing_keys_differ_per_secret() {
        let a = SessionScopeConfig::new("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6".to_string().into(), false);
        let b = SessionScopeConfig::new("Zq8%vN1!hJ4@sD7#fG0&kL3*pO6^wE9".to_string().into(), false);
        assert_ne!(signing_key(&a).master(), signing_key(&b).master());
    }
}
