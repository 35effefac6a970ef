//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::Storage;
use crate::services::auth::{AuthService, CredentialHasher};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; everything inside is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    storage: Arc<dyn Storage>,
    hasher: CredentialHasher,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, hasher: CredentialHasher) -> Self {
        Self {
            inner: Arc::new(AppStateInner { storage, hasher }),
        }
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        self.inner.storage.as_ref()
    }

    /// Get a reference to the password hasher.
    #[must_use]
    pub fn hasher(&self) -> &CredentialHasher {
        &self.inner.hasher
    }

    /// Authentication service over this state's storage and hasher.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.storage(), self.hasher())
    }
}
