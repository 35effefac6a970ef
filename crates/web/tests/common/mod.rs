//! Shared harness for router-level tests.
//!
//! Builds the real application router over an in-memory [`Storage`] that
//! counts calls and in-memory session stores for both scopes, then drives it
//! with `oneshot` while carrying cookies between requests like a browser.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use argon2::Params;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, cookie::Cookie};

use snippetbox_core::{Email, SnippetId, UserId};
use snippetbox_web::config::{SessionScopeConfig, WebConfig};
use snippetbox_web::db::{RepositoryError, Storage};
use snippetbox_web::models::{CredentialRecord, NewSnippet, NewUser, Snippet};
use snippetbox_web::services::CredentialHasher;
use snippetbox_web::state::AppState;

/// Raw CSRF token every test client presents, base64 encoded.
pub fn csrf_token() -> String {
    URL_SAFE_NO_PAD.encode([7u8; 32])
}

// =============================================================================
// Storage fake
// =============================================================================

struct StoredUser {
    id: UserId,
    email: Email,
    password_hash: String,
    is_admin: bool,
}

/// In-memory [`Storage`] that counts every call made through the trait.
///
/// `get_snippet` returns expired rows as-is so handlers' own expiry check is
/// exercised.
#[derive(Default)]
pub struct MemoryStorage {
    snippets: Mutex<Vec<Snippet>>,
    users: Mutex<Vec<StoredUser>>,
    inserted: Mutex<Vec<NewSnippet>>,
    calls: AtomicUsize,
}

impl MemoryStorage {
    /// Number of trait calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every snippet received through `insert_snippet`.
    pub fn inserted(&self) -> Vec<NewSnippet> {
        self.inserted.lock().unwrap().clone()
    }

    /// Number of stored accounts.
    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    /// Whether the stored account for `email` is an administrator.
    pub fn is_admin(&self, email: &str) -> Option<bool> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.as_str() == email)
            .map(|u| u.is_admin)
    }

    /// Store a snippet directly, bypassing the call counter.
    pub fn seed_snippet(
        &self,
        title: &str,
        created: DateTime<Utc>,
        expires: DateTime<Utc>,
    ) -> SnippetId {
        let mut snippets = self.snippets.lock().unwrap();
        let id = SnippetId::new(i32::try_from(snippets.len()).unwrap() + 1);
        snippets.push(Snippet {
            id,
            title: title.to_owned(),
            content: format!("{title} body"),
            created,
            expires,
        });
        id
    }

    /// Store an account directly, bypassing the unique-email check and the
    /// call counter.
    pub fn seed_user(&self, email: &str, password_hash: String, is_admin: bool) -> UserId {
        let mut users = self.users.lock().unwrap();
        let id = UserId::new(i32::try_from(users.len()).unwrap() + 1);
        users.push(StoredUser {
            id,
            email: Email::parse(email).unwrap(),
            password_hash,
            is_admin,
        });
        id
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.hit();
        Ok(())
    }

    async fn get_snippet(&self, id: SnippetId) -> Result<Option<Snippet>, RepositoryError> {
        self.hit();
        Ok(self
            .snippets
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn latest_snippets(&self, limit: i64) -> Result<Vec<Snippet>, RepositoryError> {
        self.hit();
        let now = Utc::now();
        let mut live: Vec<Snippet> = self
            .snippets
            .lock()
            .unwrap()
            .iter()
            .filter(|s| !s.is_expired_at(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created.cmp(&a.created));
        live.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(live)
    }

    async fn insert_snippet(&self, snippet: &NewSnippet) -> Result<SnippetId, RepositoryError> {
        self.hit();
        self.inserted.lock().unwrap().push(snippet.clone());
        let mut snippets = self.snippets.lock().unwrap();
        let id = SnippetId::new(i32::try_from(snippets.len()).unwrap() + 1);
        snippets.push(Snippet {
            id,
            title: snippet.title.clone(),
            content: snippet.content.clone(),
            created: snippet.created,
            expires: snippet.expires,
        });
        Ok(id)
    }

    async fn delete_snippet(&self, id: SnippetId) -> Result<bool, RepositoryError> {
        self.hit();
        let mut snippets = self.snippets.lock().unwrap();
        let before = snippets.len();
        snippets.retain(|s| s.id != id);
        Ok(snippets.len() != before)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<UserId, RepositoryError> {
        self.hit();
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.email.as_str().eq_ignore_ascii_case(user.email.as_str()))
        {
            return Err(RepositoryError::Conflict("email already exists".to_string()));
        }
        let id = UserId::new(i32::try_from(users.len()).unwrap() + 1);
        users.push(StoredUser {
            id,
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            is_admin: user.is_admin,
        });
        Ok(id)
    }

    async fn find_credential_record(
        &self,
        email: &Email,
        require_admin: bool,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        self.hit();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.email.as_str().eq_ignore_ascii_case(email.as_str()))
            .find(|u| u.is_admin || !require_admin)
            .map(|u| CredentialRecord {
                id: u.id,
                password_hash: u.password_hash.clone(),
                is_admin: u.is_admin,
            }))
    }
}

// =============================================================================
// Test application
// =============================================================================

/// Cheap Argon2 parameters so tests hash in microseconds.
pub fn fast_hasher() -> CredentialHasher {
    CredentialHasher::new(Params::new(8, 1, 1, None).unwrap())
}

fn test_config() -> WebConfig {
    WebConfig {
        database_url: "postgres://localhost/snippetbox_test".to_string().into(),
        addr: "127.0.0.1:0".parse().unwrap(),
        static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/static").into(),
        user_session: SessionScopeConfig::new(
            "uS3r$ecret!kQ9@zP4#mW7&vX2*nB5^hJ8".to_string().into(),
            false,
        ),
        admin_session: SessionScopeConfig::new(
            "aDm1n$ecret!tR6@yE3#oI0&pL9*cV1^gF4".to_string().into(),
            false,
        ),
        tls: None,
        sentry_dsn: None,
        sentry_environment: None,
        log_json: false,
    }
}

/// A collected response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// The application router plus a browser-like cookie jar.
pub struct TestApp {
    router: Router,
    pub storage: Arc<MemoryStorage>,
    pub hasher: CredentialHasher,
    cookies: BTreeMap<String, String>,
}

impl TestApp {
    pub fn new() -> Self {
        let storage = Arc::new(MemoryStorage::default());
        let hasher = fast_hasher();
        let state = AppState::new(storage.clone(), hasher.clone());
        let router = snippetbox_web::app(
            state,
            &test_config(),
            MemoryStore::default(),
            MemoryStore::default(),
        );

        let mut cookies = BTreeMap::new();
        cookies.insert("csrf_token".to_string(), csrf_token());

        Self {
            router,
            storage,
            hasher,
            cookies,
        }
    }

    /// Seed an account whose password is `password`.
    pub fn seed_user(&self, email: &str, password: &str, is_admin: bool) -> UserId {
        let hash = self.hasher.hash(password).unwrap();
        self.storage.seed_user(email, hash, is_admin)
    }

    /// Drop every cookie except the CSRF token, like a fresh browser session.
    pub fn clear_sessions(&mut self) {
        self.cookies.retain(|name, _| name == "csrf_token");
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();

        for value in headers.get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(value.to_str().unwrap().to_owned()).unwrap();
            let removed = cookie.value().is_empty()
                || cookie.max_age().is_some_and(|age| age.is_zero());
            if removed {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_owned(), cookie.value().to_owned());
            }
        }

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = Request::get(path)
            .header(header::COOKIE, self.cookie_header())
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// POST a url-encoded form carrying the CSRF token as a hidden field.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let token = csrf_token();
        let mut with_token = fields.to_vec();
        with_token.push(("csrf_token", token.as_str()));
        self.post_raw(path, &with_token).await
    }

    /// POST a url-encoded form exactly as given, without adding a CSRF token.
    pub async fn post_raw(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::post(path)
            .header(header::COOKIE, self.cookie_header())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_form("/user/login", &[("email", email), ("password", password)])
            .await
    }

    /// Seed a regular account and log in with it.
    pub async fn logged_in_user(&mut self) -> UserId {
        let id = self.seed_user("alice@example.com", "correct horse", false);
        let response = self.login("alice@example.com", "correct horse").await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        id
    }

    /// Seed an administrator account and log in with it.
    pub async fn logged_in_admin(&mut self) -> UserId {
        let id = self.seed_user("root@example.com", "battery staple", true);
        let response = self.login("root@example.com", "battery staple").await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        id
    }
}
