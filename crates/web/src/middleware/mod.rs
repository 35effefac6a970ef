//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request logging)
//! 3. Timeout (10 seconds)
//! 4. Request ID (add unique ID to each request)
//! 5. Security headers
//! 6. User session scope, then admin session scope
//! 7. Per route group: access gate, then CSRF guard

pub mod auth;
pub mod csrf;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{LOGIN_PATH, require_admin, require_user};
pub use csrf::{CsrfConfig, CsrfToken, csrf_guard};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{
    AdminScope, AdminSession, ScopedSession, SessionError, SessionScope, UserScope, UserSession,
    postgres_store, with_session_scopes,
};
