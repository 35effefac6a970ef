//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (storage reachable)
//! GET  /static/*               - Static assets
//!
//! # Public (CSRF guarded)
//! GET  /                       - Latest snippets
//! GET  /user/signup            - Signup page
//! POST /user/signup            - Signup action
//! GET  /user/login             - Login page
//! POST /user/login             - Login action
//!
//! # User (gate, then CSRF guard)
//! GET  /snippet/new            - New snippet page
//! POST /snippet/new            - Create snippet
//! GET  /snippet/{id}           - Show snippet
//! POST /user/logout            - Logout action
//!
//! # Admin (gate, then CSRF guard)
//! GET  /snippet/delete         - Delete snippet page
//! POST /snippet/delete         - Delete snippet
//! GET  /admin/signup           - Admin signup page
//! POST /admin/signup           - Admin signup action
//! ```

pub mod admin;
pub mod snippets;
pub mod users;

use std::net::SocketAddr;
use std::time::Duration;

use askama::Template;
use axum::{
    Router,
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{Request, StatusCode, request::Parts},
    middleware::{from_fn, from_fn_with_state},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::config::WebConfig;
use crate::error::AppError;
use crate::middleware::{
    AdminSession, CsrfConfig, CsrfToken, UserSession, csrf_guard, request_id_middleware,
    require_admin, require_user, security_headers_middleware, with_session_scopes,
};
use crate::state::AppState;

/// Requests running longer than this are answered with 408.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Data every page template receives.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Masked CSRF token for forms.
    pub csrf_token: String,
    /// Request path, used to highlight the current nav link.
    pub path: String,
    /// Pending flash message, removed from the session once read.
    pub flash: Option<String>,
    /// Whether the user scope carries its marker.
    pub logged_in: bool,
    /// Whether the admin scope carries its marker.
    pub admin_logged_in: bool,
}

/// Per-request handle on everything a page needs.
///
/// Building the [`PageContext`] pops the flash, so handlers that redirect
/// never call [`Page::context`] and the message survives to the next page.
pub struct Page {
    csrf: CsrfToken,
    path: String,
    user: UserSession,
    admin: AdminSession,
}

impl Page {
    /// The user session scope.
    #[must_use]
    pub const fn user(&self) -> &UserSession {
        &self.user
    }

    /// The admin session scope.
    #[must_use]
    pub const fn admin(&self) -> &AdminSession {
        &self.admin
    }

    /// Collect the template data bag.
    ///
    /// The user scope's flash wins over the admin scope's.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if either session store fails.
    pub async fn context(&self) -> Result<PageContext, AppError> {
        let flash = match self.user.take_flash().await? {
            Some(flash) => Some(flash),
            None => self.admin.take_flash().await?,
        };

        Ok(PageContext {
            csrf_token: self.csrf.value().to_owned(),
            path: self.path.clone(),
            flash,
            logged_in: self.user.is_authenticated().await?,
            admin_logged_in: self.admin.is_authenticated().await?,
        })
    }
}

impl<S> FromRequestParts<S> for Page
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            csrf: CsrfToken::from_request_parts(parts, state).await?,
            path: parts.uri.path().to_owned(),
            user: UserSession::from_request_parts(parts, state).await?,
            admin: AdminSession::from_request_parts(parts, state).await?,
        })
    }
}

/// Render a template into an HTML response.
///
/// # Errors
///
/// Returns `AppError::Render` if the template fails.
pub fn render(template: &impl Template) -> Result<Response, AppError> {
    Ok(Html(template.render()?).into_response())
}

/// Create the page routes, each group wrapped in its gate and the CSRF guard.
pub fn routes(csrf: CsrfConfig) -> Router<AppState> {
    let guard = from_fn_with_state(csrf, csrf_guard);

    let public = Router::new()
        .route("/", get(snippets::home))
        .route("/user/signup", get(users::signup_page).post(users::signup))
        .route("/user/login", get(users::login_page).post(users::login))
        .route_layer(guard.clone());

    let user = Router::new()
        .route("/snippet/new", get(snippets::new_page).post(snippets::create))
        .route("/snippet/{id}", get(snippets::show))
        .route("/user/logout", post(users::logout))
        .route_layer(guard.clone())
        .route_layer(from_fn(require_user));

    let admin = Router::new()
        .route("/snippet/delete", get(admin::delete_page).post(admin::delete))
        .route("/admin/signup", get(admin::signup_page).post(admin::signup))
        .route_layer(guard)
        .route_layer(from_fn(require_admin));

    public.merge(user).merge(admin)
}

/// Build the full application: routes, static files, both session scopes,
/// security headers, request IDs, the timeout and request logging.
pub fn app<UserStore, AdminStore>(
    state: AppState,
    config: &WebConfig,
    user_store: UserStore,
    admin_store: AdminStore,
) -> Router
where
    UserStore: SessionStore + Clone,
    AdminStore: SessionStore + Clone,
{
    let router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes(CsrfConfig {
            secure: config.secure_cookies(),
        }))
        .nest_service("/static", ServeDir::new(&config.static_dir));

    with_session_scopes(
        router,
        user_store,
        &config.user_session,
        admin_store,
        &config.admin_session,
    )
    .layer(from_fn(security_headers_middleware))
    .layer(from_fn(request_id_middleware))
    .layer(timeout_layer())
    .layer(
        TraceLayer::new_for_http()
            .make_span_with(make_request_span)
            .on_request(|request: &Request<Body>, _span: &Span| {
                tracing::info!(
                    method = %request.method(),
                    path = %request.uri().path(),
                    version = ?request.version(),
                    "request started"
                );
            })
            .on_response(
                |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                },
            ),
    )
    .with_state(state)
}

/// Cut requests off after [`REQUEST_TIMEOUT`] with 408.
fn timeout_layer() -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT)
}

fn make_request_span(request: &Request<Body>) -> Span {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        version = ?request.version(),
        remote_addr = remote_addr.as_deref().unwrap_or("-"),
        request_id = tracing::field::Empty,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if storage is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.storage().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
