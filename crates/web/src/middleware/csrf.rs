//! CSRF protection using the double-submit cookie pattern.
//!
//! A random 32-byte token lives in the `csrf_token` cookie. Safe requests
//! receive the cookie if missing and expose a freshly masked copy of the token
//! to templates through the [`CsrfToken`] extractor. Unsafe requests must
//! submit the token back in the `X-CSRF-Token` header or in the `csrf_token`
//! form field; otherwise they are rejected with `400 Bad Request` before the
//! handler runs.
//!
//! Masking XORs the token with a one-time pad on every render, so the value
//! embedded in a page never repeats and does not leak the cookie through
//! compression side channels.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE, VARY},
        request::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use crate::error::AppError;

/// Cookie holding the raw token.
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Form field carrying the submitted token.
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Header carrying the submitted token.
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

const TOKEN_LEN: usize = 32;
const COOKIE_MAX_AGE_DAYS: i64 = 365;

/// Largest form body the guard will buffer while looking for the token.
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

type RawToken = [u8; TOKEN_LEN];

/// CSRF guard settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsrfConfig {
    /// Whether the token cookie carries the `Secure` attribute.
    pub secure: bool,
}

/// Masked token for embedding in forms.
#[derive(Debug, Clone)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Get the token value for use in templates.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| AppError::Internal("CSRF guard not installed".to_string()))
    }
}

/// Middleware enforcing the token on unsafe methods.
///
/// Install with `axum::middleware::from_fn_with_state(CsrfConfig { .. }, csrf_guard)`.
pub async fn csrf_guard(
    State(config): State<CsrfConfig>,
    request: Request,
    next: Next,
) -> Response {
    let existing = cookie_token(request.headers());

    let mut request = if is_safe_method(request.method()) {
        request
    } else {
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        let (request, submitted) = match submitted_token(request).await {
            Ok(found) => found,
            Err(response) => return response,
        };

        let valid = match (&existing, submitted) {
            (Some(expected), Some(submitted)) => tokens_match(expected, &submitted),
            _ => false,
        };

        if !valid {
            tracing::warn!(%method, %path, "CSRF token missing or invalid");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }

        request
    };

    let (token, issued) = existing.map_or_else(|| (generate_token(), true), |token| (token, false));
    request
        .extensions_mut()
        .insert(CsrfToken(mask_token(&token)));

    let mut response = next.run(request).await;

    if issued && let Ok(value) = HeaderValue::from_str(&token_cookie(&token, config).to_string()) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
        .headers_mut()
        .append(VARY, HeaderValue::from_static("Cookie"));

    response
}

fn is_safe_method(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE].contains(method)
}

fn generate_token() -> RawToken {
    let mut token = [0u8; TOKEN_LEN];
    rand::rng().fill_bytes(&mut token);
    token
}

fn token_cookie(token: &RawToken, config: CsrfConfig) -> Cookie<'static> {
    Cookie::build((CSRF_COOKIE_NAME, URL_SAFE_NO_PAD.encode(token)))
        .http_only(true)
        .secure(config.secure)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(Duration::days(COOKIE_MAX_AGE_DAYS))
        .build()
}

/// Read the raw token from the request cookies, ignoring malformed values.
fn cookie_token(headers: &HeaderMap) -> Option<RawToken> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == CSRF_COOKIE_NAME)
        .and_then(|cookie| URL_SAFE_NO_PAD.decode(cookie.value()).ok())
        .and_then(|bytes| RawToken::try_from(bytes.as_slice()).ok())
}

/// `pad ‖ (pad XOR token)`, base64 encoded.
fn mask_token(token: &RawToken) -> String {
    let pad = generate_token();
    let mut masked = Vec::with_capacity(TOKEN_LEN * 2);
    masked.extend_from_slice(&pad);
    masked.extend(pad.iter().zip(token).map(|(p, t)| p ^ t));
    URL_SAFE_NO_PAD.encode(masked)
}

/// Decode a submitted token, accepting either the masked or the raw form.
fn unmask_token(submitted: &str) -> Option<RawToken> {
    let bytes = URL_SAFE_NO_PAD.decode(submitted.trim()).ok()?;
    match bytes.len() {
        TOKEN_LEN => RawToken::try_from(bytes.as_slice()).ok(),
        len if len == TOKEN_LEN * 2 => {
            let (pad, masked) = bytes.split_at(TOKEN_LEN);
            let mut token = [0u8; TOKEN_LEN];
            for ((out, p), m) in token.iter_mut().zip(pad).zip(masked) {
                *out = p ^ m;
            }
            Some(token)
        }
        _ => None,
    }
}

fn tokens_match(expected: &RawToken, submitted: &str) -> bool {
    unmask_token(submitted).is_some_and(|token| {
        expected
            .iter()
            .zip(token.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    })
}

/// Find the submitted token in the header or the url-encoded form body.
///
/// The body is buffered and put back so the handler can still read it.
async fn submitted_token(request: Request) -> Result<(Request, Option<String>), Response> {
    if let Some(token) = request
        .headers()
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok())
    {
        let token = token.to_owned();
        return Ok((request, Some(token)));
    }

    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if !is_form {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes: Bytes = axum::body::to_bytes(body, MAX_FORM_BYTES)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "failed to buffer form body");
            (StatusCode::BAD_REQUEST, "Bad Request").into_response()
        })?;

    let token = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FORM_FIELD)
        .map(|(_, value)| value.into_owned());

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}
