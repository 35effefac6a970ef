//! Integration tests for the CSRF guard, security headers and health checks.

#![allow(clippy::unwrap_used)]

mod common;

use axum::http::{StatusCode, header};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use common::TestApp;

// =============================================================================
// CSRF
// =============================================================================

#[tokio::test]
async fn test_missing_token_rejected_before_handler() {
    let mut app = TestApp::new();
    app.logged_in_user().await;
    let before = app.storage.calls();

    let response = app
        .post_raw(
            "/snippet/new",
            &[("title", "Test"), ("content", "Body"), ("expires", "3600")],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.storage.calls(), before);
    assert!(app.storage.inserted().is_empty());
}

#[tokio::test]
async fn test_wrong_token_rejected_before_handler() {
    let mut app = TestApp::new();
    app.seed_user("alice@example.com", "correct horse", false);
    let before = app.storage.calls();
    let forged = URL_SAFE_NO_PAD.encode([9u8; 32]);

    let response = app
        .post_raw(
            "/user/login",
            &[
                ("email", "alice@example.com"),
                ("password", "correct horse"),
                ("csrf_token", forged.as_str()),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.storage.calls(), before);
}

#[tokio::test]
async fn test_forms_embed_masked_token() {
    let mut app = TestApp::new();

    let page = app.get("/user/login").await;

    assert!(page.body.contains("name=\"csrf_token\""));
    // Masked tokens are never the raw cookie value.
    assert!(!page.body.contains(&common::csrf_token()));
}

#[tokio::test]
async fn test_fresh_client_receives_token_cookie() {
    let mut app = TestApp::new();
    app.clear_sessions();

    let request = axum::http::Request::get("/")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;

    let cookies: Vec<_> = response
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("csrf_token=")));
}

// =============================================================================
// Headers and health
// =============================================================================

#[tokio::test]
async fn test_security_headers_present() {
    let mut app = TestApp::new();

    let response = app.get("/").await;

    assert_eq!(response.headers.get("x-frame-options").unwrap(), "deny");
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();

    let live = app.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_session_cookies_are_scoped() {
    let mut app = TestApp::new();
    app.seed_user("root@example.com", "battery staple", true);

    let response = app.login("root@example.com", "battery staple").await;

    let cookies: Vec<_> = response
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("snippetbox_admin_session=")));
    assert!(!cookies.iter().any(|c| c.starts_with("snippetbox_session=")));
}

#[tokio::test]
async fn test_session_cookie_lives_twelve_hours() {
    let mut app = TestApp::new();
    app.seed_user("alice@example.com", "correct horse", false);

    let response = app.login("alice@example.com", "correct horse").await;

    let cookie = response
        .headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with("snippetbox_session="))
        .unwrap();
    let max_age: i64 = cookie
        .split(';')
        .find_map(|attr| attr.trim().strip_prefix("Max-Age="))
        .unwrap()
        .parse()
        .unwrap();
    assert!((43_190..=43_200).contains(&max_age), "Max-Age was {max_age}");
}
