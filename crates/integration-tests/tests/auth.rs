//! Sign-in, sign-up and token refresh through the full router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use bizgrow_integration_tests::TestApp;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const REFRESHED_TOKEN: &str = "refreshed-access-token";

#[tokio::test]
async fn wrong_password_shows_invalid_credentials() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .post_form("/auth/login", "email=ravi%40example.in&password=not-the-password")
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location(),
        Some("/auth?mode=login&error=invalid_credentials")
    );

    let page = app.get("/auth?mode=login&error=invalid_credentials").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Invalid email or password"));

    let dashboard = app.get("/dashboard").await;
    assert_eq!(dashboard.location(), Some("/auth?mode=login"));
}

#[tokio::test]
async fn sign_up_awaiting_confirmation_asks_to_check_email() {
    let mut app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": app.user_id.to_string(),
            "email": "meena@example.in",
            "confirmation_sent_at": "2026-10-16T09:00:00Z",
            "user_metadata": { "full_name": "Meena Iyer" }
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app
        .post_form(
            "/auth/signup",
            "full_name=Meena+Iyer&email=meena%40example.in&password=filter-coffee&password_confirm=filter-coffee",
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location(),
        Some("/auth?mode=login&success=check_email")
    );

    let page = app.get("/auth?mode=login&success=check_email").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Check your email"));

    // No tokens came back, so nobody is signed in.
    let dashboard = app.get("/dashboard").await;
    assert_eq!(dashboard.location(), Some("/auth?mode=login"));
}

#[tokio::test]
async fn token_near_expiry_is_refreshed_once() {
    let mut app = TestApp::spawn().await;
    app.sign_in_expiring(30).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "test-refresh-token" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": REFRESHED_TOKEN,
            "refresh_token": "rotated-refresh-token",
            "expires_in": 3600,
            "user": {
                "id": app.user_id.to_string(),
                "email": "ravi@example.in",
                "user_metadata": { "full_name": "Ravi Rao" }
            }
        })))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/stores"))
        .and(query_param("user_id", format!("eq.{}", app.user_id)))
        .and(header("authorization", format!("Bearer {REFRESHED_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([app.store_row()])))
        .mount(&app.backend)
        .await;

    let first = app.get("/dashboard/settings").await;
    assert_eq!(first.status, StatusCode::OK);
    assert!(first.body.contains("Rao General Stores"));

    // The refreshed token was stored; no second refresh.
    let second = app.get("/dashboard/settings").await;
    assert_eq!(second.status, StatusCode::OK);
}

#[tokio::test]
async fn failed_refresh_signs_the_user_out() {
    let mut app = TestApp::spawn().await;
    app.sign_in_expiring(30).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Already Used"
        })))
        .expect(1)
        .mount(&app.backend)
        .await;

    let response = app.get("/dashboard/settings").await;
    assert!(response.status.is_redirection());
    assert_eq!(response.location(), Some("/auth?mode=login"));

    // The session no longer holds a user: the auth page renders instead of
    // bouncing to the dashboard, and no further refresh is attempted.
    let page = app.get("/auth").await;
    assert_eq!(page.status, StatusCode::OK);
    let again = app.get("/dashboard").await;
    assert_eq!(again.location(), Some("/auth?mode=login"));
}
