//! Admin console access through the full router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use bizgrow_core::AdminUserId;
use bizgrow_integration_tests::{ACCESS_TOKEN, TestApp};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_admin_lookup(app: &TestApp, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/admin_users"))
        .and(query_param("user_id", format!("eq.{}", app.user_id)))
        .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
        .respond_with(response)
        .expect(1)
        .mount(&app.backend)
        .await;
}

async fn mount_count(app: &TestApp, table: &str, total: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/rest/v1/{table}")))
        .and(header("prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", format!("0-0/{total}").as_str())
                .set_body_json(json!([])),
        )
        .mount(&app.backend)
        .await;
}

#[tokio::test]
async fn admin_console_requires_sign_in() {
    let mut app = TestApp::spawn().await;

    let response = app.get("/admin").await;

    assert!(response.status.is_redirection());
    assert_eq!(response.location(), Some("/auth?mode=login"));
}

#[tokio::test]
async fn merchant_without_admin_row_is_forbidden() {
    let mut app = TestApp::spawn().await;
    app.sign_in().await;
    mount_admin_lookup(&app, ResponseTemplate::new(200).set_body_json(json!([]))).await;

    let response = app.get("/admin").await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert!(response.body.contains("Admin access required"));
}

#[tokio::test]
async fn failed_admin_lookup_is_a_bad_gateway() {
    let mut app = TestApp::spawn().await;
    app.sign_in().await;
    mount_admin_lookup(
        &app,
        ResponseTemplate::new(500).set_body_json(json!({ "message": "upstream timeout" })),
    )
    .await;

    let response = app.get("/admin/stores").await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn admin_overview_shows_platform_totals() {
    let mut app = TestApp::spawn().await;
    app.sign_in().await;
    mount_admin_lookup(
        &app,
        ResponseTemplate::new(200).set_body_json(json!([{
            "id": AdminUserId::random().to_string(),
            "user_id": app.user_id.to_string(),
            "role": "super_admin",
            "created_at": "2026-01-05T10:00:00Z"
        }])),
    )
    .await;

    mount_count(&app, "stores", 3).await;
    mount_count(&app, "products", 41).await;
    mount_count(&app, "orders", 17).await;
    mount_count(&app, "customers", 9).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/orders"))
        .and(query_param("select", "total_amount"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "total_amount": "240.00" },
            { "total_amount": "60.50" }
        ])))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&app.backend)
        .await;

    let response = app.get("/admin").await;

    assert_eq!(response.status, StatusCode::OK);
    for total in ["3", "41", "17", "9"] {
        assert!(
            response
                .body
                .contains(&format!("<span class=\"stat__value\">{total}</span>")),
            "missing total {total}"
        );
    }
    assert!(response.body.contains("300.50"));
    assert!(response.body.contains("Super admin"));
}
