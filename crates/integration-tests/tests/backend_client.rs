//! Backend client calls against a mocked Supabase.

#![allow(clippy::unwrap_used)]

use bizgrow_integration_tests::config;
use bizgrow_web::supabase::{Caller, Query, SupabaseClient, SupabaseError, tables};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client() -> (MockServer, SupabaseClient) {
    let backend = MockServer::start().await;
    let client = SupabaseClient::new(&config(&backend.uri()).supabase).unwrap();
    (backend, client)
}

#[tokio::test]
async fn current_user_reads_profile_metadata() {
    let (backend, client) = client().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer live-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "6f1c2a7e-1b7c-4e5f-9a0b-2c3d4e5f6a7b",
            "email": "meena@boutique.in",
            "user_metadata": { "full_name": "Meena Iyer" }
        })))
        .mount(&backend)
        .await;

    let user = client
        .get_user(&SecretString::from("live-token"))
        .await
        .unwrap();

    assert_eq!(user.email.as_deref(), Some("meena@boutique.in"));
    assert_eq!(user.full_name().as_deref(), Some("Meena Iyer"));
}

#[tokio::test]
async fn current_user_with_expired_token_is_unauthorized() {
    let (backend, client) = client().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "msg": "JWT expired" })),
        )
        .mount(&backend)
        .await;

    let err = client
        .get_user(&SecretString::from("stale-token"))
        .await
        .unwrap_err();

    assert!(matches!(err, SupabaseError::Unauthorized(ref m) if m == "JWT expired"));
}

#[tokio::test]
async fn count_reads_content_range_total() {
    let (backend, client) = client().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/orders"))
        .and(query_param("status", "eq.pending"))
        .and(header("prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-0/42")
                .set_body_json(json!([{ "id": "6f1c2a7e-1b7c-4e5f-9a0b-2c3d4e5f6a7b" }])),
        )
        .mount(&backend)
        .await;

    let total = client
        .count(
            Caller::Anon,
            tables::ORDERS,
            &Query::new().eq("status", "pending"),
        )
        .await
        .unwrap();

    assert_eq!(total, 42);
}
