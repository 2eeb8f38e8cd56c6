//! Storefront cart and checkout through the full router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use bizgrow_core::{CustomerId, Money, OrderId, ProductId};
use bizgrow_integration_tests::{TestApp, product_row};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn customer_row(app: &TestApp, id: CustomerId) -> Value {
    json!({
        "id": id.to_string(),
        "store_id": app.store_id.to_string(),
        "name": "Asha Patil",
        "phone": "919876543210",
        "address": "4 Lake View, Nashik",
        "total_orders": 0,
        "total_spent": "0",
        "created_at": "2026-10-16T09:00:00Z"
    })
}

#[tokio::test]
async fn checkout_creates_customer_and_order_then_clears_cart() {
    let mut app = TestApp::spawn().await;
    let product_id = ProductId::random();
    let customer_id = CustomerId::random();
    let order_id = OrderId::random();

    Mock::given(method("GET"))
        .and(path("/rest/v1/products"))
        .and(query_param("store_id", format!("eq.{}", app.store_id)))
        .and(query_param("is_available", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([product_row(
            &product_id.to_string(),
            app.store_id,
            "Masala chai",
            true
        )])))
        .mount(&app.backend)
        .await;
    // Typed as "98765 43210"; looked up and stored with the country code.
    Mock::given(method("GET"))
        .and(path("/rest/v1/customers"))
        .and(query_param("store_id", format!("eq.{}", app.store_id)))
        .and(query_param("phone", "eq.919876543210"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/customers"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([customer_row(&app, customer_id)])),
        )
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/orders"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": order_id.to_string(),
            "store_id": app.store_id.to_string(),
            "customer_id": customer_id.to_string(),
            "customer_name": "Asha Patil",
            "customer_phone": "919876543210",
            "items": [],
            "total_amount": "240.00",
            "status": "pending",
            "payment_method": "cash_on_delivery",
            "created_at": "2026-10-16T09:01:00Z"
        }])))
        .expect(1)
        .mount(&app.backend)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/customers"))
        .and(query_param("id", format!("eq.{customer_id}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([customer_row(&app, customer_id)])),
        )
        .expect(1)
        .mount(&app.backend)
        .await;

    let cart_path = format!("/store/{}/cart", app.store_id);
    let added = app
        .post_form(
            &format!("{cart_path}/add"),
            &format!("product_id={product_id}&quantity=2"),
        )
        .await;
    assert_eq!(added.status, StatusCode::SEE_OTHER);

    let checkout_body =
        "customer_name=+Asha+Patil+&customer_phone=98765+43210&customer_address=4+Lake+View%2C+Nashik";
    let response = app
        .post_form(&format!("{cart_path}/checkout"), checkout_body)
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location().unwrap(),
        format!("/order-confirmation/{order_id}")
    );

    let requests = app.backend.received_requests().await.unwrap();
    let insert = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/rest/v1/orders")
        .unwrap();
    let order: Value = serde_json::from_slice(&insert.body).unwrap();
    assert_eq!(order["customer_id"], json!(customer_id.to_string()));
    assert_eq!(order["customer_name"], json!("Asha Patil"));
    assert_eq!(order["customer_phone"], json!("919876543210"));
    assert_eq!(order["status"], json!("pending"));
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["quantity"], json!(2));
    let total: Money = serde_json::from_value(order["total_amount"].clone()).unwrap();
    assert_eq!(total, Money::from_rupees(240));

    let customer_update = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap();
    let totals: Value = serde_json::from_slice(&customer_update.body).unwrap();
    assert_eq!(totals["total_orders"], json!(1));

    // The cart is gone: a second checkout finds nothing to order.
    let again = app
        .post_form(&format!("{cart_path}/checkout"), checkout_body)
        .await;
    assert_eq!(
        again.location().unwrap(),
        format!("{cart_path}?error=cart_empty")
    );
}

#[tokio::test]
async fn checkout_rejects_unusable_phone_before_touching_backend() {
    let mut app = TestApp::spawn().await;

    let response = app
        .post_form(
            &format!("/store/{}/cart/checkout", app.store_id),
            "customer_name=Asha&customer_phone=12345",
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location().unwrap(),
        format!("/store/{}/cart?error=checkout_details", app.store_id)
    );
    assert!(app.backend.received_requests().await.unwrap().is_empty());
}
