//! Router tests over the in-memory store

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use mlmart_api::{create_test_router, AppState};
use mlmart_db::memory::MemoryStore;
use mlmart_ledger::{CommissionEngine, LedgerConfig};

fn app() -> Router {
    let engine = CommissionEngine::new(Arc::new(MemoryStore::new()), LedgerConfig::default());
    create_test_router(AppState::new(engine))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn post(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "POST", uri, None).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("not a decimal: {}", other),
    }
}

async fn register(app: &Router, name: &str, sponsor_code: Option<&str>) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/users",
        Some(json!({
            "full_name": name,
            "phone": format!("+221-{}", name),
            "sponsor_code": sponsor_code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

async fn place_order(app: &Router, buyer: &Value, seller: &Value, unit_price: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/orders",
        Some(json!({
            "buyer_id": buyer["user_id"],
            "items": [{
                "variant_id": Uuid::new_v4(),
                "seller_id": seller["user_id"],
                "quantity": 1,
                "unit_price": unit_price,
            }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delivery_flow_over_http() {
    let app = app();
    let s2 = register(&app, "s2", None).await;
    let s1 = register(&app, "s1", s2["referral_code"].as_str()).await;
    let buyer = register(&app, "buyer", s1["referral_code"].as_str()).await;
    let seller = register(&app, "seller", None).await;
    assert_eq!(buyer["sponsor_id"], s1["user_id"]);

    let order = place_order(&app, &buyer, &seller, "100000").await;
    let order_id = order["order_id"].as_str().unwrap().to_string();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["items"].as_array().unwrap().len(), 1);

    let (status, body) = post(&app, &format!("/api/v1/orders/{}/deliver", order_id)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["outcome"], "distributed");
    assert_eq!(body["credits"].as_array().unwrap().len(), 3);

    let (_, body) = post(&app, &format!("/api/v1/orders/{}/deliver", order_id)).await;
    assert_eq!(body["outcome"], "already_completed");
    assert_eq!(body["credits"].as_array().unwrap().len(), 3);

    let buyer_wallet = format!("/api/v1/wallets/{}", buyer["user_id"].as_str().unwrap());
    let (_, summary) = get(&app, &buyer_wallet).await;
    assert_eq!(decimal(&summary["pending"]), dec!(1000));
    assert_eq!(decimal(&summary["available"]), Decimal::ZERO);

    let settle = Some(json!({"mode": "all"}));
    let (status, body) = send(&app, "POST", "/api/v1/admin/settle", settle).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settled"], 3);

    let (_, summary) = get(&app, &buyer_wallet).await;
    assert_eq!(decimal(&summary["available"]), dec!(1000));
    assert_eq!(decimal(&summary["pending"]), Decimal::ZERO);

    let s1_wallet = format!("/api/v1/wallets/{}", s1["user_id"].as_str().unwrap());
    let (_, summary) = get(&app, &s1_wallet).await;
    assert_eq!(decimal(&summary["available"]), dec!(1500));

    let (_, history) = get(&app, &format!("{}/transactions?limit=10", buyer_wallet)).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["category"], "CASHBACK");
    assert_eq!(history[0]["status"], "validated");

    let (_, rec) = get(&app, &format!("{}/reconciliation", s1_wallet)).await;
    assert_eq!(decimal(&rec["drift"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_shipping_and_dropoff_routes() {
    let app = app();
    let buyer = register(&app, "buyer", None).await;
    let seller = register(&app, "seller", None).await;
    let order = place_order(&app, &buyer, &seller, "5000").await;
    let order_id = order["order_id"].as_str().unwrap();

    let (status, body) = post(&app, &format!("/api/v1/orders/{}/pay-shipping", order_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["shipping_payment_status"], "paid");

    let queue_uri = format!(
        "/api/v1/sellers/{}/pending-dropoffs",
        seller["user_id"].as_str().unwrap()
    );
    let (_, queue) = get(&app, &queue_uri).await;
    let item_id = queue[0]["item_id"].as_str().unwrap().to_string();

    let (status, body) = post(&app, &format!("/api/v1/order-items/{}/check-in", item_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "received_warehouse");

    let (_, queue) = get(&app, &queue_uri).await;
    assert!(queue.as_array().unwrap().is_empty());

    let (status, body) = post(&app, &format!("/api/v1/orders/{}/pay-shipping", order_id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], -2021);
}

#[tokio::test]
async fn test_cancelled_order_rejects_delivery() {
    let app = app();
    let buyer = register(&app, "buyer", None).await;
    let seller = register(&app, "seller", None).await;
    let order = place_order(&app, &buyer, &seller, "1000").await;
    let order_id = order["order_id"].as_str().unwrap();

    let (status, body) = post(&app, &format!("/api/v1/orders/{}/cancel", order_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, _) = post(&app, &format!("/api/v1/orders/{}/deliver", order_id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_error_responses() {
    let app = app();

    let (status, body) = post(&app, &format!("/api/v1/orders/{}/deliver", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], -2013);

    let (status, body) = get(&app, &format!("/api/v1/wallets/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], -3001);

    let (status, body) = send(&app, "POST", "/api/v1/users", Some(json!({"full_name": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], -1102);

    register(&app, "dup", None).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some(json!({"full_name": "other", "phone": "+221-dup"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", "/api/v1/users", Some(json!({"phone": 12}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let buyer = register(&app, "buyer", None).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/orders",
        Some(json!({
            "buyer_id": buyer["user_id"],
            "items": [{
                "variant_id": Uuid::new_v4(),
                "seller_id": buyer["user_id"],
                "quantity": 0,
                "unit_price": "10",
            }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wallet = format!(
        "/api/v1/wallets/{}/transactions?limit=0",
        buyer["user_id"].as_str().unwrap()
    );
    let (status, _) = get(&app, &wallet).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unstorable_prices_are_rejected() {
    let app = app();
    let buyer = register(&app, "buyer", None).await;
    let seller = register(&app, "seller", None).await;

    for unit_price in ["79228162514264337593543950335", "10.005", "-1"] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/orders",
            Some(json!({
                "buyer_id": buyer["user_id"],
                "items": [{
                    "variant_id": Uuid::new_v4(),
                    "seller_id": seller["user_id"],
                    "quantity": 2,
                    "unit_price": unit_price,
                }],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}: {}", unit_price, body);
        assert_eq!(body["code"], -1102);
    }

    let order = place_order(&app, &buyer, &seller, "10.01").await;
    assert_eq!(decimal(&order["total_products_amount"]), dec!(10.01));
}
