//! Integration tests for the API server.

use std::sync::OnceLock;

use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use domain::{Money, Product, signature};
use hmac::{Hmac, Mac};
use metrics_exporter_prometheus::PrometheusHandle;
use sha2::Sha256;
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// Builds an HS256 token signed with the default dev secret.
fn make_token(user_id: uuid::Uuid) -> String {
    let exp = Utc::now().timestamp() + 3600;
    let header_b64 = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload_b64 = URL_SAFE_NO_PAD
        .encode(format!(r#"{{"userId":"{user_id}","role":"user","exp":{exp}}}"#).as_bytes());
    let signing_input = format!("{header_b64}.{payload_b64}");

    let mut mac = Hmac::<Sha256>::new_from_slice(b"dev_jwt_secret").expect("hmac");
    mac.update(signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{signing_input}.{sig_b64}")
}

async fn setup() -> (axum::Router, InMemoryStore) {
    let store = InMemoryStore::new();
    store
        .put_product(Product::new(
            "SKU-001",
            "Widget",
            "widget.png",
            Money::from_minor(1000),
            5,
        ))
        .await;

    let state = api::create_default_state(store.clone(), &Config::default());
    let app = api::create_app(state, get_metrics_handle());
    (app, store)
}

fn order_body() -> String {
    serde_json::json!({
        "items": [{ "productId": "SKU-001", "quantity": 2 }],
        "shippingAddress": {
            "fullName": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": "9999999999",
            "address": "1 Analytical Way",
            "city": "London",
            "state": "LDN",
            "zipCode": "400001"
        }
    })
    .to_string()
}

async fn create_order(app: &axum::Router, token: &str) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(order_body()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_order_requires_auth() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(order_body()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_order() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());

    let order = create_order(&app, &token).await;

    assert_eq!(order["totalAmount"], 2000);
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["orderStatus"], "processing");
    assert_eq!(order["items"][0]["productId"], "SKU-001");
    assert_eq!(order["items"][0]["price"], 1000);
    assert!(order["id"].as_str().is_some());
}

#[tokio::test]
async fn test_create_order_with_cookie_credential() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header("cookie", format!("theme=dark; token={token}"))
                .body(Body::from(order_body()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_order_insufficient_stock() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());

    let body = serde_json::json!({
        "items": [{ "productId": "SKU-001", "quantity": 6 }],
        "shippingAddress": serde_json::from_str::<serde_json::Value>(&order_body()).unwrap()["shippingAddress"],
    })
    .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_order_incomplete_address() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());

    let body = serde_json::json!({
        "items": [{ "productId": "SKU-001", "quantity": 1 }],
        "shippingAddress": {
            "fullName": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": "",
            "address": "1 Analytical Way",
            "city": "London",
            "state": "LDN",
            "zipCode": "400001"
        }
    })
    .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_order_scoped_to_owner() {
    let (app, _) = setup().await;
    let owner_token = make_token(uuid::Uuid::new_v4());

    let order = create_order(&app, &owner_token).await;
    let order_id = order["id"].as_str().unwrap();

    // Owner can read it.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header("authorization", format!("Bearer {owner_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A different user cannot.
    let stranger_token = make_token(uuid::Uuid::new_v4());
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header("authorization", format!("Bearer {stranger_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());
    let fake_id = uuid::Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{fake_id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_order_id_format() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders/not-a-uuid")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_newest_first() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());

    let first = create_order(&app, &token).await;
    let second = create_order(&app, &token).await;

    // Another user's order must not appear.
    let other_token = make_token(uuid::Uuid::new_v4());
    create_order(&app, &other_token).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let orders = json_body(response).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["id"], second["id"]);
    assert_eq!(orders[1]["id"], first["id"]);
}

#[tokio::test]
async fn test_payment_session_flow() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());

    let order = create_order(&app, &token).await;
    let order_id = order["id"].as_str().unwrap();

    // Open a payment session for the order total.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/create-order")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    serde_json::json!({ "orderId": order_id, "amount": 2000 }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let opened = json_body(response).await;
    assert_eq!(opened["amount"], 2000);
    assert_eq!(opened["currency"], "INR");
    let gateway_order_id = opened["gatewayOrderId"].as_str().unwrap().to_string();

    // Verify with a genuine signature (default dev gateway secret).
    let sig = signature::compute("dev_gateway_secret", &gateway_order_id, "pay_api_1");
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/verify")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    serde_json::json!({
                        "orderId": order_id,
                        "gatewayOrderId": gateway_order_id,
                        "gatewayPaymentId": "pay_api_1",
                        "signature": sig
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let settled = json_body(response).await;
    assert_eq!(settled["paymentStatus"], "completed");
    assert_eq!(settled["orderStatus"], "processing");
}

#[tokio::test]
async fn test_payment_amount_mismatch() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());

    let order = create_order(&app, &token).await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/create-order")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    serde_json::json!({ "orderId": order_id, "amount": 1 }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_payment_verify_bad_signature() {
    let (app, _) = setup().await;
    let token = make_token(uuid::Uuid::new_v4());

    let order = create_order(&app, &token).await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/create-order")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    serde_json::json!({ "orderId": order_id, "amount": 2000 }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let opened = json_body(response).await;
    let gateway_order_id = opened["gatewayOrderId"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/verify")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(
                    serde_json::json!({
                        "orderId": order_id,
                        "gatewayOrderId": gateway_order_id,
                        "gatewayPaymentId": "pay_api_2",
                        "signature": "deadbeef"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The order is still payable.
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let reloaded = json_body(response).await;
    assert_eq!(reloaded["paymentStatus"], "pending");
}
