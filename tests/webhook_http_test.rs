mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::*;
use pay_sync::adapters::router::BODY_LIMIT_BYTES;
use pay_sync::adapters::signature::{sign_razorpay_payload, sign_stripe_payload};
use std::time::Duration;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| json!(String::from_utf8_lossy(&bytes)))
    };
    (status, body)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn stripe_request(payload: &[u8], signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook/stripe")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("stripe-signature", sig);
    }
    builder.body(Body::from(payload.to_vec())).unwrap()
}

fn razorpay_request(payload: &[u8], signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhook/razorpay")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("x-razorpay-signature", sig);
    }
    builder.body(Body::from(payload.to_vec())).unwrap()
}

fn invoice_payload(invoice_id: &str) -> Vec<u8> {
    stripe_body("evt_http", "invoice.payment_succeeded", invoice_paid(invoice_id, None, 1_700_000_000))
        .to_string()
        .into_bytes()
}

// ── 1. stripe webhook ──────────────────────────────────────────────────────

#[tokio::test]
async fn stripe_signed_event_is_applied() {
    let h = Harness::new().await;
    let payload = invoice_payload("in_http");
    let sig = sign_stripe_payload(STRIPE_SECRET, &payload, Utc::now().timestamp()).unwrap();

    let (status, body) = send(h.app(), stripe_request(&payload, Some(&sig))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));
    assert_eq!(count(&h.pool, "payments").await, 1);
}

#[tokio::test]
async fn stripe_bad_signature_is_rejected_without_mutation() {
    let h = Harness::new().await;
    let payload = invoice_payload("in_forged");
    let sig = sign_stripe_payload("whsec_wrong", &payload, Utc::now().timestamp()).unwrap();

    let (status, body) = send(h.app(), stripe_request(&payload, Some(&sig))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(count(&h.pool, "payments").await, 0);
}

#[tokio::test]
async fn stripe_stale_signature_is_rejected() {
    let h = Harness::new().await;
    let payload = invoice_payload("in_replay");
    let sig = sign_stripe_payload(STRIPE_SECRET, &payload, Utc::now().timestamp() - 600).unwrap();

    let (status, _) = send(h.app(), stripe_request(&payload, Some(&sig))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(count(&h.pool, "payments").await, 0);
}

#[tokio::test]
async fn stripe_missing_signature_is_rejected() {
    let h = Harness::new().await;
    let (status, _) = send(h.app(), stripe_request(&invoice_payload("in_nosig"), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(count(&h.pool, "payments").await, 0);
}

#[tokio::test]
async fn stripe_unknown_event_is_acknowledged() {
    let h = Harness::new().await;
    let payload = stripe_body("evt_x", "radar.early_fraud_warning.created", json!({"id": "issfr_1"}))
        .to_string()
        .into_bytes();
    let sig = sign_stripe_payload(STRIPE_SECRET, &payload, Utc::now().timestamp()).unwrap();

    let (status, body) = send(h.app(), stripe_request(&payload, Some(&sig))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));
}

#[tokio::test]
async fn stripe_processing_failure_is_still_acknowledged() {
    let h = Harness::new().await;
    h.checkout.queue_session("cs_fail");
    send(
        h.app(),
        post_json("/create-checkout-session", &json!({ "priceId": "price_month", "customerEmail": "a@b.com" })),
    )
    .await;
    // Subscription lookup during processing will fail.
    h.checkout.set_unavailable(true);
    let payload = stripe_body(
        "evt_fail",
        "checkout.session.completed",
        checkout_completed("cs_fail", Some("sub_fail"), Some("a@b.com")),
    )
    .to_string()
    .into_bytes();
    let sig = sign_stripe_payload(STRIPE_SECRET, &payload, Utc::now().timestamp()).unwrap();

    let (status, body) = send(h.app(), stripe_request(&payload, Some(&sig))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));
    assert_eq!(subscription_status(&h.pool, "sub_fail").await.as_deref(), Some("pending"));
}

#[tokio::test]
async fn stripe_degraded_mode_processes_unverified() {
    let h = Harness::new().await;
    let app = h.app_with(unsigned());

    let (status, _) = send(app.clone(), stripe_request(&invoice_payload("in_open"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(count(&h.pool, "payments").await, 1);

    let (status, body) = send(app, stripe_request(b"not json", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// ── 2. razorpay webhook ────────────────────────────────────────────────────

#[tokio::test]
async fn razorpay_signed_capture_is_applied() {
    let h = Harness::new().await;
    let payload = razorpay_body("payment.captured", "pay_http", "order_none", 500)
        .to_string()
        .into_bytes();
    let sig = sign_razorpay_payload(RAZORPAY_SECRET, &payload).unwrap();

    let (status, body) = send(h.app(), razorpay_request(&payload, Some(&sig))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
    assert_eq!(count(&h.pool, "payments").await, 1);
}

#[tokio::test]
async fn razorpay_bad_signature_is_rejected() {
    let h = Harness::new().await;
    let payload = razorpay_body("payment.captured", "pay_forged", "order_none", 500)
        .to_string()
        .into_bytes();

    for sig in [Some("deadbeef"), None] {
        let (status, body) = send(h.app(), razorpay_request(&payload, sig)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "ok": false }));
    }
    assert_eq!(count(&h.pool, "payments").await, 0);
}

// ── 3. origination endpoints ───────────────────────────────────────────────

#[tokio::test]
async fn create_checkout_session_endpoint() {
    let h = Harness::new().await;
    h.checkout.queue_session("cs_http");

    let (status, body) = send(
        h.app(),
        post_json("/create-checkout-session", &json!({ "priceId": "price_month", "customerEmail": "a@b.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "sessionId": "cs_http" }));
    assert_eq!(subscription_status(&h.pool, "cs_http").await.as_deref(), Some("pending"));
}

#[tokio::test]
async fn create_checkout_session_requires_price() {
    let h = Harness::new().await;

    let (status, body) = send(h.app(), post_json("/create-checkout-session", &json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("priceId"));
}

#[tokio::test]
async fn create_checkout_session_provider_outage_is_500() {
    let h = Harness::new().await;
    h.checkout.set_unavailable(true);

    let (status, body) = send(
        h.app(),
        post_json("/create-checkout-session", &json!({ "priceId": "price_month" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_razorpay_order_returns_remote_order() {
    let h = Harness::new().await;

    let (status, body) = send(
        h.app(),
        post_json("/create-razorpay-order", &json!({ "amount": 500, "email": "a@b.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "order_test_1");
    assert_eq!(body["amount"], 500);
    assert_eq!(body["currency"], "INR");
    assert_eq!(order_status(&h.pool, "order_test_1").await.as_deref(), Some("created"));
}

#[tokio::test]
async fn create_razorpay_order_rejects_bad_input() {
    let h = Harness::new().await;

    let (status, body) = send(h.app(), post_json("/create-razorpay-order", &json!({ "amount": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/create-razorpay-order")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(h.app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_payment_intent_endpoint() {
    let h = Harness::new().await;

    let (status, body) = send(h.app(), post_json("/create-payment-intent", &json!({ "amount": 1500 }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientSecret"], "pi_test_1_secret_test");
    assert_eq!(body["paymentIntentId"], "pi_test_1");
}

// ── 4. queries ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_endpoint() {
    let h = Harness::new().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(h.app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn user_lookup() {
    let h = Harness::new().await;
    h.checkout.queue_session("cs_lookup");
    send(
        h.app(),
        post_json("/create-checkout-session", &json!({ "priceId": "price_month", "customerEmail": "Look@Up.com" })),
    )
    .await;

    let get = |uri: &str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let (status, body) = send(h.app(), get("/user")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(h.app(), get("/user?email=nobody@example.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "user": null, "subscriptions": [] }));

    let (status, body) = send(h.app(), get("/user?email=look@up.com")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "look@up.com");
    assert_eq!(body["subscriptions"][0]["provider_subscription_id"], "cs_lookup");
    assert_eq!(body["subscriptions"][0]["status"], "pending");
}

// ── 5. deadlines and body limits ───────────────────────────────────────────

#[tokio::test]
async fn webhook_is_applied_past_the_request_timeout() {
    let h = Harness::new().await;
    h.checkout.queue_session("cs_slow");
    send(
        h.app(),
        post_json("/create-checkout-session", &json!({ "priceId": "price_month", "customerEmail": "a@b.com" })),
    )
    .await;
    h.checkout.put_subscription("sub_slow", "active", None);
    h.checkout.set_delay(Duration::from_millis(300));

    let app = h.app_with_timeout(signed(), Duration::from_millis(50));
    let payload = stripe_body(
        "evt_slow",
        "checkout.session.completed",
        checkout_completed("cs_slow", Some("sub_slow"), Some("a@b.com")),
    )
    .to_string()
    .into_bytes();
    let sig = sign_stripe_payload(STRIPE_SECRET, &payload, Utc::now().timestamp()).unwrap();

    let (status, body) = send(app, stripe_request(&payload, Some(&sig))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "received": true }));
    assert_eq!(subscription_status(&h.pool, "sub_slow").await.as_deref(), Some("active"));
}

#[tokio::test]
async fn slow_origination_times_out() {
    let h = Harness::new().await;
    h.checkout.set_delay(Duration::from_millis(300));
    let app = h.app_with_timeout(signed(), Duration::from_millis(50));

    let (status, _) = send(app, post_json("/create-checkout-session", &json!({ "priceId": "price_month" }))).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn large_signed_event_is_accepted() {
    let h = Harness::new().await;
    let mut invoice = invoice_paid("in_large", None, 1_700_000_000);
    invoice["description"] = json!("x".repeat(BODY_LIMIT_BYTES * 2));
    let payload = stripe_body("evt_large", "invoice.payment_succeeded", invoice)
        .to_string()
        .into_bytes();
    assert!(payload.len() > BODY_LIMIT_BYTES);
    let sig = sign_stripe_payload(STRIPE_SECRET, &payload, Utc::now().timestamp()).unwrap();

    let (status, _) = send(h.app(), stripe_request(&payload, Some(&sig))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(count(&h.pool, "payments").await, 1);
}

#[tokio::test]
async fn oversized_origination_body_is_rejected() {
    let h = Harness::new().await;
    let body = json!({ "priceId": "price_month", "padding": "x".repeat(BODY_LIMIT_BYTES) });

    let (status, body) = send(h.app(), post_json("/create-checkout-session", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("length limit"));
    assert!(h.checkout.requests.lock().unwrap().is_empty());
}
