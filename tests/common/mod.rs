#![allow(dead_code)]

use axum::Router;
use chrono::{DateTime, Utc};
use pay_sync::adapters::router::{RouterOptions, cors_layer, router};
use pay_sync::domain::error::PipelineError;
use pay_sync::domain::event::{LedgerEvent, RazorpayEvent, StripeEvent};
use pay_sync::domain::id::{CheckoutSessionId, SubscriptionId};
use pay_sync::domain::money::Money;
use pay_sync::domain::provider::{
    CheckoutGateway, CheckoutRequest, GatewayFuture, OrderGateway, RemoteOrder, RemoteSubscription,
};
use pay_sync::domain::subscription::SubscriptionStatus;
use pay_sync::{AppState, WebhookSecrets};
use serde_json::json;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const STRIPE_SECRET: &str = "whsec_test_secret";
pub const RAZORPAY_SECRET: &str = "rzp_test_webhook_secret";
pub const FRONTEND_BASE: &str = "http://localhost:5500";

/// Fresh on-disk SQLite ledger per test. Keep the `TempDir` alive for the
/// duration of the test.
pub async fn setup_pool() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("ledger.db").display());
    let pool = pay_sync::infra::sqlite::connect(&url)
        .await
        .expect("failed to open test ledger");
    (pool, dir)
}

// ── Fake gateways ──────────────────────────────────────────────────────────

pub struct FakeCheckoutGateway {
    session_ids: Mutex<Vec<String>>,
    subscriptions: Mutex<HashMap<String, RemoteSubscription>>,
    unavailable: AtomicBool,
    delay: Mutex<Duration>,
    pub requests: Mutex<Vec<CheckoutRequest>>,
    pub retrievals: AtomicUsize,
}

impl FakeCheckoutGateway {
    /// Hands out `cs_test_1`, `cs_test_2`, ... unless ids are queued.
    pub fn new() -> Self {
        Self {
            session_ids: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            delay: Mutex::new(Duration::ZERO),
            requests: Mutex::new(Vec::new()),
            retrievals: AtomicUsize::new(0),
        }
    }

    pub fn queue_session(&self, id: &str) {
        self.session_ids.lock().unwrap().insert(0, id.to_string());
    }

    pub fn put_subscription(&self, id: &str, status: &str, period_end: Option<i64>) {
        self.subscriptions.lock().unwrap().insert(
            id.to_string(),
            RemoteSubscription {
                status: SubscriptionStatus::from(status),
                current_period_end: period_end.and_then(|s| DateTime::from_timestamp(s, 0)),
            },
        );
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    async fn wait(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl CheckoutGateway for FakeCheckoutGateway {
    fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> GatewayFuture<'_, CheckoutSessionId> {
        Box::pin(async move {
            self.wait().await;
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(PipelineError::ProviderUnavailable("fake outage".into()));
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            let id = self
                .session_ids
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| format!("cs_test_{}", requests.len()));
            CheckoutSessionId::new(id)
        })
    }

    fn retrieve_subscription(&self, id: &SubscriptionId) -> GatewayFuture<'_, RemoteSubscription> {
        let id = id.as_str().to_string();
        Box::pin(async move {
            self.retrievals.fetch_add(1, Ordering::SeqCst);
            self.wait().await;
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(PipelineError::ProviderUnavailable("fake outage".into()));
            }
            self.subscriptions
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| PipelineError::ProviderUnavailable(format!("no such subscription: {id}")))
        })
    }
}

pub struct FakeOrderGateway {
    id: String,
    status: Option<String>,
    client_secret: Option<String>,
    unavailable: AtomicBool,
    pub calls: Mutex<Vec<(Money, String)>>,
}

impl FakeOrderGateway {
    pub fn razorpay(id: &str, status: &str) -> Self {
        Self {
            id: id.to_string(),
            status: Some(status.to_string()),
            client_secret: None,
            unavailable: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn stripe(id: &str) -> Self {
        Self {
            id: id.to_string(),
            status: Some("requires_payment_method".to_string()),
            client_secret: Some(format!("{id}_secret_test")),
            unavailable: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl OrderGateway for FakeOrderGateway {
    fn create_order(&self, money: Money, receipt: String) -> GatewayFuture<'_, RemoteOrder> {
        Box::pin(async move {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(PipelineError::ProviderUnavailable("fake outage".into()));
            }
            self.calls.lock().unwrap().push((money, receipt.clone()));
            Ok(RemoteOrder {
                id: self.id.clone(),
                money,
                status: self.status.clone(),
                client_secret: self.client_secret.clone(),
                raw: json!({
                    "id": self.id,
                    "amount": money.amount().minor_units(),
                    "currency": money.currency().as_upper(),
                    "receipt": receipt,
                    "status": self.status,
                }),
            })
        })
    }
}

// ── Harness ────────────────────────────────────────────────────────────────

pub struct Harness {
    pub pool: SqlitePool,
    pub checkout: Arc<FakeCheckoutGateway>,
    pub card: Arc<FakeOrderGateway>,
    pub wallet: Arc<FakeOrderGateway>,
    _dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let (pool, dir) = setup_pool().await;
        Self {
            pool,
            checkout: Arc::new(FakeCheckoutGateway::new()),
            card: Arc::new(FakeOrderGateway::stripe("pi_test_1")),
            wallet: Arc::new(FakeOrderGateway::razorpay("order_test_1", "created")),
            _dir: dir,
        }
    }

    pub fn state(&self, webhooks: WebhookSecrets) -> AppState {
        AppState {
            pool: self.pool.clone(),
            checkout: self.checkout.clone(),
            card_orders: self.card.clone(),
            wallet_orders: self.wallet.clone(),
            webhooks,
            frontend_base: FRONTEND_BASE.into(),
        }
    }

    /// Router with both webhook secrets configured.
    pub fn app(&self) -> Router {
        self.app_with(signed())
    }

    pub fn app_with(&self, webhooks: WebhookSecrets) -> Router {
        self.app_with_timeout(webhooks, Duration::from_secs(10))
    }

    pub fn app_with_timeout(&self, webhooks: WebhookSecrets, request_timeout: Duration) -> Router {
        router(
            self.state(webhooks),
            RouterOptions {
                cors: cors_layer("*").unwrap(),
                request_timeout,
            },
        )
    }
}

pub fn signed() -> WebhookSecrets {
    WebhookSecrets {
        stripe: Some(STRIPE_SECRET.into()),
        razorpay: Some(RAZORPAY_SECRET.into()),
    }
}

pub fn unsigned() -> WebhookSecrets {
    WebhookSecrets::default()
}

// ── Event builders ─────────────────────────────────────────────────────────

pub fn stripe_body(event_id: &str, event_type: &str, object: serde_json::Value) -> serde_json::Value {
    json!({
        "id": event_id,
        "type": event_type,
        "created": Utc::now().timestamp(),
        "data": { "object": object },
    })
}

pub fn stripe_event(event_type: &str, object: serde_json::Value) -> LedgerEvent {
    let event: StripeEvent =
        serde_json::from_value(stripe_body("evt_test", event_type, object)).unwrap();
    event.classify().unwrap()
}

pub fn checkout_completed(
    session_id: &str,
    subscription_id: Option<&str>,
    email: Option<&str>,
) -> serde_json::Value {
    json!({
        "id": session_id,
        "object": "checkout.session",
        "subscription": subscription_id,
        "amount_total": 1999,
        "currency": "usd",
        "customer_details": { "email": email },
        "metadata": {},
    })
}

pub fn invoice_paid(invoice_id: &str, subscription_id: Option<&str>, period_end: i64) -> serde_json::Value {
    json!({
        "id": invoice_id,
        "object": "invoice",
        "subscription": subscription_id,
        "amount_paid": 1999,
        "currency": "usd",
        "status": "paid",
        "lines": { "data": [ { "period": { "start": period_end - 2_592_000, "end": period_end } } ] },
    })
}

pub fn razorpay_body(event: &str, payment_id: &str, order_id: &str, amount: i64) -> serde_json::Value {
    json!({
        "entity": "event",
        "event": event,
        "payload": { "payment": { "entity": {
            "id": payment_id,
            "order_id": order_id,
            "amount": amount,
            "currency": "INR",
            "status": "captured",
        } } },
        "created_at": Utc::now().timestamp(),
    })
}

pub fn razorpay_event(event: &str, payment_id: &str, order_id: &str, amount: i64) -> LedgerEvent {
    let event: RazorpayEvent =
        serde_json::from_value(razorpay_body(event, payment_id, order_id, amount)).unwrap();
    event.classify().unwrap()
}

// ── Query helpers ──────────────────────────────────────────────────────────

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count failed")
}

pub async fn order_status(pool: &SqlitePool, provider_order_id: &str) -> Option<String> {
    sqlx::query_scalar::<_, String>("SELECT status FROM orders WHERE provider_order_id = ?")
        .bind(provider_order_id)
        .fetch_optional(pool)
        .await
        .expect("query failed")
}

pub async fn subscription_status(pool: &SqlitePool, key: &str) -> Option<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT status FROM subscriptions WHERE provider_subscription_id = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await
    .expect("query failed")
}
