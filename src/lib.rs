pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    domain::provider::{CheckoutGateway, OrderGateway},
    std::sync::Arc,
};

/// Webhook signing secrets. `None` puts that channel in degraded mode
/// (events accepted unverified, loudly logged).
#[derive(Clone, Default)]
pub struct WebhookSecrets {
    pub stripe: Option<Arc<str>>,
    pub razorpay: Option<Arc<str>>,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    /// Hosted checkout + subscription lookup.
    pub checkout: Arc<dyn CheckoutGateway>,
    /// One-off card charges (payment intents).
    pub card_orders: Arc<dyn OrderGateway>,
    /// UPI/wallet orders.
    pub wallet_orders: Arc<dyn OrderGateway>,
    pub webhooks: WebhookSecrets,
    pub frontend_base: Arc<str>,
}
