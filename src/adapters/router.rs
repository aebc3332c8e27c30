use {
    super::{handlers, razorpay_webhook, stripe_webhook},
    crate::AppState,
    axum::{
        Router,
        extract::DefaultBodyLimit,
        http::{HeaderValue, Method, StatusCode, header::InvalidHeaderValue},
        routing::{get, post},
    },
    std::time::Duration,
    tower::ServiceBuilder,
    tower_http::{
        cors::{Any, CorsLayer},
        timeout::TimeoutLayer,
        trace::TraceLayer,
    },
};

/// Cap for origination and query bodies.
pub const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Webhook cap. Providers retry a 413 indefinitely.
pub const WEBHOOK_BODY_LIMIT_BYTES: usize = 1024 * 1024;

pub struct RouterOptions {
    pub cors: CorsLayer,
    pub request_timeout: Duration,
}

/// `*` allows any origin; anything else must be a single exact origin.
pub fn cors_layer(allowed_origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    if allowed_origin == "*" {
        Ok(layer.allow_origin(Any))
    } else {
        Ok(layer.allow_origin(HeaderValue::from_str(allowed_origin)?))
    }
}

/// The request timeout bounds the caller-facing routes only. Webhooks have
/// no deadline: once authenticated, an event is applied to completion and
/// acknowledged.
pub fn router(state: AppState, options: RouterOptions) -> Router {
    let api: Router<AppState> = Router::new()
        .route("/health", get(handlers::health))
        .route("/user", get(handlers::user))
        .route(
            "/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        .route("/create-razorpay-order", post(handlers::create_razorpay_order))
        .route("/create-payment-intent", post(handlers::create_payment_intent))
        .route_layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            options.request_timeout,
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES));

    let webhooks: Router<AppState> = Router::new()
        .route(
            "/webhook/stripe",
            post(stripe_webhook::stripe_webhook_handler),
        )
        .route(
            "/webhook/razorpay",
            post(razorpay_webhook::razorpay_webhook_handler),
        )
        .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT_BYTES));

    Router::new()
        .merge(api)
        .merge(webhooks)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(options.cors),
        )
        .with_state(state)
}
