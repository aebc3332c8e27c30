use {
    pay_sync::{
        AppState, WebhookSecrets,
        adapters::{
            razorpay_client::RazorpayGateway,
            router::{RouterOptions, cors_layer, router},
            stripe_client::StripeGateway,
        },
        config::Config,
        infra::sqlite,
    },
    std::{error::Error, sync::Arc},
    tokio::signal,
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pay_sync=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    config.warn_insecure();

    let pool = sqlite::connect(&config.database_url).await?;
    tracing::info!(database_url = %config.database_url, "ledger ready");

    let stripe = Arc::new(StripeGateway::new(
        config.stripe_secret_key.as_deref().unwrap_or_default(),
        config.provider_timeout,
    ));
    let razorpay = Arc::new(RazorpayGateway::new(
        config.razorpay_key_id.clone().unwrap_or_default(),
        config.razorpay_key_secret.clone().unwrap_or_default(),
        config.razorpay_api_base.clone(),
        config.provider_timeout,
    )?);

    let state = AppState {
        pool,
        checkout: stripe.clone(),
        card_orders: stripe,
        wallet_orders: razorpay,
        webhooks: WebhookSecrets {
            stripe: config.stripe_webhook_secret.as_deref().map(Arc::from),
            razorpay: config.razorpay_webhook_secret.as_deref().map(Arc::from),
        },
        frontend_base: config.frontend_base.as_str().into(),
    };

    let app = router(
        state,
        RouterOptions {
            cors: cors_layer(&config.allowed_origin)?,
            request_timeout: config.request_timeout,
        },
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
