//! "Start a purchase": resolve the buyer, open the remote object, write the
//! pending local record. Settlement arrives later through webhooks.

use {
    crate::{
        domain::{
            error::PipelineError,
            id::{CheckoutSessionId, PaymentIntentId, WalletOrderId},
            money::{Currency, Money, MoneyAmount},
            order::{NewOrder, OrderStatus},
            provider::{
                CheckoutGateway, CheckoutMode, CheckoutRequest, OrderGateway, Provider,
                RemoteOrder,
            },
            subscription::NewSubscription,
            user::{Email, User},
        },
        infra::sqlite::{
            order_repo::insert_order, subscription_repo::insert_subscription,
            user_repo::get_or_create_user,
        },
    },
    chrono::Utc,
    serde::Serialize,
    sqlx::SqlitePool,
    std::collections::HashMap,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPaymentStarted {
    pub client_secret: String,
    pub payment_intent_id: String,
}

pub async fn start_subscription_checkout(
    pool: &SqlitePool,
    gateway: &dyn CheckoutGateway,
    frontend_base: &str,
    price_id: Option<&str>,
    mode: Option<&str>,
    customer_email: Option<&str>,
) -> Result<CheckoutSessionId, PipelineError> {
    let price_id = price_id
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| PipelineError::InvalidRequest("priceId is required".into()))?;
    let mode = mode.map(CheckoutMode::try_from).transpose()?.unwrap_or(CheckoutMode::Subscription);
    let email = Email::parse_optional(customer_email)?;

    let user = resolve_user(pool, email.as_ref()).await?;

    let base = frontend_base.trim_end_matches('/');
    let mut metadata = HashMap::new();
    if let Some(user) = &user {
        metadata.insert("user_id".to_string(), user.id.to_string());
    }

    let session_id = gateway
        .create_checkout_session(CheckoutRequest {
            price_id: price_id.to_string(),
            mode,
            success_url: format!("{base}/?checkout=success"),
            cancel_url: format!("{base}/?checkout=cancel"),
            customer_email: email.as_ref().map(|e| e.as_str().to_string()),
            metadata,
        })
        .await?;

    if let Some(user) = &user {
        let pending = NewSubscription::pending_checkout(user.id, session_id.as_str(), price_id);
        insert_subscription(pool, &pending).await?;
    }

    tracing::info!(
        session_id = %session_id,
        price_id,
        mode = mode.as_str(),
        user_id = ?user.as_ref().map(|u| u.id),
        "checkout session opened"
    );
    Ok(session_id)
}

pub async fn start_wallet_order(
    pool: &SqlitePool,
    gateway: &dyn OrderGateway,
    amount: Option<i64>,
    currency: Option<&str>,
    receipt: Option<&str>,
    email: Option<&str>,
) -> Result<RemoteOrder, PipelineError> {
    let money = origination_money(amount, currency, Currency::Inr)?;
    let email = Email::parse_optional(email)?;
    let receipt = receipt
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_receipt);

    let user = resolve_user(pool, email.as_ref()).await?;
    let order = gateway.create_order(money, receipt).await?;
    let order_id = WalletOrderId::new(order.id.as_str())
        .map_err(|e| PipelineError::ProviderUnavailable(format!("razorpay returned {e}")))?;

    let status = OrderStatus::from_remote_order(order.status.as_deref());
    insert_order(
        pool,
        &NewOrder::new(
            user.as_ref().map(|u| u.id),
            Provider::Razorpay,
            order_id.as_str(),
            order.money,
            status,
            order.raw.clone(),
        ),
    )
    .await?;

    tracing::info!(order_id = %order_id, %status, amount = order.money.amount().minor_units(), "wallet order opened");
    Ok(order)
}

pub async fn start_card_payment(
    pool: &SqlitePool,
    gateway: &dyn OrderGateway,
    amount: Option<i64>,
    currency: Option<&str>,
    email: Option<&str>,
) -> Result<CardPaymentStarted, PipelineError> {
    let money = origination_money(amount, currency, Currency::Usd)?;
    let email = Email::parse_optional(email)?;

    let user = resolve_user(pool, email.as_ref()).await?;
    let intent = gateway.create_order(money, default_receipt()).await?;
    let intent_id = PaymentIntentId::new(intent.id.as_str())
        .map_err(|e| PipelineError::ProviderUnavailable(format!("stripe returned {e}")))?;
    let client_secret = intent.client_secret.clone().ok_or_else(|| {
        PipelineError::ProviderUnavailable("stripe returned no client secret".into())
    })?;

    insert_order(
        pool,
        &NewOrder::new(
            user.as_ref().map(|u| u.id),
            Provider::Stripe,
            intent_id.as_str(),
            intent.money,
            OrderStatus::from_remote_order(intent.status.as_deref()),
            intent.raw,
        ),
    )
    .await?;

    tracing::info!(payment_intent_id = %intent_id, "card payment opened");
    Ok(CardPaymentStarted {
        client_secret,
        payment_intent_id: intent_id.into_inner(),
    })
}

fn origination_money(
    amount: Option<i64>,
    currency: Option<&str>,
    default_currency: Currency,
) -> Result<Money, PipelineError> {
    let amount = amount.ok_or_else(|| PipelineError::InvalidRequest("amount is required".into()))?;
    let amount = MoneyAmount::positive(amount)?;
    let currency = match currency.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Currency::try_from(code)?,
        None => default_currency,
    };
    Ok(Money::new(amount, currency))
}

fn default_receipt() -> String {
    format!("rcpt_{}", Utc::now().timestamp_millis())
}

async fn resolve_user(
    pool: &SqlitePool,
    email: Option<&Email>,
) -> Result<Option<User>, PipelineError> {
    match email {
        Some(email) => get_or_create_user(pool, email).await.map(Some),
        None => Ok(None),
    }
}
