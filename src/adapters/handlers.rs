use {
    super::api_errors::ApiError,
    crate::{
        AppState,
        domain::{error::PipelineError, provider::RemoteOrder},
        services::{
            origination::{
                CardPaymentStarted, start_card_payment, start_subscription_checkout,
                start_wallet_order,
            },
            query::{UserOverview, user_with_subscriptions},
        },
    },
    axum::{
        Json,
        extract::{Query, State, rejection::JsonRejection},
    },
    serde::Deserialize,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutSessionBody {
    pub price_id: Option<String>,
    pub mode: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateWalletOrderBody {
    /// Minor units (paise for INR).
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub receipt: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentBody {
    /// Minor units (cents for USD).
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub email: Option<String>,
}

/// Malformed JSON gets the same `{error}` body as every other 400.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| PipelineError::InvalidRequest(e.body_text()).into())
}

pub async fn create_checkout_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateCheckoutSessionBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = body(payload)?;
    let session_id = start_subscription_checkout(
        &state.pool,
        state.checkout.as_ref(),
        &state.frontend_base,
        req.price_id.as_deref(),
        req.mode.as_deref(),
        req.customer_email.as_deref(),
    )
    .await?;
    Ok(Json(serde_json::json!({ "sessionId": session_id })))
}

/// Returns the provider's order object as-is; the client hands it to the
/// wallet widget.
pub async fn create_razorpay_order(
    State(state): State<AppState>,
    payload: Result<Json<CreateWalletOrderBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = body(payload)?;
    let order: RemoteOrder = start_wallet_order(
        &state.pool,
        state.wallet_orders.as_ref(),
        req.amount,
        req.currency.as_deref(),
        req.receipt.as_deref(),
        req.email.as_deref(),
    )
    .await?;
    Ok(Json(order.raw))
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentIntentBody>, JsonRejection>,
) -> Result<Json<CardPaymentStarted>, ApiError> {
    let req = body(payload)?;
    let started = start_card_payment(
        &state.pool,
        state.card_orders.as_ref(),
        req.amount,
        req.currency.as_deref(),
        req.email.as_deref(),
    )
    .await?;
    Ok(Json(started))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn user(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<UserOverview>, ApiError> {
    Ok(Json(
        user_with_subscriptions(&state.pool, query.email.as_deref()).await?,
    ))
}
