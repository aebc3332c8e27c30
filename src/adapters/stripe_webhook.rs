use {
    super::{api_errors::ApiError, apply_verified, signature::verify_stripe_signature},
    crate::{
        AppState,
        domain::{error::PipelineError, event::StripeEvent},
    },
    axum::{Json, body::Bytes, extract::State, http::HeaderMap},
    chrono::Utc,
};

/// Card-network webhook. The body is taken as raw bytes: the signature is
/// over the exact payload, so nothing parses it before verification.
#[tracing::instrument(
    name = "stripe_webhook",
    skip_all,
    fields(event_id = tracing::field::Empty, event_type = tracing::field::Empty)
)]
pub async fn stripe_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let verified = match &state.webhooks.stripe {
        Some(secret) => {
            let sig = headers
                .get("stripe-signature")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    PipelineError::AuthenticationFailure("missing stripe-signature header".into())
                })?;
            verify_stripe_signature(secret, &body, sig, Utc::now().timestamp())?;
            true
        }
        None => {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set, processing unverified event");
            false
        }
    };

    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) if !verified => {
            return Err(PipelineError::InvalidRequest(format!("unparseable event: {e}")).into());
        }
        Err(e) => {
            tracing::error!("signed event failed to parse: {e}");
            return Ok(ack());
        }
    };

    tracing::Span::current()
        .record("event_id", tracing::field::display(&event.id))
        .record("event_type", tracing::field::display(&event.event_type));

    match event.classify() {
        Ok(ledger_event) => apply_verified(&state, ledger_event).await,
        Err(e) => tracing::error!("event classification failed: {e}"),
    }

    Ok(ack())
}

fn ack() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "received": true }))
}
