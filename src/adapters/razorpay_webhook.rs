use {
    super::{apply_verified, signature::verify_razorpay_signature},
    crate::{AppState, domain::event::RazorpayEvent},
    axum::{Json, body::Bytes, extract::State, http::HeaderMap, http::StatusCode},
};

type WebhookResponse = (StatusCode, Json<serde_json::Value>);

/// Wallet webhook. Replies `{ok: bool}`; 400 makes the provider retry.
#[tracing::instrument(
    name = "razorpay_webhook",
    skip_all,
    fields(event_type = tracing::field::Empty)
)]
pub async fn razorpay_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResponse {
    let verified = match &state.webhooks.razorpay {
        Some(secret) => {
            let Some(sig) = headers
                .get("x-razorpay-signature")
                .and_then(|v| v.to_str().ok())
            else {
                tracing::warn!("webhook rejected: missing x-razorpay-signature header");
                return reply(StatusCode::BAD_REQUEST, false);
            };
            if let Err(e) = verify_razorpay_signature(secret, &body, sig) {
                tracing::warn!("webhook rejected: {e}");
                return reply(StatusCode::BAD_REQUEST, false);
            }
            true
        }
        None => {
            tracing::warn!("RAZORPAY_WEBHOOK_SECRET not set, processing unverified event");
            false
        }
    };

    let event: RazorpayEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) if !verified => {
            tracing::warn!("unparseable event: {e}");
            return reply(StatusCode::BAD_REQUEST, false);
        }
        Err(e) => {
            tracing::error!("signed event failed to parse: {e}");
            return reply(StatusCode::OK, true);
        }
    };

    tracing::Span::current().record("event_type", tracing::field::display(&event.event));

    match event.classify() {
        Ok(ledger_event) => apply_verified(&state, ledger_event).await,
        Err(e) => tracing::error!("event classification failed: {e}"),
    }

    reply(StatusCode::OK, true)
}

fn reply(status: StatusCode, ok: bool) -> WebhookResponse {
    (status, Json(serde_json::json!({ "ok": ok })))
}
