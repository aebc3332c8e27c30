pub mod api_errors;
pub mod handlers;
pub mod razorpay_client;
pub mod razorpay_webhook;
pub mod router;
pub mod signature;
pub mod stripe_client;
pub mod stripe_webhook;

use crate::{
    AppState,
    domain::event::LedgerEvent,
    services::reconciliation::{self, ProcessResult},
};

/// Apply an authenticated event and log the outcome. Never fails: the
/// provider gets its acknowledgment regardless.
pub(crate) async fn apply_verified(state: &AppState, event: LedgerEvent) {
    let kind = event.kind();
    match reconciliation::process(&state.pool, state.checkout.as_ref(), event).await {
        Ok(ProcessResult::Applied { status, payment }) => {
            tracing::info!(kind, ?status, ?payment, "event applied");
        }
        Ok(ProcessResult::Ignored) => {
            tracing::debug!(kind, "event ignored");
        }
        Err(e) => {
            tracing::error!(kind, error = %e, "event processing failed");
        }
    }
}
