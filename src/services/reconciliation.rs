//! Applies classified provider events to the ledger.
//!
//! Every write is a single-row statement. Duplicate delivery is absorbed by
//! the unique key on payments; out-of-order delivery by the status state
//! machines and compare-and-set updates.

use {
    crate::{
        domain::{
            error::PipelineError,
            event::{
                CheckoutCompleted, InvoicePaid, LedgerEvent, PaymentIntentSucceeded,
                WalletPaymentCaptured,
            },
            money::Money,
            order::OrderStatus,
            payment::{NewPayment, NewPaymentParams},
            provider::{CheckoutGateway, Provider},
            subscription::{SubscriptionStatus, period_end_from_unix},
            transition::Transition,
            user::{Email, User},
        },
        infra::sqlite::{
            order_repo::{find_order_by_provider_order_id, update_order_status},
            payment_repo::insert_payment,
            subscription_repo::{
                Rekey, find_subscription_by_key, rekey_subscription, update_subscription_status,
            },
            user_repo::{find_user_by_email, find_user_by_id, get_or_create_user},
        },
    },
    chrono::{DateTime, Utc},
    sqlx::SqlitePool,
    uuid::Uuid,
};

/// How many times a status update re-reads after losing a compare-and-set.
const STATUS_CAS_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// New payment row inserted.
    Recorded(Uuid),
    /// Same settlement already recorded (duplicate delivery).
    Duplicate,
    /// Event does not produce a payment: no resolvable user on checkout, or a
    /// card intent this service did not open.
    NotRecorded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Status written.
    Advanced,
    /// Incoming status equals the stored terminal one.
    Unchanged,
    /// State machine refused the move; the stored status stays.
    Rejected { current: String },
    /// No local row carries the referenced id.
    UnknownReference,
    /// Lost every compare-and-set round to concurrent writers.
    Superseded,
    /// Event carries no status change.
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    Applied {
        status: StatusOutcome,
        payment: PaymentOutcome,
    },
    /// Classified but intentionally not acted on.
    Ignored,
}

pub async fn process(
    pool: &SqlitePool,
    checkout: &dyn CheckoutGateway,
    event: LedgerEvent,
) -> Result<ProcessResult, PipelineError> {
    match event {
        LedgerEvent::CheckoutCompleted(e) => checkout_completed(pool, checkout, e).await,
        LedgerEvent::InvoicePaid(e) => invoice_paid(pool, e).await,
        LedgerEvent::PaymentIntentSucceeded(e) => payment_intent_succeeded(pool, e).await,
        LedgerEvent::WalletPaymentCaptured(e) => wallet_payment_captured(pool, e).await,
        LedgerEvent::SubscriptionLifecycle { event_type } => {
            tracing::info!(%event_type, "subscription lifecycle event, not acted on");
            Ok(ProcessResult::Ignored)
        }
        LedgerEvent::Ignored { event_type } => {
            tracing::debug!(%event_type, "unhandled event type");
            Ok(ProcessResult::Ignored)
        }
    }
}

// ── Card network ────────────────────────────────────────────────────────────

async fn checkout_completed(
    pool: &SqlitePool,
    checkout: &dyn CheckoutGateway,
    event: CheckoutCompleted,
) -> Result<ProcessResult, PipelineError> {
    let user = resolve_checkout_user(pool, event.user_id, event.customer_email.as_deref()).await?;

    // Re-key before anything that can fail remotely, so a provider outage
    // only costs the status refresh.
    let rekey = match &event.subscription_id {
        Some(sub_id) => {
            let rekey =
                rekey_subscription(pool, Provider::Stripe, event.session_id.as_str(), sub_id.as_str())
                    .await?;
            tracing::info!(session_id = %event.session_id, subscription_id = %sub_id, ?rekey, "subscription re-key");
            if rekey == Rekey::Missing {
                tracing::warn!(
                    session_id = %event.session_id,
                    subscription_id = %sub_id,
                    "checkout completed for unknown subscription"
                );
            }
            Some(rekey)
        }
        None => None,
    };

    let payment = match &user {
        Some(user) => {
            record_payment(pool, NewPaymentParams {
                user_id: Some(user.id),
                provider: Provider::Stripe,
                provider_payment_id: event.session_id.as_str().to_string(),
                money: event.money,
                status: "completed".to_string(),
                metadata: event.raw,
            })
            .await?
        }
        None => {
            tracing::warn!(session_id = %event.session_id, "no user for checkout, payment not recorded");
            PaymentOutcome::NotRecorded
        }
    };

    let status = match (rekey, &event.subscription_id) {
        (Some(Rekey::Missing), _) => StatusOutcome::UnknownReference,
        (Some(_), Some(sub_id)) => {
            let remote = checkout.retrieve_subscription(sub_id).await?;
            advance_subscription(pool, sub_id.as_str(), remote.status, remote.current_period_end)
                .await?
        }
        _ => {
            advance_subscription(pool, event.session_id.as_str(), SubscriptionStatus::Active, None)
                .await?
        }
    };

    Ok(ProcessResult::Applied { status, payment })
}

async fn invoice_paid(pool: &SqlitePool, event: InvoicePaid) -> Result<ProcessResult, PipelineError> {
    let mut user_id = None;

    let status = match &event.subscription_id {
        Some(sub_id) => match find_subscription_by_key(pool, Provider::Stripe, sub_id.as_str()).await? {
            Some(sub) => {
                user_id = Some(sub.user_id);
                advance_subscription(
                    pool,
                    sub_id.as_str(),
                    SubscriptionStatus::Active,
                    period_end_from_unix(event.period_end),
                )
                .await?
            }
            None => {
                tracing::warn!(invoice_id = %event.invoice_id, subscription_id = %sub_id, "invoice for unknown subscription");
                StatusOutcome::UnknownReference
            }
        },
        None => StatusOutcome::NotApplicable,
    };

    if user_id.is_none() {
        user_id = existing_user_for_email(pool, event.customer_email.as_deref())
            .await?
            .map(|u| u.id);
    }

    let payment = record_payment(pool, NewPaymentParams {
        user_id,
        provider: Provider::Stripe,
        provider_payment_id: event.invoice_id.into_inner(),
        money: event.money,
        status: event.status,
        metadata: event.raw,
    })
    .await?;

    Ok(ProcessResult::Applied { status, payment })
}

async fn payment_intent_succeeded(
    pool: &SqlitePool,
    event: PaymentIntentSucceeded,
) -> Result<ProcessResult, PipelineError> {
    settle_order(
        pool,
        Settlement {
            provider: Provider::Stripe,
            order_id: Some(event.payment_intent_id.as_str()),
            payment_id: event.payment_intent_id.as_str(),
            money: event.money,
            status: event.status,
            email: None,
            raw: event.raw,
            record_without_order: false,
        },
    )
    .await
}

// ── Wallet ──────────────────────────────────────────────────────────────────

async fn wallet_payment_captured(
    pool: &SqlitePool,
    event: WalletPaymentCaptured,
) -> Result<ProcessResult, PipelineError> {
    settle_order(
        pool,
        Settlement {
            provider: Provider::Razorpay,
            order_id: event.order_id.as_ref().map(|id| id.as_str()),
            payment_id: event.payment_id.as_str(),
            money: event.money,
            status: event.status.unwrap_or_else(|| "captured".to_string()),
            email: event.email.as_deref(),
            raw: event.raw,
            record_without_order: true,
        },
    )
    .await
}

/// A settlement reported against a one-off order.
struct Settlement<'a> {
    provider: Provider,
    order_id: Option<&'a str>,
    payment_id: &'a str,
    money: Money,
    status: String,
    email: Option<&'a str>,
    raw: serde_json::Value,
    /// Wallet captures are recorded even when no local order matches. Card
    /// intents are not: any intent we did not open belongs to another flow
    /// (checkout, invoices) that records its own payment.
    record_without_order: bool,
}

/// Shared settlement path for one-off orders: record the payment under the
/// order's user and push the order to its settled status.
async fn settle_order(
    pool: &SqlitePool,
    settlement: Settlement<'_>,
) -> Result<ProcessResult, PipelineError> {
    let Settlement {
        provider,
        order_id,
        payment_id,
        money,
        status: payment_status,
        email,
        raw,
        record_without_order,
    } = settlement;

    let order = match order_id {
        Some(id) => find_order_by_provider_order_id(pool, provider, id).await?,
        None => None,
    };

    if order.is_none() && !record_without_order {
        tracing::warn!(%provider, payment_id, "settlement for an order we did not open, not recorded");
        return Ok(ProcessResult::Applied {
            status: StatusOutcome::UnknownReference,
            payment: PaymentOutcome::NotRecorded,
        });
    }

    let user_id = match order.as_ref().and_then(|o| o.user_id) {
        Some(id) => Some(id),
        None => existing_user_for_email(pool, email).await?.map(|u| u.id),
    };

    let next = OrderStatus::from_settlement(Some(payment_status.as_str()));
    let payment = record_payment(pool, NewPaymentParams {
        user_id,
        provider,
        provider_payment_id: payment_id.to_string(),
        money,
        status: payment_status,
        metadata: raw,
    })
    .await?;

    let status = match (order_id, &order) {
        (Some(id), Some(_)) => advance_order(pool, provider, id, next).await?,
        (Some(id), None) => {
            tracing::warn!(%provider, order_id = id, payment_id, "settlement for unknown order");
            StatusOutcome::UnknownReference
        }
        (None, _) => StatusOutcome::NotApplicable,
    };

    Ok(ProcessResult::Applied { status, payment })
}

// ── Shared steps ────────────────────────────────────────────────────────────

async fn record_payment(
    pool: &SqlitePool,
    params: NewPaymentParams,
) -> Result<PaymentOutcome, PipelineError> {
    let payment = NewPayment::new(params);
    match insert_payment(pool, &payment).await {
        Ok(id) => {
            tracing::info!(
                payment_id = %id,
                provider = %payment.provider(),
                provider_payment_id = payment.provider_payment_id(),
                amount = payment.money().amount().minor_units(),
                currency = %payment.money().currency(),
                "payment recorded"
            );
            Ok(PaymentOutcome::Recorded(id))
        }
        Err(PipelineError::DuplicateKey(what)) => {
            tracing::info!(%what, "payment already recorded");
            Ok(PaymentOutcome::Duplicate)
        }
        Err(e) => Err(e),
    }
}

/// Checkout user: the id written at origination if it still exists,
/// otherwise the customer email (creating the user on first sight).
async fn resolve_checkout_user(
    pool: &SqlitePool,
    user_id: Option<Uuid>,
    email: Option<&str>,
) -> Result<Option<User>, PipelineError> {
    if let Some(id) = user_id {
        if let Some(user) = find_user_by_id(pool, id).await? {
            return Ok(Some(user));
        }
        tracing::warn!(user_id = %id, "checkout metadata names an unknown user");
    }

    match Email::parse_optional(email) {
        Ok(Some(email)) => get_or_create_user(pool, &email).await.map(Some),
        Ok(None) => Ok(None),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unusable customer email");
            Ok(None)
        }
    }
}

async fn existing_user_for_email(
    pool: &SqlitePool,
    email: Option<&str>,
) -> Result<Option<User>, PipelineError> {
    match Email::parse_optional(email) {
        Ok(Some(email)) => find_user_by_email(pool, &email).await,
        _ => Ok(None),
    }
}

async fn advance_subscription(
    pool: &SqlitePool,
    key: &str,
    next: SubscriptionStatus,
    period_end: Option<DateTime<Utc>>,
) -> Result<StatusOutcome, PipelineError> {
    for _ in 0..STATUS_CAS_ATTEMPTS {
        let Some(current) = find_subscription_by_key(pool, Provider::Stripe, key).await? else {
            tracing::warn!(key, "no subscription row for key");
            return Ok(StatusOutcome::UnknownReference);
        };

        match current.status.decide(&next) {
            Transition::Noop => return Ok(StatusOutcome::Unchanged),
            Transition::Reject => {
                tracing::warn!(key, from = %current.status, to = %next, "subscription transition rejected");
                return Ok(StatusOutcome::Rejected {
                    current: current.status.to_string(),
                });
            }
            Transition::Apply => {
                if update_subscription_status(
                    pool,
                    Provider::Stripe,
                    key,
                    &current.status,
                    &next,
                    period_end,
                )
                .await?
                {
                    tracing::info!(key, from = %current.status, to = %next, "subscription status updated");
                    return Ok(StatusOutcome::Advanced);
                }
                tracing::debug!(key, "subscription changed underneath, re-reading");
            }
        }
    }
    Ok(StatusOutcome::Superseded)
}

async fn advance_order(
    pool: &SqlitePool,
    provider: Provider,
    order_id: &str,
    next: OrderStatus,
) -> Result<StatusOutcome, PipelineError> {
    for _ in 0..STATUS_CAS_ATTEMPTS {
        let Some(current) = find_order_by_provider_order_id(pool, provider, order_id).await? else {
            return Ok(StatusOutcome::UnknownReference);
        };

        match current.status.decide(&next) {
            Transition::Noop => return Ok(StatusOutcome::Unchanged),
            Transition::Reject => {
                tracing::warn!(order_id, from = %current.status, to = %next, "order transition rejected");
                return Ok(StatusOutcome::Rejected {
                    current: current.status.to_string(),
                });
            }
            Transition::Apply => {
                if update_order_status(pool, provider, order_id, current.status, next).await? {
                    tracing::info!(order_id, from = %current.status, to = %next, "order status updated");
                    return Ok(StatusOutcome::Advanced);
                }
                tracing::debug!(order_id, "order changed underneath, re-reading");
            }
        }
    }
    Ok(StatusOutcome::Superseded)
}
