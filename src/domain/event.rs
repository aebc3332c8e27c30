//! Provider webhook envelopes and their classification into ledger events.
//!
//! Only the fields the engine acts on are typed; the full object is kept as
//! `raw` so it can be stored as opaque payment metadata.

use {
    super::{
        error::PipelineError,
        id::{CheckoutSessionId, InvoiceId, PaymentIntentId, SubscriptionId, WalletOrderId, WalletPaymentId},
        money::{Currency, Money},
    },
    serde::Deserialize,
    std::collections::HashMap,
    uuid::Uuid,
};

// ── Card network ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    /// `evt_xxx`
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionObject {
    id: String,
    subscription: Option<String>,
    amount_total: Option<i64>,
    currency: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<CustomerDetails>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvoiceObject {
    id: String,
    subscription: Option<String>,
    parent: Option<InvoiceParent>,
    amount_paid: Option<i64>,
    currency: Option<String>,
    status: Option<String>,
    customer_email: Option<String>,
    lines: Option<InvoiceLines>,
}

/// Newer API versions moved `invoice.subscription` under
/// `parent.subscription_details.subscription`.
#[derive(Debug, Deserialize)]
struct InvoiceParent {
    subscription_details: Option<SubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionDetails {
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvoiceLines {
    #[serde(default)]
    data: Vec<InvoiceLine>,
}

#[derive(Debug, Deserialize)]
struct InvoiceLine {
    period: Option<Period>,
}

#[derive(Debug, Deserialize)]
struct Period {
    end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentObject {
    id: String,
    /// Set when the intent collects a subscription invoice.
    invoice: Option<String>,
    amount: Option<i64>,
    amount_received: Option<i64>,
    currency: Option<String>,
    status: Option<String>,
}

// ── Wallet ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RazorpayEvent {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WalletPaymentObject {
    id: String,
    order_id: Option<String>,
    amount: Option<i64>,
    currency: Option<String>,
    status: Option<String>,
    email: Option<String>,
}

// ── Classified events ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CheckoutCompleted {
    pub session_id: CheckoutSessionId,
    pub subscription_id: Option<SubscriptionId>,
    pub money: Money,
    /// `metadata.user_id` as written at origination, if it parses.
    pub user_id: Option<Uuid>,
    pub customer_email: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug)]
pub struct InvoicePaid {
    pub invoice_id: InvoiceId,
    pub subscription_id: Option<SubscriptionId>,
    pub money: Money,
    pub status: String,
    pub period_end: Option<i64>,
    pub customer_email: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug)]
pub struct PaymentIntentSucceeded {
    pub payment_intent_id: PaymentIntentId,
    pub money: Money,
    pub status: String,
    pub raw: serde_json::Value,
}

#[derive(Debug)]
pub struct WalletPaymentCaptured {
    pub payment_id: WalletPaymentId,
    pub order_id: Option<WalletOrderId>,
    pub money: Money,
    pub status: Option<String>,
    pub email: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug)]
pub enum LedgerEvent {
    CheckoutCompleted(CheckoutCompleted),
    InvoicePaid(InvoicePaid),
    PaymentIntentSucceeded(PaymentIntentSucceeded),
    WalletPaymentCaptured(WalletPaymentCaptured),
    /// `customer.subscription.*`: classified, not acted on.
    SubscriptionLifecycle { event_type: String },
    /// Anything else the provider sends. Accepted and discarded.
    Ignored { event_type: String },
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CheckoutCompleted(_) => "checkout_completed",
            Self::InvoicePaid(_) => "invoice_paid",
            Self::PaymentIntentSucceeded(_) => "payment_intent_succeeded",
            Self::WalletPaymentCaptured(_) => "wallet_payment_captured",
            Self::SubscriptionLifecycle { .. } => "subscription_lifecycle",
            Self::Ignored { .. } => "ignored",
        }
    }
}

impl StripeEvent {
    pub fn classify(self) -> Result<LedgerEvent, PipelineError> {
        let object = self.data.object;
        match self.event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = serde_json::from_value(object.clone())?;
                let metadata = session.metadata.unwrap_or_default();
                let user_id = metadata
                    .get("user_id")
                    .or_else(|| metadata.get("userId"))
                    .and_then(|v| Uuid::parse_str(v).ok());
                let customer_email = session
                    .customer_details
                    .and_then(|d| d.email)
                    .or(session.customer_email);
                Ok(LedgerEvent::CheckoutCompleted(CheckoutCompleted {
                    session_id: CheckoutSessionId::new(session.id)?,
                    subscription_id: session.subscription.map(SubscriptionId::new).transpose()?,
                    money: Money::from_provider(
                        session.amount_total,
                        session.currency.as_deref(),
                        Currency::Usd,
                    )?,
                    user_id,
                    customer_email,
                    raw: object,
                }))
            }
            "invoice.payment_succeeded" | "invoice.paid" => {
                let invoice: InvoiceObject = serde_json::from_value(object.clone())?;
                let subscription = invoice.subscription.or_else(|| {
                    invoice
                        .parent
                        .and_then(|p| p.subscription_details)
                        .and_then(|d| d.subscription)
                });
                let period_end = invoice
                    .lines
                    .and_then(|l| l.data.into_iter().next())
                    .and_then(|line| line.period)
                    .and_then(|p| p.end);
                Ok(LedgerEvent::InvoicePaid(InvoicePaid {
                    invoice_id: InvoiceId::new(invoice.id)?,
                    subscription_id: subscription.map(SubscriptionId::new).transpose()?,
                    money: Money::from_provider(
                        invoice.amount_paid,
                        invoice.currency.as_deref(),
                        Currency::Usd,
                    )?,
                    status: invoice.status.unwrap_or_else(|| "paid".to_string()),
                    period_end,
                    customer_email: invoice.customer_email,
                    raw: object,
                }))
            }
            "payment_intent.succeeded" => {
                let pi: PaymentIntentObject = serde_json::from_value(object.clone())?;
                if let Some(invoice) = &pi.invoice {
                    // Recorded once, through the invoice event.
                    tracing::debug!(payment_intent = %pi.id, %invoice, "invoice payment intent skipped");
                    return Ok(LedgerEvent::Ignored { event_type: self.event_type });
                }
                Ok(LedgerEvent::PaymentIntentSucceeded(PaymentIntentSucceeded {
                    payment_intent_id: PaymentIntentId::new(pi.id)?,
                    money: Money::from_provider(
                        pi.amount_received.or(pi.amount),
                        pi.currency.as_deref(),
                        Currency::Usd,
                    )?,
                    status: pi.status.unwrap_or_else(|| "succeeded".to_string()),
                    raw: object,
                }))
            }
            t if t.starts_with("customer.subscription.") => {
                Ok(LedgerEvent::SubscriptionLifecycle { event_type: self.event_type })
            }
            _ => Ok(LedgerEvent::Ignored { event_type: self.event_type }),
        }
    }
}

impl RazorpayEvent {
    pub fn classify(self) -> Result<LedgerEvent, PipelineError> {
        match self.event.as_str() {
            "payment.captured" | "order.paid" => {
                let Some(entity) = self.payload.pointer("/payment/entity").cloned() else {
                    tracing::warn!(event = %self.event, "wallet event without payment entity");
                    return Ok(LedgerEvent::Ignored { event_type: self.event });
                };
                let payment: WalletPaymentObject = serde_json::from_value(entity.clone())?;
                Ok(LedgerEvent::WalletPaymentCaptured(WalletPaymentCaptured {
                    payment_id: WalletPaymentId::new(payment.id)?,
                    order_id: payment.order_id.map(WalletOrderId::new).transpose()?,
                    money: Money::from_provider(
                        payment.amount,
                        payment.currency.as_deref(),
                        Currency::Inr,
                    )?,
                    status: payment.status,
                    email: payment.email,
                    raw: entity,
                }))
            }
            _ => Ok(LedgerEvent::Ignored { event_type: self.event }),
        }
    }
}
