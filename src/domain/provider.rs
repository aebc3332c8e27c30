use {
    super::{
        error::PipelineError,
        id::{CheckoutSessionId, SubscriptionId},
        money::Money,
        subscription::SubscriptionStatus,
    },
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::{collections::HashMap, fmt, future::Future, pin::Pin},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Card-network processor.
    Stripe,
    /// Regional UPI/wallet processor.
    Razorpay,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Razorpay => "razorpay",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Provider {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "stripe" => Ok(Self::Stripe),
            "razorpay" => Ok(Self::Razorpay),
            other => Err(PipelineError::InvalidRequest(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Subscription,
    Payment,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::Payment => "payment",
        }
    }
}

impl TryFrom<&str> for CheckoutMode {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "subscription" => Ok(Self::Subscription),
            "payment" => Ok(Self::Payment),
            other => Err(PipelineError::InvalidRequest(format!(
                "unsupported checkout mode: {other}"
            ))),
        }
    }
}

/// Everything the card adapter needs to open a hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Canonical remote subscription state, fetched by id.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSubscription {
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
}

/// A remote order (Razorpay order or Stripe payment intent) as the provider
/// returned it. `raw` is the provider's full JSON, handed back to the client
/// so it can open its payment widget.
#[derive(Debug, Clone)]
pub struct RemoteOrder {
    pub id: String,
    pub money: Money,
    pub status: Option<String>,
    pub client_secret: Option<String>,
    pub raw: serde_json::Value,
}

pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PipelineError>> + Send + 'a>>;

/// Hosted checkout + subscription lookup (card network).
pub trait CheckoutGateway: Send + Sync {
    fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> GatewayFuture<'_, CheckoutSessionId>;

    fn retrieve_subscription(&self, id: &SubscriptionId) -> GatewayFuture<'_, RemoteSubscription>;
}

/// One-off remote orders. `receipt` is the merchant-side reference.
pub trait OrderGateway: Send + Sync {
    fn create_order(&self, money: Money, receipt: String) -> GatewayFuture<'_, RemoteOrder>;
}
