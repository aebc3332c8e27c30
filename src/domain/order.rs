use {
    super::{error::PipelineError, money::Money, provider::Provider, transition::Transition},
    chrono::{DateTime, Utc},
    serde::Serialize,
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Pending,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    /// Lifecycle rank; higher means further along. Paid and Failed are both
    /// terminal, so neither can replace the other.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Pending => 1,
            Self::Paid | Self::Failed => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 2
    }

    pub fn can_transition_to(&self, next: &OrderStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn decide(&self, next: &OrderStatus) -> Transition {
        if self == next {
            Transition::Noop
        } else if self.can_transition_to(next) {
            Transition::Apply
        } else {
            Transition::Reject
        }
    }

    /// Status of a freshly opened remote order. Razorpay reports
    /// `created | attempted | paid`; Stripe payment intents report their own
    /// lifecycle. Absent or unrecognized values mean `created`.
    pub fn from_remote_order(status: Option<&str>) -> Self {
        match status {
            None | Some("created") => Self::Created,
            Some("attempted" | "processing") => Self::Pending,
            Some("requires_payment_method" | "requires_confirmation" | "requires_action") => {
                Self::Created
            }
            Some("paid" | "succeeded") => Self::Paid,
            Some("canceled") => Self::Failed,
            Some(other) => {
                tracing::warn!(status = other, "unknown remote order status, treating as created");
                Self::Created
            }
        }
    }

    /// Where an order lands once the provider reports a settlement for it.
    /// Settlement events are `payment.captured` / `order.paid` /
    /// `payment_intent.succeeded`, so anything but an explicit failure or a
    /// bare authorization counts as paid.
    pub fn from_settlement(payment_status: Option<&str>) -> Self {
        match payment_status {
            Some("failed") => Self::Failed,
            Some("authorized" | "created") => Self::Pending,
            _ => Self::Paid,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "created" => Ok(Self::Created),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            other => Err(PipelineError::InvalidRequest(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Stored order (for reads).
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub provider: Provider,
    pub provider_order_id: String,
    pub money: Money,
    pub status: OrderStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// For INSERT: id generated in Rust via Uuid::now_v7().
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub provider: Provider,
    pub provider_order_id: String,
    pub money: Money,
    pub status: OrderStatus,
    pub metadata: serde_json::Value,
}

impl NewOrder {
    pub fn new(
        user_id: Option<Uuid>,
        provider: Provider,
        provider_order_id: impl Into<String>,
        money: Money,
        status: OrderStatus,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            provider,
            provider_order_id: provider_order_id.into(),
            money,
            status,
            metadata,
        }
    }
}
