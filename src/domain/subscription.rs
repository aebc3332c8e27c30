use {
    super::{provider::Provider, transition::Transition},
    chrono::{DateTime, Utc},
    serde::{Serialize, Serializer},
    std::fmt,
    uuid::Uuid,
};

/// Local subscription status. `Pending` is ours (checkout opened, nothing
/// settled yet); the rest mirror the card network's subscription lifecycle,
/// with `Other` keeping any status the provider adds later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Pending,
    Incomplete,
    IncompleteExpired,
    Trialing,
    Active,
    PastDue,
    Unpaid,
    Paused,
    Canceled,
    Other(String),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::IncompleteExpired)
    }

    /// `pending → active → {past_due, canceled}`; provider statuses overwrite
    /// any non-terminal status (last write wins), nothing goes back to
    /// `pending`, terminal statuses stay put.
    pub fn can_transition_to(&self, next: &SubscriptionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        *next != Self::Pending || *self == Self::Pending
    }

    /// Same-status updates still apply: renewals carry a fresh period end.
    pub fn decide(&self, next: &SubscriptionStatus) -> Transition {
        if self.is_terminal() && self == next {
            Transition::Noop
        } else if self.can_transition_to(next) {
            Transition::Apply
        } else {
            Transition::Reject
        }
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "incomplete" => Self::Incomplete,
            "incomplete_expired" => Self::IncompleteExpired,
            "trialing" => Self::Trialing,
            "active" => Self::Active,
            "past_due" => Self::PastDue,
            "unpaid" => Self::Unpaid,
            "paused" => Self::Paused,
            // Stripe spells it with one "l"; accept the British spelling too.
            "canceled" | "cancelled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for SubscriptionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Stored subscription (for reads).
///
/// `provider_subscription_id` is a mutable key: it holds the checkout session
/// id until the webhook engine re-keys the row to the real subscription id.
#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: Provider,
    pub provider_subscription_id: String,
    pub price_id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: Provider,
    pub provider_subscription_id: String,
    pub price_id: String,
    pub status: SubscriptionStatus,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl NewSubscription {
    /// A checkout was opened: keyed by the session id until settlement.
    pub fn pending_checkout(user_id: Uuid, session_id: &str, price_id: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            provider: Provider::Stripe,
            provider_subscription_id: session_id.to_string(),
            price_id: price_id.to_string(),
            status: SubscriptionStatus::Pending,
            current_period_end: None,
        }
    }
}

/// Unix seconds from the provider → absolute timestamp.
pub fn period_end_from_unix(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}
