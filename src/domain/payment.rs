use {
    super::{money::Money, provider::Provider},
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

/// Stored payment (for reads). Append-only: rows are never updated.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub provider: Provider,
    pub provider_payment_id: String,
    pub money: Money,
    /// Provider-reported settlement status, kept verbatim
    /// (`completed`, `paid`, `captured`, `succeeded`, ...).
    pub status: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub struct NewPaymentParams {
    pub user_id: Option<Uuid>,
    pub provider: Provider,
    pub provider_payment_id: String,
    pub money: Money,
    pub status: String,
    pub metadata: serde_json::Value,
}

/// For INSERT: id generated in Rust via Uuid::now_v7().
#[derive(Debug, Clone)]
pub struct NewPayment {
    id: Uuid,
    user_id: Option<Uuid>,
    provider: Provider,
    provider_payment_id: String,
    money: Money,
    status: String,
    metadata: serde_json::Value,
}

impl NewPayment {
    pub fn new(params: NewPaymentParams) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: params.user_id,
            provider: params.provider,
            provider_payment_id: params.provider_payment_id,
            money: params.money,
            status: params.status,
            metadata: params.metadata,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn provider_payment_id(&self) -> &str {
        &self.provider_payment_id
    }

    pub fn money(&self) -> &Money {
        &self.money
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }
}
