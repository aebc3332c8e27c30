use {
    super::{corrupt, map_unique, money_from_row},
    crate::domain::{
        error::PipelineError,
        payment::{NewPayment, Payment},
        provider::Provider,
    },
    chrono::{DateTime, Utc},
    sqlx::{SqlitePool, types::Json},
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: Option<Uuid>,
    provider: String,
    provider_payment_id: String,
    amount: i64,
    currency: String,
    status: String,
    metadata: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = PipelineError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            provider: Provider::try_from(row.provider.as_str())
                .map_err(|e| corrupt("provider", e))?,
            provider_payment_id: row.provider_payment_id,
            money: money_from_row(row.amount, &row.currency)?,
            status: row.status,
            metadata: row.metadata.0,
            created_at: row.created_at,
        })
    }
}

/// Append a settlement. `DuplicateKey` when `(provider, provider_payment_id)`
/// is already recorded; callers treat that as "already applied".
pub async fn insert_payment(pool: &SqlitePool, payment: &NewPayment) -> Result<Uuid, PipelineError> {
    sqlx::query(
        r#"
        INSERT INTO payments
            (id, user_id, provider, provider_payment_id, amount, currency,
             status, metadata, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payment.id())
    .bind(payment.user_id())
    .bind(payment.provider().as_str())
    .bind(payment.provider_payment_id())
    .bind(payment.money().amount().minor_units())
    .bind(payment.money().currency().to_string())
    .bind(payment.status())
    .bind(Json(payment.metadata()))
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| {
        map_unique(e, || {
            format!("payment {}/{}", payment.provider(), payment.provider_payment_id())
        })
    })?;

    Ok(payment.id())
}

pub async fn find_payment(
    pool: &SqlitePool,
    provider: Provider,
    provider_payment_id: &str,
) -> Result<Option<Payment>, PipelineError> {
    sqlx::query_as::<_, PaymentRow>(
        r#"
        SELECT id, user_id, provider, provider_payment_id, amount, currency,
               status, metadata, created_at
        FROM payments
        WHERE provider = ? AND provider_payment_id = ?
        "#,
    )
    .bind(provider.as_str())
    .bind(provider_payment_id)
    .fetch_optional(pool)
    .await?
    .map(Payment::try_from)
    .transpose()
}

pub async fn count_payments_for(
    pool: &SqlitePool,
    provider: Provider,
    provider_payment_id: &str,
) -> Result<i64, PipelineError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM payments WHERE provider = ? AND provider_payment_id = ?",
    )
    .bind(provider.as_str())
    .bind(provider_payment_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
