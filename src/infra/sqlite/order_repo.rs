use {
    super::{corrupt, map_unique, money_from_row},
    crate::domain::{
        error::PipelineError,
        order::{NewOrder, Order, OrderStatus},
        provider::Provider,
    },
    chrono::{DateTime, Utc},
    sqlx::{SqlitePool, types::Json},
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Option<Uuid>,
    provider: String,
    provider_order_id: String,
    amount: i64,
    currency: String,
    status: String,
    metadata: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = PipelineError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            provider: Provider::try_from(row.provider.as_str())
                .map_err(|e| corrupt("provider", e))?,
            provider_order_id: row.provider_order_id,
            money: money_from_row(row.amount, &row.currency)?,
            status: OrderStatus::try_from(row.status.as_str()).map_err(|e| corrupt("status", e))?,
            metadata: row.metadata.0,
            created_at: row.created_at,
        })
    }
}

pub async fn insert_order(pool: &SqlitePool, order: &NewOrder) -> Result<Uuid, PipelineError> {
    sqlx::query(
        r#"
        INSERT INTO orders
            (id, user_id, provider, provider_order_id, amount, currency,
             status, metadata, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.provider.as_str())
    .bind(&order.provider_order_id)
    .bind(order.money.amount().minor_units())
    .bind(order.money.currency().to_string())
    .bind(order.status.as_str())
    .bind(Json(&order.metadata))
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| map_unique(e, || format!("order {}/{}", order.provider, order.provider_order_id)))?;

    Ok(order.id)
}

pub async fn find_order_by_provider_order_id(
    pool: &SqlitePool,
    provider: Provider,
    provider_order_id: &str,
) -> Result<Option<Order>, PipelineError> {
    sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT id, user_id, provider, provider_order_id, amount, currency,
               status, metadata, created_at
        FROM orders
        WHERE provider = ? AND provider_order_id = ?
        "#,
    )
    .bind(provider.as_str())
    .bind(provider_order_id)
    .fetch_optional(pool)
    .await?
    .map(Order::try_from)
    .transpose()
}

/// Compare-and-set: only writes if the row still has `expected`.
/// Returns whether the row was updated.
pub async fn update_order_status(
    pool: &SqlitePool,
    provider: Provider,
    provider_order_id: &str,
    expected: OrderStatus,
    next: OrderStatus,
) -> Result<bool, PipelineError> {
    let result = sqlx::query(
        "UPDATE orders SET status = ? WHERE provider = ? AND provider_order_id = ? AND status = ?",
    )
    .bind(next.as_str())
    .bind(provider.as_str())
    .bind(provider_order_id)
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
