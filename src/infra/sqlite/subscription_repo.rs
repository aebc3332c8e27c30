use {
    super::{corrupt, map_unique},
    crate::domain::{
        error::PipelineError,
        provider::Provider,
        subscription::{NewSubscription, Subscription, SubscriptionStatus},
    },
    chrono::{DateTime, Utc},
    sqlx::SqlitePool,
    uuid::Uuid,
};

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    provider: String,
    provider_subscription_id: String,
    price_id: String,
    status: String,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = PipelineError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            provider: Provider::try_from(row.provider.as_str())
                .map_err(|e| corrupt("provider", e))?,
            provider_subscription_id: row.provider_subscription_id,
            price_id: row.price_id,
            status: SubscriptionStatus::from(row.status.as_str()),
            current_period_end: row.current_period_end,
            created_at: row.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, provider, provider_subscription_id, price_id,
           status, current_period_end, created_at
    FROM subscriptions
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rekey {
    /// Placeholder row now carries the real id.
    Moved,
    /// A row with the real id already exists; the placeholder (if any) is
    /// left alone.
    AlreadyKeyed,
    /// Neither key is known locally.
    Missing,
}

pub async fn insert_subscription(
    pool: &SqlitePool,
    subscription: &NewSubscription,
) -> Result<Uuid, PipelineError> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions
            (id, user_id, provider, provider_subscription_id, price_id,
             status, current_period_end, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(subscription.id)
    .bind(subscription.user_id)
    .bind(subscription.provider.as_str())
    .bind(&subscription.provider_subscription_id)
    .bind(&subscription.price_id)
    .bind(subscription.status.as_str())
    .bind(subscription.current_period_end)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| {
        map_unique(e, || {
            format!(
                "subscription {}/{}",
                subscription.provider, subscription.provider_subscription_id
            )
        })
    })?;

    Ok(subscription.id)
}

/// `key` is either the checkout session placeholder or the real id.
pub async fn find_subscription_by_key(
    pool: &SqlitePool,
    provider: Provider,
    key: &str,
) -> Result<Option<Subscription>, PipelineError> {
    sqlx::query_as::<_, SubscriptionRow>(&format!(
        "{SELECT_COLUMNS} WHERE provider = ? AND provider_subscription_id = ?"
    ))
    .bind(provider.as_str())
    .bind(key)
    .fetch_optional(pool)
    .await?
    .map(Subscription::try_from)
    .transpose()
}

/// Move a row from its placeholder key to the real subscription id.
/// Safe to repeat: a second call finds the row already keyed.
pub async fn rekey_subscription(
    pool: &SqlitePool,
    provider: Provider,
    placeholder_key: &str,
    real_key: &str,
) -> Result<Rekey, PipelineError> {
    let moved = sqlx::query(
        r#"
        UPDATE subscriptions SET provider_subscription_id = ?
        WHERE provider = ? AND provider_subscription_id = ?
        "#,
    )
    .bind(real_key)
    .bind(provider.as_str())
    .bind(placeholder_key)
    .execute(pool)
    .await;

    match moved {
        Ok(result) if result.rows_affected() == 1 => Ok(Rekey::Moved),
        Ok(_) => {
            if find_subscription_by_key(pool, provider, real_key).await?.is_some() {
                Ok(Rekey::AlreadyKeyed)
            } else {
                Ok(Rekey::Missing)
            }
        }
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            tracing::warn!(
                placeholder = placeholder_key,
                real = real_key,
                "both placeholder and real subscription rows exist, keeping real"
            );
            Ok(Rekey::AlreadyKeyed)
        }
        Err(e) => Err(e.into()),
    }
}

/// Compare-and-set on status. A `None` period end keeps the stored one.
/// Returns whether the row was updated.
pub async fn update_subscription_status(
    pool: &SqlitePool,
    provider: Provider,
    key: &str,
    expected: &SubscriptionStatus,
    next: &SubscriptionStatus,
    current_period_end: Option<DateTime<Utc>>,
) -> Result<bool, PipelineError> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions
        SET status = ?, current_period_end = COALESCE(?, current_period_end)
        WHERE provider = ? AND provider_subscription_id = ? AND status = ?
        "#,
    )
    .bind(next.as_str())
    .bind(current_period_end)
    .bind(provider.as_str())
    .bind(key)
    .bind(expected.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Newest first.
pub async fn list_subscriptions_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
) -> Result<Vec<Subscription>, PipelineError> {
    sqlx::query_as::<_, SubscriptionRow>(&format!(
        "{SELECT_COLUMNS} WHERE user_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Subscription::try_from)
    .collect()
}
