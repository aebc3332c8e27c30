pub mod order_repo;
pub mod payment_repo;
pub mod subscription_repo;
pub mod user_repo;

use {
    crate::domain::{
        error::PipelineError,
        money::{Currency, Money, MoneyAmount},
    },
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    },
    std::{str::FromStr, time::Duration},
};

/// Open (creating if needed) the ledger database and bring the schema up to
/// date. WAL lets readers run alongside the single writer; the busy timeout
/// absorbs short write contention between concurrent webhooks.
pub async fn connect(database_url: &str) -> Result<SqlitePool, PipelineError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), PipelineError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Unique-constraint violations become `DuplicateKey`; everything else stays
/// a database error.
pub(crate) fn map_unique(err: sqlx::Error, what: impl FnOnce() -> String) -> PipelineError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PipelineError::DuplicateKey(what())
        }
        _ => PipelineError::Database(err),
    }
}

/// A stored value the domain refuses to parse.
pub(crate) fn corrupt(column: &str, err: PipelineError) -> PipelineError {
    PipelineError::Database(sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(err),
    })
}

pub(crate) fn money_from_row(amount: i64, currency: &str) -> Result<Money, PipelineError> {
    let amount = MoneyAmount::new(amount).map_err(|e| corrupt("amount", e))?;
    let currency = Currency::from_provider_code(currency).map_err(|e| corrupt("currency", e))?;
    Ok(Money::new(amount, currency))
}
