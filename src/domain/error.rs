use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or malformed caller input. User-correctable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Webhook signature missing, malformed or wrong. No state is touched.
    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    /// Remote provider call failed or timed out. Never retried internally.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Uniqueness violation on insert. Callers treat this as "already applied".
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// Event names an order/subscription/user that does not exist locally.
    #[error("unknown reference: {0}")]
    UnknownReference(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("migration: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
