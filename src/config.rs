use {std::time::Duration, thiserror::Error};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key}: invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub razorpay_key_id: Option<String>,
    pub razorpay_key_secret: Option<String>,
    pub razorpay_webhook_secret: Option<String>,
    pub razorpay_api_base: String,
    pub allowed_origin: String,
    pub frontend_base: String,
    pub port: u16,
    pub database_url: String,
    pub provider_timeout: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = parse_or(get("PORT"), "PORT", 4242u16)?;
        let provider_timeout_secs = parse_or(get("PROVIDER_TIMEOUT_SECS"), "PROVIDER_TIMEOUT_SECS", 10u64)?;
        if provider_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "PROVIDER_TIMEOUT_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        let provider_timeout = Duration::from_secs(provider_timeout_secs);

        Ok(Config {
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: get("STRIPE_WEBHOOK_SECRET"),
            razorpay_key_id: get("RAZORPAY_KEY_ID"),
            razorpay_key_secret: get("RAZORPAY_KEY_SECRET"),
            razorpay_webhook_secret: get("RAZORPAY_WEBHOOK_SECRET"),
            razorpay_api_base: get("RAZORPAY_API_BASE")
                .unwrap_or_else(|| crate::adapters::razorpay_client::DEFAULT_API_BASE.to_string()),
            allowed_origin: get("ALLOWED_ORIGIN").unwrap_or_else(|| "*".to_string()),
            frontend_base: get("FRONTEND_BASE")
                .unwrap_or_else(|| "http://localhost:5500".to_string()),
            port,
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite://data.db".to_string()),
            provider_timeout,
            // Room for a provider round trip plus ledger writes.
            request_timeout: provider_timeout * 2 + Duration::from_secs(10),
        })
    }

    /// Startup warnings for anything that leaves the service degraded.
    pub fn warn_insecure(&self) {
        if self.stripe_webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set: stripe webhooks are accepted WITHOUT signature verification");
        }
        if self.razorpay_webhook_secret.is_none() {
            tracing::warn!("RAZORPAY_WEBHOOK_SECRET not set: razorpay webhooks are accepted WITHOUT signature verification");
        }
        if self.stripe_secret_key.is_none() {
            tracing::warn!("STRIPE_SECRET_KEY not set: card origination calls will fail");
        }
        if self.razorpay_key_id.is_none() || self.razorpay_key_secret.is_none() {
            tracing::warn!("RAZORPAY_KEY_ID / RAZORPAY_KEY_SECRET not set: wallet orders will fail");
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}
