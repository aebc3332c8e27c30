use {
    crate::domain::{
        error::PipelineError,
        money::Money,
        provider::{GatewayFuture, OrderGateway, RemoteOrder},
    },
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com/v1";

/// UPI/wallet gateway. Orders API over HTTPS with basic auth.
pub struct RazorpayGateway {
    http: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::ProviderUnavailable(format!("razorpay client: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: String,
    receipt: &'a str,
    payment_capture: u8,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    amount: Option<i64>,
    currency: Option<String>,
    status: Option<String>,
}

impl OrderGateway for RazorpayGateway {
    fn create_order(&self, money: Money, receipt: String) -> GatewayFuture<'_, RemoteOrder> {
        Box::pin(async move {
            let body = CreateOrderBody {
                amount: money.amount().minor_units(),
                currency: money.currency().as_upper(),
                receipt: &receipt,
                payment_capture: 1,
            };

            let response = self
                .http
                .post(format!("{}/orders", self.api_base))
                .basic_auth(&self.key_id, Some(&self.key_secret))
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "razorpay request failed");
                    PipelineError::ProviderUnavailable(format!("razorpay create order: {e}"))
                })?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                tracing::error!(%status, body = %text, "razorpay rejected order");
                return Err(PipelineError::ProviderUnavailable(format!(
                    "razorpay create order: HTTP {status}"
                )));
            }

            let raw: serde_json::Value = response.json().await.map_err(|e| {
                PipelineError::ProviderUnavailable(format!("razorpay create order: {e}"))
            })?;
            let order: OrderResponse = serde_json::from_value(raw.clone())?;

            Ok(RemoteOrder {
                id: order.id,
                money: Money::from_provider(
                    order.amount.or(Some(money.amount().minor_units())),
                    order.currency.as_deref(),
                    money.currency(),
                )?,
                status: order.status,
                client_secret: None,
                raw,
            })
        })
    }
}
