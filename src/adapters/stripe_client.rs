use {
    crate::domain::{
        error::PipelineError,
        id::{CheckoutSessionId, SubscriptionId},
        money::Money,
        provider::{
            CheckoutGateway, CheckoutRequest, GatewayFuture, OrderGateway, RemoteOrder,
            RemoteSubscription,
        },
        subscription::{SubscriptionStatus, period_end_from_unix},
    },
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, future::Future, time::Duration},
};

/// Card-network gateway. Checkout sessions, subscription lookup, and
/// payment intents (its "orders").
pub struct StripeGateway {
    client: stripe::Client,
    timeout: Duration,
}

impl StripeGateway {
    pub fn new(secret_key: &str, timeout: Duration) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
            timeout,
        }
    }

    async fn call<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, stripe::StripeError>>,
    ) -> Result<T, PipelineError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(call = what, error = %e, "stripe API error");
                Err(PipelineError::ProviderUnavailable(format!("stripe {what}: {e}")))
            }
            Err(_) => {
                tracing::error!(call = what, timeout = ?self.timeout, "stripe API timeout");
                Err(PipelineError::ProviderUnavailable(format!("stripe {what}: timed out")))
            }
        }
    }
}

// ── Wire shapes (only the fields we read or send) ──────────────────────────

#[derive(Serialize)]
struct CreateCheckoutSessionForm {
    mode: &'static str,
    success_url: String,
    cancel_url: String,
    line_items: Vec<LineItemForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_email: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    metadata: HashMap<String, String>,
}

#[derive(Serialize)]
struct LineItemForm {
    price: String,
    quantity: u32,
}

#[derive(Deserialize)]
struct CheckoutSessionResponse {
    id: String,
}

#[derive(Deserialize)]
struct SubscriptionResponse {
    status: String,
    current_period_end: Option<i64>,
    items: Option<SubscriptionItems>,
}

/// Newer API versions report the period end per item instead.
#[derive(Deserialize)]
struct SubscriptionItems {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Deserialize)]
struct SubscriptionItem {
    current_period_end: Option<i64>,
}

#[derive(Serialize)]
struct CreatePaymentIntentForm {
    amount: i64,
    currency: String,
    automatic_payment_methods: AutomaticPaymentMethods,
    metadata: HashMap<&'static str, String>,
}

#[derive(Serialize)]
struct AutomaticPaymentMethods {
    enabled: bool,
}

#[derive(Deserialize)]
struct PaymentIntentResponse {
    id: String,
    amount: Option<i64>,
    currency: Option<String>,
    status: Option<String>,
    client_secret: Option<String>,
}

impl CheckoutGateway for StripeGateway {
    fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> GatewayFuture<'_, CheckoutSessionId> {
        Box::pin(async move {
            let form = CreateCheckoutSessionForm {
                mode: request.mode.as_str(),
                success_url: request.success_url,
                cancel_url: request.cancel_url,
                line_items: vec![LineItemForm {
                    price: request.price_id,
                    quantity: 1,
                }],
                customer_email: request.customer_email,
                metadata: request.metadata,
            };
            let session: CheckoutSessionResponse = self
                .call(
                    "create checkout session",
                    self.client.post_form("/checkout/sessions", form),
                )
                .await?;
            CheckoutSessionId::new(session.id)
                .map_err(|e| PipelineError::ProviderUnavailable(format!("stripe returned {e}")))
        })
    }

    fn retrieve_subscription(&self, id: &SubscriptionId) -> GatewayFuture<'_, RemoteSubscription> {
        let path = format!("/subscriptions/{}", id.as_str());
        Box::pin(async move {
            let sub: SubscriptionResponse = self
                .call("retrieve subscription", self.client.get(&path))
                .await?;
            let period_end = sub.current_period_end.or_else(|| {
                sub.items
                    .and_then(|items| items.data.into_iter().next())
                    .and_then(|item| item.current_period_end)
            });
            Ok(RemoteSubscription {
                status: SubscriptionStatus::from(sub.status.as_str()),
                current_period_end: period_end_from_unix(period_end),
            })
        })
    }
}

impl OrderGateway for StripeGateway {
    fn create_order(&self, money: Money, receipt: String) -> GatewayFuture<'_, RemoteOrder> {
        Box::pin(async move {
            let form = CreatePaymentIntentForm {
                amount: money.amount().minor_units(),
                currency: money.currency().to_string(),
                automatic_payment_methods: AutomaticPaymentMethods { enabled: true },
                metadata: HashMap::from([("receipt", receipt)]),
            };
            let raw: serde_json::Value = self
                .call(
                    "create payment intent",
                    self.client.post_form("/payment_intents", form),
                )
                .await?;
            let pi: PaymentIntentResponse = serde_json::from_value(raw.clone())?;
            Ok(RemoteOrder {
                id: pi.id,
                money: Money::from_provider(
                    pi.amount.or(Some(money.amount().minor_units())),
                    pi.currency.as_deref(),
                    money.currency(),
                )?,
                status: pi.status,
                client_secret: pi.client_secret,
                raw,
            })
        })
    }
}
