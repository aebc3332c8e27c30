use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;

macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
                let id = id.into();
                if !id.starts_with($prefix) || id.len() == $prefix.len() {
                    return Err(PipelineError::InvalidRequest(format!(
                        concat!(stringify!($name), " must start with ", $prefix, ", got: {}"),
                        id
                    )));
                }
                Ok(Self(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }
    };
}

prefixed_id!(
    /// Stripe Checkout Session (`cs_xxx`). Doubles as the placeholder
    /// subscription key until the real subscription id is known.
    CheckoutSessionId,
    "cs_"
);

prefixed_id!(
    /// Stripe subscription (`sub_xxx`).
    SubscriptionId,
    "sub_"
);

prefixed_id!(
    /// Stripe invoice (`in_xxx`).
    InvoiceId,
    "in_"
);

prefixed_id!(
    /// Stripe payment intent (`pi_xxx`).
    PaymentIntentId,
    "pi_"
);

prefixed_id!(
    /// Razorpay order (`order_xxx`).
    WalletOrderId,
    "order_"
);

prefixed_id!(
    /// Razorpay payment (`pay_xxx`).
    WalletPaymentId,
    "pay_"
);
