//! Webhook authentication for both providers. Pure functions over raw bytes;
//! the handlers decide what a missing secret means.

use {
    crate::domain::error::PipelineError,
    hmac::{Hmac, Mac},
    sha2::Sha256,
    subtle::ConstantTimeEq,
};

type HmacSha256 = Hmac<Sha256>;

/// Oldest accepted `t=` relative to now.
pub const STRIPE_TOLERANCE_SECS: i64 = 300;
/// Clock skew allowed for timestamps from the future.
pub const STRIPE_FUTURE_SKEW_SECS: i64 = 60;

fn mac(secret: &str, parts: &[&[u8]]) -> Result<HmacSha256, PipelineError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PipelineError::AuthenticationFailure("invalid webhook secret".into()))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac)
}

fn ct_eq_hex(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Verify a `stripe-signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`)
/// against the raw request body. Any matching `v1` entry is accepted, which
/// covers secret rotation.
pub fn verify_stripe_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: i64,
) -> Result<(), PipelineError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        if let Some(t) = part.trim().strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(s) = part.trim().strip_prefix("v1=") {
            signatures.push(s);
        }
    }

    let timestamp_str = timestamp.ok_or_else(|| {
        PipelineError::AuthenticationFailure("signature header has no timestamp".into())
    })?;
    if signatures.is_empty() {
        return Err(PipelineError::AuthenticationFailure(
            "signature header has no v1 signature".into(),
        ));
    }

    let timestamp: i64 = timestamp_str
        .parse()
        .map_err(|_| PipelineError::AuthenticationFailure("invalid signature timestamp".into()))?;

    let age = now - timestamp;
    if age > STRIPE_TOLERANCE_SECS {
        return Err(PipelineError::AuthenticationFailure(format!(
            "signature timestamp too old (age={age}s)"
        )));
    }
    if age < -STRIPE_FUTURE_SKEW_SECS {
        return Err(PipelineError::AuthenticationFailure(format!(
            "signature timestamp in the future (age={age}s)"
        )));
    }

    let expected = hex::encode(
        mac(secret, &[timestamp_str.as_bytes(), b".", payload])?
            .finalize()
            .into_bytes(),
    );

    if signatures.iter().any(|s| ct_eq_hex(&expected, s)) {
        Ok(())
    } else {
        Err(PipelineError::AuthenticationFailure("signature mismatch".into()))
    }
}

/// Verify `x-razorpay-signature`: hex HMAC-SHA256 of the body exactly as
/// received.
pub fn verify_razorpay_signature(
    secret: &str,
    payload: &[u8],
    signature: &str,
) -> Result<(), PipelineError> {
    let expected = sign_razorpay_payload(secret, payload)?;
    if ct_eq_hex(&expected, signature.trim()) {
        Ok(())
    } else {
        Err(PipelineError::AuthenticationFailure("signature mismatch".into()))
    }
}

/// Build a valid `stripe-signature` header. Used by tests and local tooling
/// to replay events.
pub fn sign_stripe_payload(
    secret: &str,
    payload: &[u8],
    timestamp: i64,
) -> Result<String, PipelineError> {
    let t = timestamp.to_string();
    let sig = hex::encode(mac(secret, &[t.as_bytes(), b".", payload])?.finalize().into_bytes());
    Ok(format!("t={t},v1={sig}"))
}

pub fn sign_razorpay_payload(secret: &str, payload: &[u8]) -> Result<String, PipelineError> {
    Ok(hex::encode(mac(secret, &[payload])?.finalize().into_bytes()))
}
