use {
    super::error::PipelineError,
    serde::{Deserialize, Deserializer, Serialize, Serializer},
    std::fmt,
};

/// Amount in the currency's minor unit (cents, paise). This is the only unit
/// the crate works in: HTTP bodies, provider calls and storage all agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(minor: i64) -> Result<Self, PipelineError> {
        if minor < 0 {
            return Err(PipelineError::InvalidRequest(format!(
                "amount cannot be negative, got: {minor}"
            )));
        }
        Ok(Self(minor))
    }

    /// Origination amounts must be strictly positive.
    pub fn positive(minor: i64) -> Result<Self, PipelineError> {
        if minor <= 0 {
            return Err(PipelineError::InvalidRequest(format!(
                "amount must be greater than zero, got: {minor}"
            )));
        }
        Ok(Self(minor))
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Three-letter ISO-4217 code, lower-cased. Holds currencies a provider
/// settles in that origination does not sell in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let lower = raw.trim().to_ascii_lowercase();
        match <[u8; 3]>::try_from(lower.as_bytes()) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_lowercase) => Ok(Self(bytes)),
            _ => Err(PipelineError::InvalidRequest(format!(
                "invalid currency code: {raw}"
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        // parse only admits ASCII letters
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

/// Currencies the product sells in, plus whatever else a provider reports
/// on a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Inr,
    Jpy,
    Other(CurrencyCode),
}

impl Currency {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Inr => "inr",
            Self::Jpy => "jpy",
            Self::Other(code) => code.as_str(),
        }
    }

    /// Razorpay wants ISO codes in upper case.
    pub fn as_upper(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }

    /// Settlement currencies are recorded whatever they are; only a code that
    /// is not three letters is refused.
    pub fn from_provider_code(code: &str) -> Result<Self, PipelineError> {
        match Self::try_from(code) {
            Ok(known) => Ok(known),
            Err(_) => CurrencyCode::parse(code).map(Self::Other),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed set: what origination accepts from callers.
impl TryFrom<&str> for Currency {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "eur" => Ok(Self::Eur),
            "gbp" => Ok(Self::Gbp),
            "inr" => Ok(Self::Inr),
            "jpy" => Ok(Self::Jpy),
            other => Err(PipelineError::InvalidRequest(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::from_provider_code(&code).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: MoneyAmount,
    currency: Currency,
}

impl Money {
    pub fn new(amount: MoneyAmount, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Build from raw provider fields. Missing amounts count as zero, matching
    /// how providers omit `amount_total` on free checkouts.
    pub fn from_provider(
        amount: Option<i64>,
        currency: Option<&str>,
        fallback: Currency,
    ) -> Result<Self, PipelineError> {
        let amount = MoneyAmount::new(amount.unwrap_or(0))?;
        let currency = match currency {
            Some(code) => Currency::from_provider_code(code)?,
            None => fallback,
        };
        Ok(Self::new(amount, currency))
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }
}
