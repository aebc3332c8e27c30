use {
    super::error::PipelineError,
    chrono::{DateTime, Utc},
    derive_more::Display,
    serde::Serialize,
    uuid::Uuid,
};

/// Normalized (trimmed, lower-cased) email. The user identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let normalized = raw.trim().to_lowercase();
        let valid = match normalized.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !normalized.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            return Err(PipelineError::InvalidRequest(format!(
                "invalid email: {raw}"
            )));
        }
        Ok(Self(normalized))
    }

    /// Blank input means "no email given", not an error.
    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Self>, PipelineError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Self::parse(s).map(Some),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
