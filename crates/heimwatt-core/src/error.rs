use thiserror::Error;

/// Why an inbound payload could not be turned into a [`Reading`](crate::Reading).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Error decoding JSON: {0}")]
    Syntax(String),
    #[error("Missing expected key in data: '{field}'")]
    MissingField { field: &'static str },
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

impl DecodeError {
    /// `true` for malformed structured data (as opposed to a bad record).
    #[must_use]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }

    /// `true` when one of the required keys was absent or `null`.
    #[must_use]
    pub fn is_missing_field(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Syntax(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
