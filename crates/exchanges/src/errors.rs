//! Exchange-specific error types

use thiserror::Error;

/// Result type for exchange operations
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Exchange operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error {code}: {message}")]
    ApiError { code: i64, message: String },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Feature not supported: {0}")]
    FeatureNotSupported(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Market metadata missing for {0}")]
    MetadataMissing(String),

    #[error("Fixed point error: {0}")]
    FixedPointError(String),
}

impl ExchangeError {
    /// Failures worth another attempt: transport trouble, timeouts, throttling and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NetworkError(_) | Self::Timeout(_) | Self::RateLimitExceeded => true,
            Self::HttpError(status, _) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<dexbridge_core::FixedError> for ExchangeError {
    fn from(err: dexbridge_core::FixedError) -> Self {
        Self::FixedPointError(err.to_string())
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<url::ParseError> for ExchangeError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
