//! Lighter adapter configuration
//!
//! Credentials come from the environment (optionally via a `.env` file):
//!
//! | variable                | required | default                              |
//! |-------------------------|----------|--------------------------------------|
//! | `LIGHTER_PRIVATE_KEY`   | yes      |                                      |
//! | `LIGHTER_ACCOUNT_INDEX` | no       | `1`                                  |
//! | `LIGHTER_API_KEY_INDEX` | no       | `3`                                  |
//! | `LIGHTER_BASE_URL`      | no       | `https://testnet.zklighter.elliot.ai` |

use crate::errors::{ExchangeError, Result};
use crate::retry::RetryPolicy;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const MAINNET_BASE_URL: &str = "https://mainnet.zklighter.elliot.ai";
pub const TESTNET_BASE_URL: &str = "https://testnet.zklighter.elliot.ai";

/// Market metadata is always read from mainnet; both networks list the same markets.
pub const METADATA_URL: &str = "https://mainnet.zklighter.elliot.ai/api/v1/orderBookDetails";

pub const DEFAULT_ACCOUNT_INDEX: u64 = 1;
pub const DEFAULT_API_KEY_INDEX: u8 = 3;

/// Hex-encoded API private key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiPrivateKey(String);

impl ApiPrivateKey {
    /// Accepts the key with or without a `0x` prefix
    pub fn new(key: &str) -> Result<Self> {
        let key = key.trim();
        let hex_part = key.strip_prefix("0x").unwrap_or(key);

        if hex_part.is_empty() {
            return Err(ExchangeError::MissingCredentials("LIGHTER_PRIVATE_KEY".to_string()));
        }
        hex::decode(hex_part).map_err(|e| {
            ExchangeError::InvalidCredentials(format!("LIGHTER_PRIVATE_KEY is not valid hex: {e}"))
        })?;

        Ok(Self(hex_part.to_ascii_lowercase()))
    }

    /// Key without prefix, for handing to a signer implementation
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiPrivateKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct LighterConfig {
    pub private_key: Option<ApiPrivateKey>,
    pub account_index: u64,
    pub api_key_index: u8,
    pub base_url: String,
    pub ws_url: String,
    pub metadata_url: String,
    pub testnet: bool,
    /// Ticker this adapter instance trades, used as a log field
    pub ticker: String,
    pub request_timeout_ms: u64,
    pub metadata_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for LighterConfig {
    fn default() -> Self {
        Self::for_base_url(TESTNET_BASE_URL)
    }
}

impl LighterConfig {
    fn for_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            private_key: None,
            account_index: DEFAULT_ACCOUNT_INDEX,
            api_key_index: DEFAULT_API_KEY_INDEX,
            ws_url: derive_ws_url(&base_url),
            testnet: base_url.contains("testnet"),
            base_url,
            metadata_url: METADATA_URL.to_string(),
            ticker: "UNKNOWN".to_string(),
            request_timeout_ms: 10_000,
            metadata_timeout_ms: 10_000,
            connect_timeout_ms: 2_000,
            retry: RetryPolicy::default(),
        }
    }

    pub fn testnet() -> Self {
        Self::for_base_url(TESTNET_BASE_URL)
    }

    pub fn mainnet() -> Self {
        Self::for_base_url(MAINNET_BASE_URL)
    }

    /// Load `.env` if present, then read the `LIGHTER_*` variables
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("LIGHTER_BASE_URL").unwrap_or_else(|| TESTNET_BASE_URL.to_string());
        Url::parse(&base_url)?;

        let key = lookup("LIGHTER_PRIVATE_KEY")
            .ok_or_else(|| ExchangeError::MissingCredentials("LIGHTER_PRIVATE_KEY".to_string()))?;

        let mut config = Self::for_base_url(&base_url);
        config.private_key = Some(ApiPrivateKey::new(&key)?);
        config.account_index = parse_or(&lookup, "LIGHTER_ACCOUNT_INDEX", DEFAULT_ACCOUNT_INDEX)?;
        config.api_key_index = parse_or(&lookup, "LIGHTER_API_KEY_INDEX", DEFAULT_API_KEY_INDEX)?;
        Ok(config)
    }

    /// Fill credentials from the environment while keeping other settings
    pub fn with_env_credentials(mut self) -> Result<Self> {
        let env = Self::from_env()?;
        self.private_key = env.private_key;
        self.account_index = env.account_index;
        self.api_key_index = env.api_key_index;
        Ok(self)
    }

    pub fn with_credentials(mut self, private_key: &str) -> Result<Self> {
        self.private_key = Some(ApiPrivateKey::new(private_key)?);
        Ok(self)
    }

    pub fn with_account(mut self, account_index: u64, api_key_index: u8) -> Self {
        self.account_index = account_index;
        self.api_key_index = api_key_index;
        self
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = ticker.into();
        self
    }

    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = url.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The private key, or `MissingCredentials`
    pub fn require_private_key(&self) -> Result<&ApiPrivateKey> {
        self.private_key
            .as_ref()
            .ok_or_else(|| ExchangeError::MissingCredentials("LIGHTER_PRIVATE_KEY".to_string()))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ExchangeError::ConfigurationError(format!("{key} must be an integer, got {raw:?}"))),
    }
}

/// `https://host` -> `wss://host/stream`
fn derive_ws_url(base_url: &str) -> String {
    let host_part = base_url
        .strip_prefix("https://")
        .or_else(|| base_url.strip_prefix("http://"))
        .unwrap_or(base_url);
    format!("wss://{}/stream", host_part.trim_end_matches('/'))
}
