//! Lighter REST API: response schemas and a thin client over `HttpTransport`
//!
//! Every endpoint answers with a `code` field (200 on success) next to the payload.

use crate::errors::{ExchangeError, Result};
use crate::http::HttpTransport;
use dexbridge_core::PerfTimer;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::debug;
use url::Url;

pub const CODE_OK: i64 = 200;

/// Common envelope fields
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
}

impl Status {
    pub fn ensure_ok(&self) -> Result<()> {
        if self.code == CODE_OK {
            Ok(())
        } else {
            Err(ExchangeError::ApiError {
                code: self.code,
                message: self.message.clone().unwrap_or_default(),
            })
        }
    }
}

/// One market descriptor from `orderBookDetails`.
///
/// Fields are optional on the wire; descriptors missing any of them are skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookDetail {
    pub symbol: Option<String>,
    pub market_id: Option<u32>,
    pub size_decimals: Option<u32>,
    pub price_decimals: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookDetailsResponse {
    #[serde(flatten)]
    pub status: Status,
    #[serde(default)]
    pub order_book_details: Vec<OrderBookDetail>,
}

/// An active order as reported by `accountActiveOrders`.
///
/// Amounts and prices are base-unit integers encoded as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct LighterOrder {
    #[serde(default)]
    pub order_index: i64,
    /// Absent on orders placed without one
    #[serde(default)]
    pub client_order_index: Option<i64>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub order_id: String,
    /// Older payloads call this `market_id`
    #[serde(default, alias = "market_id")]
    pub market_index: Option<u32>,
    #[serde(alias = "amount_base", deserialize_with = "string_or_number")]
    pub initial_base_amount: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub remaining_base_amount: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub filled_base_amount: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
    pub is_ask: bool,
    #[serde(default)]
    pub status: String,
}

impl LighterOrder {
    /// Whether `id` names this order, either by venue id or by client order index
    pub fn matches(&self, id: &str) -> bool {
        self.id() == id || self.client_order_index.is_some_and(|index| index.to_string() == id)
    }

    /// The id callers use to refer to this order
    pub fn id(&self) -> String {
        if self.order_id.is_empty() {
            self.order_index.to_string()
        } else {
            self.order_id.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveOrdersResponse {
    #[serde(flatten)]
    pub status: Status,
    #[serde(default)]
    pub orders: Vec<LighterOrder>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LighterPosition {
    #[serde(default)]
    pub market_id: Option<u32>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub position_value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LighterAccount {
    #[serde(default)]
    pub index: Option<u64>,
    #[serde(default)]
    pub positions: Vec<LighterPosition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    #[serde(flatten)]
    pub status: Status,
    #[serde(default)]
    pub accounts: Vec<LighterAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookOrder {
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub remaining_base_amount: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookOrdersResponse {
    #[serde(flatten)]
    pub status: Status,
    #[serde(default)]
    pub bids: Vec<BookOrder>,
    #[serde(default)]
    pub asks: Vec<BookOrder>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextNonceResponse {
    #[serde(flatten)]
    pub status: Status,
    pub nonce: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyInfo {
    #[serde(default)]
    pub api_key_index: Option<u8>,
    pub public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeysResponse {
    #[serde(flatten)]
    pub status: Status,
    #[serde(default)]
    pub api_keys: Vec<ApiKeyInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendTxResponse {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

fn opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s)),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

/// REST client for the account, book and transaction endpoints
pub struct LighterApi {
    http: Rc<dyn HttpTransport>,
    base_url: Url,
}

impl LighterApi {
    pub fn new(http: Rc<dyn HttpTransport>, base_url: &str) -> Result<Self> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    async fn get_json<T>(&self, path: &str, params: &[(&str, String)]) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path, params);
        let timer = PerfTimer::start(format!("lighter GET {path}"));

        let response = self.http.get(url.as_str()).await?.error_for_status()?;
        timer.log_elapsed();
        debug!("Response {}: {}", path, response.body);

        response.json()
    }

    /// Active orders for an account, optionally restricted to one market
    pub async fn account_active_orders(
        &self,
        account_index: u64,
        market_id: Option<u32>,
        auth_token: &str,
    ) -> Result<Vec<LighterOrder>> {
        let mut params = vec![("account_index", account_index.to_string())];
        if let Some(market_id) = market_id {
            params.push(("market_id", market_id.to_string()));
        }
        params.push(("auth", auth_token.to_string()));

        let response: ActiveOrdersResponse = self.get_json("/api/v1/accountActiveOrders", &params).await?;
        response.status.ensure_ok()?;
        Ok(response.orders)
    }

    /// All positions held by the account
    pub async fn account_positions(&self, account_index: u64) -> Result<Vec<LighterPosition>> {
        let params = [("by", "index".to_string()), ("value", account_index.to_string())];
        let response: AccountResponse = self.get_json("/api/v1/account", &params).await?;
        response.status.ensure_ok()?;
        Ok(response
            .accounts
            .into_iter()
            .flat_map(|account| account.positions)
            .collect())
    }

    /// Top of book, best level first on each side
    pub async fn order_book_orders(&self, market_id: u32, limit: u32) -> Result<OrderBookOrdersResponse> {
        let params = [("market_id", market_id.to_string()), ("limit", limit.to_string())];
        let response: OrderBookOrdersResponse = self.get_json("/api/v1/orderBookOrders", &params).await?;
        response.status.ensure_ok()?;
        Ok(response)
    }

    pub async fn next_nonce(&self, account_index: u64, api_key_index: u8) -> Result<i64> {
        let params = [
            ("account_index", account_index.to_string()),
            ("api_key_index", api_key_index.to_string()),
        ];
        let response: NextNonceResponse = self.get_json("/api/v1/nextNonce", &params).await?;
        response.status.ensure_ok()?;
        Ok(response.nonce)
    }

    pub async fn api_keys(&self, account_index: u64, api_key_index: u8) -> Result<Vec<ApiKeyInfo>> {
        let params = [
            ("account_index", account_index.to_string()),
            ("api_key_index", api_key_index.to_string()),
        ];
        let response: ApiKeysResponse = self.get_json("/api/v1/apikeys", &params).await?;
        response.status.ensure_ok()?;
        Ok(response.api_keys)
    }

    /// Submit a signed transaction; returns the venue's response on `code == 200`
    pub async fn send_tx(&self, tx_type: u8, tx_info: &str) -> Result<SendTxResponse> {
        let url = self.endpoint("/api/v1/sendTx", &[]);
        let timer = PerfTimer::start("lighter POST /api/v1/sendTx");

        let tx_type = tx_type.to_string();
        let response = self
            .http
            .post_form(url.as_str(), &[("tx_type", tx_type.as_str()), ("tx_info", tx_info)])
            .await?
            .error_for_status()?;
        timer.log_elapsed();

        let parsed: SendTxResponse = response.json()?;
        if parsed.code != CODE_OK {
            return Err(ExchangeError::ApiError {
                code: parsed.code,
                message: parsed.message.unwrap_or_default(),
            });
        }
        Ok(parsed)
    }
}
