//! Shared test support: a canned venue transport, a recording signer and fixtures.

use async_trait::async_trait;
use dexbridge_exchanges::errors::{ExchangeError, Result};
use dexbridge_exchanges::http::{HttpResponse, HttpTransport};
use dexbridge_exchanges::lighter::signer::TX_TYPE_CREATE_ORDER;
use dexbridge_exchanges::lighter::{CreateOrderTx, LighterClient, LighterConfig, SignedTx, TxSigner};
use dexbridge_exchanges::retry::RetryPolicy;
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use url::Url;

pub const TEST_PRIVATE_KEY: &str = "0x8f2a55949038a9610f50fb23b5883af3b4ecb3c3bb792cbcefbd1542c692be63";
pub const TEST_PUBLIC_KEY: &str = "0x25c2a6a1482466ba1960d455c0d2f41f09a24d394cbaa8d7b7656ce73dfff244";

pub const METADATA_PATH: &str = "/api/v1/orderBookDetails";
pub const ACTIVE_ORDERS_PATH: &str = "/api/v1/accountActiveOrders";
pub const ACCOUNT_PATH: &str = "/api/v1/account";
pub const ORDER_BOOK_PATH: &str = "/api/v1/orderBookOrders";
pub const NEXT_NONCE_PATH: &str = "/api/v1/nextNonce";
pub const API_KEYS_PATH: &str = "/api/v1/apikeys";
pub const SEND_TX_PATH: &str = "/api/v1/sendTx";

/// ETH and BTC perps plus one descriptor without precisions
pub const ORDER_BOOK_DETAILS: &str = r#"{
    "code": 200,
    "order_book_details": [
        {"symbol": "ETH", "market_id": 0, "size_decimals": 4, "price_decimals": 2},
        {"symbol": "BTC", "market_id": 1, "size_decimals": 5, "price_decimals": 1},
        {"symbol": "PARTIAL", "market_id": 7}
    ]
}"#;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: Url,
    pub body: Option<String>,
}

impl RecordedRequest {
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

/// Answers requests by URL path with canned bodies and records every call
#[derive(Default)]
pub struct MockTransport {
    routes: RefCell<HashMap<String, (u16, String)>>,
    requests: RefCell<Vec<RecordedRequest>>,
    delay_ms: Cell<u64>,
}

impl MockTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Mock pre-loaded with the market table, nonce and a successful `sendTx`
    pub fn venue() -> Rc<Self> {
        let mock = Self::new();
        mock.route(METADATA_PATH, ORDER_BOOK_DETAILS);
        mock.route(NEXT_NONCE_PATH, r#"{"code":200,"nonce":41}"#);
        mock.route(SEND_TX_PATH, r#"{"code":200,"tx_hash":"0xfeedbeef"}"#);
        mock
    }

    pub fn route(&self, path: &str, body: impl Into<String>) {
        self.route_status(path, 200, body);
    }

    pub fn route_status(&self, path: &str, status: u16, body: impl Into<String>) {
        self.routes.borrow_mut().insert(path.to_string(), (status, body.into()));
    }

    /// Sleep before answering, so concurrent callers overlap
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.set(delay.as_millis() as u64);
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }

    pub fn last_request_to(&self, path: &str) -> Option<RecordedRequest> {
        self.requests
            .borrow()
            .iter()
            .rev()
            .find(|r| r.url.path() == path)
            .cloned()
    }
}

#[async_trait(?Send)]
impl HttpTransport for MockTransport {
    async fn request(
        &self,
        method: &str,
        url: &str,
        body: Option<&str>,
        _headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let url = Url::parse(url)?;
        self.requests.borrow_mut().push(RecordedRequest {
            method: method.to_string(),
            url: url.clone(),
            body: body.map(str::to_string),
        });

        let delay = self.delay_ms.get();
        if delay > 0 {
            monoio::time::sleep(Duration::from_millis(delay)).await;
        }

        let route = self.routes.borrow().get(url.path()).cloned();
        match route {
            Some((status, body)) => Ok(HttpResponse {
                status,
                headers: vec![("Content-Type".to_string(), "application/json".to_string())],
                body,
            }),
            None => Err(ExchangeError::NetworkError(format!("connection refused: {}", url.path()))),
        }
    }
}

/// Signs nothing; records what it was asked to sign
pub struct MockSigner {
    public_key: String,
    signed: RefCell<Vec<CreateOrderTx>>,
}

impl MockSigner {
    pub fn new() -> Rc<Self> {
        Self::with_public_key(TEST_PUBLIC_KEY)
    }

    pub fn with_public_key(public_key: &str) -> Rc<Self> {
        Rc::new(Self {
            public_key: public_key.to_string(),
            signed: RefCell::new(Vec::new()),
        })
    }

    pub fn signed(&self) -> Vec<CreateOrderTx> {
        self.signed.borrow().clone()
    }
}

impl TxSigner for MockSigner {
    fn sign_create_order(&self, tx: &CreateOrderTx) -> Result<SignedTx> {
        self.signed.borrow_mut().push(tx.clone());
        let order = &tx.order;
        let tx_info = json!({
            "AccountIndex": tx.account_index,
            "ApiKeyIndex": tx.api_key_index,
            "MarketIndex": order.market_index,
            "ClientOrderIndex": order.client_order_index,
            "BaseAmount": order.base_amount,
            "Price": order.price,
            "IsAsk": order.is_ask as u8,
            "Nonce": tx.nonce,
        });
        Ok(SignedTx {
            tx_type: TX_TYPE_CREATE_ORDER,
            tx_info: tx_info.to_string(),
            tx_hash: format!("0xlocal{}", tx.nonce),
        })
    }

    fn create_auth_token(&self, deadline_secs: i64) -> Result<String> {
        Ok(format!("auth-{deadline_secs}"))
    }

    fn public_key(&self) -> String {
        self.public_key.clone()
    }
}

/// Testnet config with the test key, no retries
pub fn lighter_config() -> LighterConfig {
    LighterConfig::testnet()
        .with_credentials(TEST_PRIVATE_KEY)
        .expect("test key is valid hex")
        .with_ticker("ETH")
        .with_retry(RetryPolicy::none())
}

pub fn lighter_client(http: &Rc<MockTransport>, signer: &Rc<MockSigner>) -> LighterClient {
    lighter_client_with(lighter_config(), http, signer)
}

pub fn lighter_client_with(config: LighterConfig, http: &Rc<MockTransport>, signer: &Rc<MockSigner>) -> LighterClient {
    LighterClient::with_transport(config, signer.clone(), http.clone()).expect("config has credentials")
}
