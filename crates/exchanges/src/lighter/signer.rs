//! Transaction signing seam
//!
//! Lighter transactions are signed with the account's API key using the
//! venue's own signature scheme. That cryptography lives behind [`TxSigner`];
//! [`SignerClient`] handles the nonce, the submission and the bookkeeping
//! around it.

use crate::errors::{ExchangeError, Result};
use crate::lighter::api::LighterApi;
use dexbridge_core::Timestamp;
use std::rc::Rc;
use tracing::debug;

pub const TX_TYPE_CREATE_ORDER: u8 = 14;

/// Lighter order types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LighterOrderType {
    Limit = 0,
    Market = 1,
}

/// Lighter time-in-force values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimeInForce {
    ImmediateOrCancel = 0,
    GoodTillTime = 1,
    PostOnly = 2,
}

/// Expiry sentinel: let the venue apply its default (28 days)
pub const DEFAULT_ORDER_EXPIRY: i64 = -1;

/// Order fields chosen by the adapter
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub market_index: u32,
    pub client_order_index: i64,
    pub base_amount: i64,
    pub price: u32,
    pub is_ask: bool,
    pub order_type: LighterOrderType,
    pub time_in_force: TimeInForce,
    pub reduce_only: bool,
    pub trigger_price: u32,
    pub order_expiry: i64,
}

impl OrderRequest {
    /// Good-till-time limit order, the only kind the adapter places
    pub fn limit(market_index: u32, client_order_index: i64, base_amount: i64, price: u32, is_ask: bool) -> Self {
        Self {
            market_index,
            client_order_index,
            base_amount,
            price,
            is_ask,
            order_type: LighterOrderType::Limit,
            time_in_force: TimeInForce::GoodTillTime,
            reduce_only: false,
            trigger_price: 0,
            order_expiry: DEFAULT_ORDER_EXPIRY,
        }
    }
}

/// Everything a signature covers
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrderTx {
    pub account_index: u64,
    pub api_key_index: u8,
    pub nonce: i64,
    pub order: OrderRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedTx {
    pub tx_type: u8,
    /// JSON body expected by `sendTx`
    pub tx_info: String,
    pub tx_hash: String,
}

/// Produces venue signatures for a single API key
pub trait TxSigner {
    fn sign_create_order(&self, tx: &CreateOrderTx) -> Result<SignedTx>;

    /// Short-lived token for authenticated read endpoints
    fn create_auth_token(&self, deadline_secs: i64) -> Result<String>;

    /// Public key registered on the venue for this API key
    fn public_key(&self) -> String;
}

/// Auth tokens are requested with this much lifetime.
const AUTH_TOKEN_TTL_SECS: i64 = 600;

pub struct SignerClient {
    signer: Rc<dyn TxSigner>,
    api: Rc<LighterApi>,
    account_index: u64,
    api_key_index: u8,
}

impl SignerClient {
    pub fn new(signer: Rc<dyn TxSigner>, api: Rc<LighterApi>, account_index: u64, api_key_index: u8) -> Self {
        Self {
            signer,
            api,
            account_index,
            api_key_index,
        }
    }

    /// Sign and submit an order; returns the transaction hash
    pub async fn create_order(&self, order: OrderRequest) -> Result<String> {
        let nonce = self.api.next_nonce(self.account_index, self.api_key_index).await?;
        let tx = CreateOrderTx {
            account_index: self.account_index,
            api_key_index: self.api_key_index,
            nonce,
            order,
        };

        let signed = self.signer.sign_create_order(&tx)?;
        debug!("Submitting tx type {} with nonce {}", signed.tx_type, nonce);

        let response = self.api.send_tx(signed.tx_type, &signed.tx_info).await?;
        Ok(response.tx_hash.filter(|hash| !hash.is_empty()).unwrap_or(signed.tx_hash))
    }

    pub fn auth_token(&self) -> Result<String> {
        let deadline = Timestamp::now().as_secs() + AUTH_TOKEN_TTL_SECS;
        self.signer.create_auth_token(deadline)
    }

    /// Confirm the local key matches the one registered for this account
    pub async fn check_client(&self) -> Result<()> {
        let registered = self.api.api_keys(self.account_index, self.api_key_index).await?;
        let local = self.signer.public_key();

        let matches = registered
            .iter()
            .filter(|key| key.api_key_index.is_none_or(|index| index == self.api_key_index))
            .any(|key| key.public_key.trim_start_matches("0x").eq_ignore_ascii_case(local.trim_start_matches("0x")));

        if matches {
            Ok(())
        } else {
            Err(ExchangeError::InvalidCredentials(format!(
                "public key for account {} api key {} does not match the venue",
                self.account_index, self.api_key_index
            )))
        }
    }
}
