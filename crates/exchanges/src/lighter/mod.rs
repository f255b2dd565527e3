//! Lighter exchange integration
//!
//! Lighter is an order-book perp DEX whose REST and socket APIs speak in
//! integer base units. [`LighterClient`] implements [`ExchangeClient`] on top
//! of the pieces in this module:
//!
//! - [`MarketMetadataCache`] maps symbols to market ids and precisions
//! - [`UnitConverter`] scales decimals to and from base units
//! - [`SignerClient`] signs and submits transactions through a [`TxSigner`]
//! - [`ConnectionManager`] runs the account stream in the background

pub mod api;
pub mod config;
pub mod connection;
pub mod markets;
pub mod signer;
pub mod stream;
pub mod units;

use crate::errors::{ExchangeError, Result};
use crate::http::{HttpTransport, MonoioHttpsClient};
use crate::retry::query_retry;
use crate::traits::{ExchangeClient, OrderUpdateHandler};
use crate::types::{ConnectionStatus, OrderInfo, OrderResult, OrderSide};
use async_trait::async_trait;
use dexbridge_core::{Fixed, log_error, log_order, next_client_order_index};
use std::rc::Rc;
use tracing::{Instrument, Span, info, info_span, warn};

pub use api::{LighterApi, LighterOrder};
pub use config::{ApiPrivateKey, LighterConfig};
pub use connection::ConnectionManager;
pub use markets::{MarketMetadataCache, SymbolMetadata};
pub use signer::{CreateOrderTx, OrderRequest, SignedTx, SignerClient, TxSigner};
pub use stream::{LighterWsClient, StreamEvent, StreamState};
pub use units::UnitConverter;

pub const EXCHANGE_NAME: &str = "lighter";

/// Raw price attached to open orders. Lighter needs a limit price on every
/// order; callers of `place_open_order` do not supply one.
pub const OPEN_ORDER_PLACEHOLDER_PRICE: u32 = 405_000;

const CANCEL_NOT_SUPPORTED: &str =
    "Cancel order requires market_index and order_index - not implemented";

/// Lighter adapter
pub struct LighterClient {
    config: LighterConfig,
    api: Rc<LighterApi>,
    signer: SignerClient,
    markets: Rc<MarketMetadataCache>,
    units: UnitConverter,
    connection: ConnectionManager,
    order_update_handler: Option<OrderUpdateHandler>,
    span: Span,
}

impl LighterClient {
    /// Client over HTTPS. Fails with `MissingCredentials` when the config has no key.
    pub fn new(config: LighterConfig, signer: Rc<dyn TxSigner>) -> Result<Self> {
        let http = Rc::new(MonoioHttpsClient::new().with_timeout(config.request_timeout()));
        Self::with_transport(config, signer, http)
    }

    pub fn with_transport(config: LighterConfig, signer: Rc<dyn TxSigner>, http: Rc<dyn HttpTransport>) -> Result<Self> {
        config.require_private_key()?;

        let api = Rc::new(LighterApi::new(http.clone(), &config.base_url)?);
        let markets = Rc::new(MarketMetadataCache::new(
            http,
            config.metadata_url.clone(),
            config.metadata_timeout(),
        ));
        let units = UnitConverter::new(markets.clone());
        let signer = SignerClient::new(signer, api.clone(), config.account_index, config.api_key_index);
        let connection = ConnectionManager::new(
            config.ws_url.clone(),
            config.account_index,
            config.connect_timeout(),
        );
        let span = info_span!("exchange", exchange = EXCHANGE_NAME, ticker = %config.ticker);

        info!(parent: &span, "🚀 Initializing Lighter exchange");
        info!(parent: &span, "   Base URL: {}", config.base_url);
        info!(parent: &span, "   Account: {} (API key {})", config.account_index, config.api_key_index);
        info!(parent: &span, "   Testnet: {}", config.testnet);

        Ok(Self {
            config,
            api,
            signer,
            markets,
            units,
            connection,
            order_update_handler: None,
            span,
        })
    }

    /// Read `LIGHTER_*` from the environment and build the signer from the resulting config
    pub fn from_env<F>(make_signer: F) -> Result<Self>
    where
        F: FnOnce(&LighterConfig) -> Result<Rc<dyn TxSigner>>,
    {
        let config = LighterConfig::from_env()?;
        let signer = make_signer(&config)?;
        Self::new(config, signer)
    }

    pub fn config(&self) -> &LighterConfig {
        &self.config
    }

    pub fn markets(&self) -> &MarketMetadataCache {
        &self.markets
    }

    pub fn units(&self) -> &UnitConverter {
        &self.units
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Verify the signer's key is the one registered for this account
    pub async fn check_client(&self) -> Result<()> {
        self.signer
            .check_client()
            .instrument(self.span.clone())
            .await
            .inspect_err(|e| {
                log_error!("check_client", e);
            })
    }

    pub async fn symbol_to_orderbook_id(&self, symbol: &str) -> Result<u32> {
        self.markets.orderbook_id(symbol).await
    }

    /// Start the stream for a known orderbook id
    pub async fn connect_orderbook(&mut self, orderbook_id: u32) -> Result<()> {
        let span = self.span.clone();
        let handler = self.order_update_handler.clone();
        self.connection.connect(orderbook_id, handler).instrument(span).await
    }

    async fn submit_order(
        &self,
        contract_id: &str,
        quantity: Fixed,
        price: u32,
        side: OrderSide,
        display_price: Option<Fixed>,
    ) -> Result<OrderResult> {
        if !quantity.is_positive() {
            return Err(ExchangeError::InvalidOrder(format!("quantity must be positive, got {quantity}")));
        }

        let market_index = self.markets.orderbook_id(contract_id).await?;
        let base_amount = self.units.amount_to_base(quantity, contract_id).await?;
        let order = OrderRequest::limit(
            market_index,
            next_client_order_index(),
            base_amount,
            price,
            side.is_ask(),
        );

        let tx_hash = self.signer.create_order(order).await?;
        log_order!("PLACED", tx_hash, contract_id);
        Ok(OrderResult::pending(tx_hash, side.as_str(), quantity, display_price))
    }

    async fn try_place_close_order(
        &self,
        contract_id: &str,
        quantity: Fixed,
        price: Fixed,
        side: OrderSide,
    ) -> Result<OrderResult> {
        let raw = self.units.price_to_base(price, contract_id).await?;
        let raw = u32::try_from(raw)
            .map_err(|_| ExchangeError::InvalidOrder(format!("price {price} is out of range for {contract_id}")))?;
        self.submit_order(contract_id, quantity, raw, side, Some(price)).await
    }

    async fn try_fetch_bbo(&self, contract_id: &str) -> Result<(Fixed, Fixed)> {
        let meta = self.markets.resolve(contract_id).await?;
        let book = self.api.order_book_orders(meta.market_id, 1).await?;

        let best = |levels: &[api::BookOrder]| -> Result<Fixed> {
            match levels.first() {
                Some(level) => Ok(Fixed::from_base_str(&level.price, meta.price_decimals)?),
                None => Ok(Fixed::ZERO),
            }
        };
        Ok((best(&book.bids)?, best(&book.asks)?))
    }

    async fn try_get_order_info(&self, order_id: &str) -> Result<Option<OrderInfo>> {
        let token = self.signer.auth_token()?;
        let orders = self
            .api
            .account_active_orders(self.config.account_index, None, &token)
            .await?;

        let Some(order) = orders.iter().find(|o| o.matches(order_id)) else {
            return Ok(None);
        };

        let (size_decimals, price_decimals) = self.units.market_decimals(order.market_index).await;
        Ok(Some(order_info(order, size_decimals, price_decimals)?))
    }

    async fn try_get_active_orders(&self, contract_id: &str) -> Result<Vec<OrderInfo>> {
        let meta = self.markets.resolve(contract_id).await?;
        let token = self.signer.auth_token()?;
        let orders = self
            .api
            .account_active_orders(self.config.account_index, Some(meta.market_id), &token)
            .await?;

        orders
            .iter()
            .map(|order| order_info(order, meta.size_decimals, meta.price_decimals))
            .collect()
    }

    async fn try_get_account_positions(&self) -> Result<Fixed> {
        let positions = self.api.account_positions(self.config.account_index).await?;

        let mut total = Fixed::ZERO;
        for value in positions.iter().filter_map(|p| p.position_value.as_deref()) {
            total = total.checked_add(Fixed::from_str_exact(value)?)?;
        }
        Ok(total)
    }
}

/// Project a venue order with the given precisions
fn order_info(order: &LighterOrder, size_decimals: u32, price_decimals: u32) -> Result<OrderInfo> {
    let size = Fixed::from_base_str(&order.initial_base_amount, size_decimals)?;
    let price = Fixed::from_base_str(&order.price, price_decimals)?;

    let filled_size = match order.filled_base_amount.as_deref() {
        Some(raw) => Fixed::from_base_str(raw, size_decimals)?,
        None => Fixed::ZERO,
    };
    let remaining_size = match order.remaining_base_amount.as_deref() {
        Some(raw) => Fixed::from_base_str(raw, size_decimals)?,
        None => size - filled_size,
    };

    let status = if order.status.is_empty() {
        "open".to_string()
    } else {
        order.status.clone()
    };

    Ok(OrderInfo {
        order_id: order.id(),
        side: OrderSide::from_is_ask(order.is_ask),
        size,
        price,
        status,
        filled_size,
        remaining_size,
    })
}

#[async_trait(?Send)]
impl ExchangeClient for LighterClient {
    fn exchange_name(&self) -> &str {
        EXCHANGE_NAME
    }

    async fn connect(&mut self, contract_id: &str) -> Result<()> {
        let orderbook_id = self
            .markets
            .orderbook_id(contract_id)
            .instrument(self.span.clone())
            .await?;

        if self.order_update_handler.is_none() {
            warn!(parent: &self.span, "⚠️ No order update handler registered, stream not started");
            return Ok(());
        }

        self.connect_orderbook(orderbook_id)
            .await
            .inspect_err(|e| {
                log_error!("connect", e);
            })
    }

    async fn disconnect(&mut self) -> Result<()> {
        let span = self.span.clone();
        self.connection.disconnect().instrument(span).await
    }

    fn setup_order_update_handler(&mut self, handler: OrderUpdateHandler) {
        self.order_update_handler = Some(handler);
    }

    async fn fetch_bbo_prices(&self, contract_id: &str) -> (Fixed, Fixed) {
        query_retry(
            &self.config.retry,
            "fetch_bbo_prices",
            (Fixed::ZERO, Fixed::ZERO),
            || self.try_fetch_bbo(contract_id),
        )
        .instrument(self.span.clone())
        .await
    }

    async fn place_open_order(&self, contract_id: &str, quantity: Fixed, direction: &str) -> OrderResult {
        let side = OrderSide::from_direction(direction);
        self.submit_order(contract_id, quantity, OPEN_ORDER_PLACEHOLDER_PRICE, side, None)
            .instrument(self.span.clone())
            .await
            .unwrap_or_else(|e| {
                log_error!("place_open_order", e);
                OrderResult::failed(e.to_string())
            })
    }

    async fn place_close_order(&self, contract_id: &str, quantity: Fixed, price: Fixed, side: &str) -> OrderResult {
        let side = OrderSide::from_direction(side);
        self.try_place_close_order(contract_id, quantity, price, side)
            .instrument(self.span.clone())
            .await
            .unwrap_or_else(|e| {
                log_error!("place_close_order", e);
                OrderResult::failed(e.to_string())
            })
    }

    async fn cancel_order(&self, order_id: &str) -> OrderResult {
        let err = ExchangeError::FeatureNotSupported(CANCEL_NOT_SUPPORTED.to_string());
        warn!(parent: &self.span, "⚠️ cancel_order({}): {}", order_id, err);
        OrderResult::failed(err.to_string())
    }

    async fn get_order_info(&self, order_id: &str) -> Option<OrderInfo> {
        query_retry(&self.config.retry, "get_order_info", None, || {
            self.try_get_order_info(order_id)
        })
        .instrument(self.span.clone())
        .await
    }

    async fn get_active_orders(&self, contract_id: &str) -> Vec<OrderInfo> {
        query_retry(&self.config.retry, "get_active_orders", Vec::new(), || {
            self.try_get_active_orders(contract_id)
        })
        .instrument(self.span.clone())
        .await
    }

    async fn get_account_positions(&self) -> Fixed {
        query_retry(&self.config.retry, "get_account_positions", Fixed::ZERO, || {
            self.try_get_account_positions()
        })
        .instrument(self.span.clone())
        .await
    }
}
