//! The contract every exchange adapter implements
//!
//! The trading application only talks to `ExchangeClient`, so adapters are
//! interchangeable. Futures are `?Send`: everything runs on a single-threaded
//! monoio runtime.

use crate::errors::Result;
use crate::types::{OrderInfo, OrderResult};
use async_trait::async_trait;
use dexbridge_core::Fixed;
use serde_json::Value;
use std::rc::Rc;

/// Callback receiving raw account/order update payloads from an exchange stream.
///
/// Errors returned by the handler are logged by the stream and never tear it down.
pub type OrderUpdateHandler = Rc<dyn Fn(&Value) -> Result<()>>;

#[async_trait(?Send)]
pub trait ExchangeClient {
    /// Short lowercase venue name, e.g. `"lighter"`
    fn exchange_name(&self) -> &str;

    /// Open the order-update stream for a contract
    async fn connect(&mut self, contract_id: &str) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    /// Register the callback used by `connect`
    fn setup_order_update_handler(&mut self, handler: OrderUpdateHandler);

    /// Best bid and best ask; `(0, 0)` when quotes cannot be fetched
    async fn fetch_bbo_prices(&self, contract_id: &str) -> (Fixed, Fixed);

    async fn place_open_order(&self, contract_id: &str, quantity: Fixed, direction: &str) -> OrderResult;

    async fn place_close_order(
        &self,
        contract_id: &str,
        quantity: Fixed,
        price: Fixed,
        side: &str,
    ) -> OrderResult;

    async fn cancel_order(&self, order_id: &str) -> OrderResult;

    async fn get_order_info(&self, order_id: &str) -> Option<OrderInfo>;

    async fn get_active_orders(&self, contract_id: &str) -> Vec<OrderInfo>;

    /// Total position value across the account; zero when unknown
    async fn get_account_positions(&self) -> Fixed;
}
