//! Normalized order and quote model shared by every exchange adapter

use dexbridge_core::Fixed;
use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// `"sell"` in any letter case is a sell; every other direction is a buy.
    pub fn from_direction(direction: &str) -> Self {
        if direction.eq_ignore_ascii_case("sell") {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        }
    }

    pub fn from_is_ask(is_ask: bool) -> Self {
        if is_ask { OrderSide::Sell } else { OrderSide::Buy }
    }

    pub fn is_ask(&self) -> bool {
        matches!(self, OrderSide::Sell)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an order-mutating call.
///
/// `success == false` always carries an `error_message` and guarantees
/// nothing about venue-side state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub success: bool,
    pub order_id: Option<String>,
    pub side: Option<String>,
    pub size: Option<Fixed>,
    pub price: Option<Fixed>,
    pub status: Option<String>,
    pub error_message: Option<String>,
}

impl OrderResult {
    /// Accepted by the venue, not yet confirmed on the book
    pub fn pending(
        order_id: impl Into<String>,
        side: impl Into<String>,
        size: Fixed,
        price: Option<Fixed>,
    ) -> Self {
        Self {
            success: true,
            order_id: Some(order_id.into()),
            side: Some(side.into()),
            size: Some(size),
            price,
            status: Some("pending".to_string()),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = "unknown error".to_string();
        }
        Self {
            success: false,
            order_id: None,
            side: None,
            size: None,
            price: None,
            status: None,
            error_message: Some(message),
        }
    }
}

/// Read-only projection of a venue order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_id: String,
    pub side: OrderSide,
    pub size: Fixed,
    pub price: Fixed,
    pub status: String,
    pub filled_size: Fixed,
    pub remaining_size: Fixed,
}

/// Socket connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}
