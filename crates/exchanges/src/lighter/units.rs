//! Human decimal <-> venue integer conversion

use crate::errors::{ExchangeError, Result};
use crate::lighter::markets::{MarketMetadataCache, SymbolMetadata};
use dexbridge_core::Fixed;
use std::rc::Rc;
use tracing::warn;

/// Used when a market id cannot be mapped back to a symbol
pub const DEFAULT_AMOUNT_DECIMALS: u32 = 4;
pub const DEFAULT_PRICE_DECIMALS: u32 = 2;

/// Scales amounts and prices with each market's precision.
///
/// `amount_from_base(amount_to_base(a))` returns `a` rounded half away from
/// zero to the market's `size_decimals`.
#[derive(Clone)]
pub struct UnitConverter {
    markets: Rc<MarketMetadataCache>,
}

impl UnitConverter {
    pub fn new(markets: Rc<MarketMetadataCache>) -> Self {
        Self { markets }
    }

    async fn metadata(&self, symbol: &str) -> Result<SymbolMetadata> {
        self.markets.resolve(symbol).await.map_err(|e| match e {
            ExchangeError::SymbolNotFound(symbol) => {
                ExchangeError::MetadataMissing(format!("no market metadata for {symbol}"))
            }
            other => other,
        })
    }

    pub async fn amount_to_base(&self, amount: Fixed, symbol: &str) -> Result<i64> {
        let meta = self.metadata(symbol).await?;
        Ok(amount.to_base_units(meta.size_decimals)?)
    }

    pub async fn price_to_base(&self, price: Fixed, symbol: &str) -> Result<i64> {
        let meta = self.metadata(symbol).await?;
        Ok(price.to_base_units(meta.price_decimals)?)
    }

    pub async fn amount_from_base(&self, raw: &str, symbol: &str) -> Result<Fixed> {
        let meta = self.metadata(symbol).await?;
        Ok(Fixed::from_base_str(raw, meta.size_decimals)?)
    }

    pub async fn price_from_base(&self, raw: &str, symbol: &str) -> Result<Fixed> {
        let meta = self.metadata(symbol).await?;
        Ok(Fixed::from_base_str(raw, meta.price_decimals)?)
    }

    /// Decode an amount for an order that only carries its market id
    pub async fn amount_from_base_by_market(&self, raw: &str, market_id: u32) -> Result<Fixed> {
        let (size_decimals, _) = self.market_decimals(Some(market_id)).await;
        Ok(Fixed::from_base_str(raw, size_decimals)?)
    }

    pub async fn price_from_base_by_market(&self, raw: &str, market_id: u32) -> Result<Fixed> {
        let (_, price_decimals) = self.market_decimals(Some(market_id)).await;
        Ok(Fixed::from_base_str(raw, price_decimals)?)
    }

    /// `(size_decimals, price_decimals)` for a market id, or the defaults when
    /// the id is absent or unknown
    pub async fn market_decimals(&self, market_id: Option<u32>) -> (u32, u32) {
        let defaults = (DEFAULT_AMOUNT_DECIMALS, DEFAULT_PRICE_DECIMALS);
        let Some(market_id) = market_id else {
            return defaults;
        };

        let meta = match self.markets.symbol_for_market(market_id).await {
            Some(symbol) => self.metadata(&symbol).await.ok(),
            None => None,
        };
        match meta {
            Some(meta) => (meta.size_decimals, meta.price_decimals),
            None => {
                warn!("⚠️ Unknown market {}, decoding with default precision", market_id);
                defaults
            }
        }
    }
}
