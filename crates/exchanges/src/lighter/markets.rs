//! Per-market scaling metadata
//!
//! Lighter quotes sizes and prices as integers; `size_decimals` and
//! `price_decimals` say where the decimal point goes. The table is fetched
//! once from the public `orderBookDetails` endpoint and kept for the life of
//! the adapter.

use crate::errors::{ExchangeError, Result};
use crate::http::HttpTransport;
use crate::lighter::api::{OrderBookDetail, OrderBookDetailsResponse};
use dexbridge_core::PerfTimer;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMetadata {
    pub symbol: String,
    pub size_decimals: u32,
    pub price_decimals: u32,
    pub market_id: u32,
}

impl SymbolMetadata {
    fn from_detail(detail: OrderBookDetail) -> Option<Self> {
        match detail {
            OrderBookDetail {
                symbol: Some(symbol),
                market_id: Some(market_id),
                size_decimals: Some(size_decimals),
                price_decimals: Some(price_decimals),
            } => Some(Self {
                symbol,
                size_decimals,
                price_decimals,
                market_id,
            }),
            incomplete => {
                debug!("Skipping incomplete market descriptor: {:?}", incomplete);
                None
            }
        }
    }
}

#[derive(Default)]
struct CacheState {
    markets: HashMap<String, SymbolMetadata>,
    loaded: bool,
    /// `Some` while a fetch is in flight; holds callers waiting on it
    waiters: Option<Vec<flume::Sender<()>>>,
}

/// Wakes everyone waiting on a load, whether it finished or was dropped midway
struct InFlight<'a> {
    state: &'a RefCell<CacheState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let waiters = self.state.borrow_mut().waiters.take().unwrap_or_default();
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }
}

/// Lazily loaded symbol -> market metadata table.
///
/// Concurrent cold lookups share one fetch. A symbol, once cached, never
/// changes; reloads only add symbols that were missing.
pub struct MarketMetadataCache {
    http: Rc<dyn HttpTransport>,
    url: String,
    fetch_timeout: Duration,
    state: RefCell<CacheState>,
}

impl MarketMetadataCache {
    pub fn new(http: Rc<dyn HttpTransport>, url: impl Into<String>, fetch_timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            fetch_timeout,
            state: RefCell::new(CacheState::default()),
        }
    }

    /// Metadata for `symbol`, loading the table if needed.
    ///
    /// Cached entries are answered without touching the network. A miss
    /// against a loaded table triggers exactly one reload before giving up
    /// with `SymbolNotFound`.
    pub async fn resolve(&self, symbol: &str) -> Result<SymbolMetadata> {
        if let Some(found) = self.lookup(symbol) {
            return Ok(found);
        }

        self.ensure_loaded().await;
        if let Some(found) = self.lookup(symbol) {
            return Ok(found);
        }

        if self.is_loaded() {
            debug!("🔄 {} not in market table, reloading once", symbol);
            self.invalidate();
            self.ensure_loaded().await;
            if let Some(found) = self.lookup(symbol) {
                return Ok(found);
            }
        }

        error!("❌ Symbol {} not found in Lighter markets", symbol);
        Err(ExchangeError::SymbolNotFound(symbol.to_string()))
    }

    pub async fn orderbook_id(&self, symbol: &str) -> Result<u32> {
        Ok(self.resolve(symbol).await?.market_id)
    }

    /// Reverse lookup by scanning; loads a cold table but never forces a reload
    pub async fn symbol_for_market(&self, market_id: u32) -> Option<String> {
        if let Some(symbol) = self.scan(market_id) {
            return Some(symbol);
        }
        self.ensure_loaded().await;
        self.scan(market_id)
    }

    fn scan(&self, market_id: u32) -> Option<String> {
        self.state
            .borrow()
            .markets
            .values()
            .find(|m| m.market_id == market_id)
            .map(|m| m.symbol.clone())
    }

    /// Snapshot of every cached market, ordered by market id
    pub fn markets(&self) -> Vec<SymbolMetadata> {
        let mut markets: Vec<_> = self.state.borrow().markets.values().cloned().collect();
        markets.sort_by_key(|m| m.market_id);
        markets
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().loaded
    }

    /// Mark the table stale so the next lookup fetches again. Cached entries stay.
    pub fn invalidate(&self) {
        self.state.borrow_mut().loaded = false;
    }

    fn lookup(&self, symbol: &str) -> Option<SymbolMetadata> {
        self.state.borrow().markets.get(symbol).cloned()
    }

    /// Load the table unless it is already loaded; failures are logged, not returned
    pub async fn ensure_loaded(&self) {
        let waiter = {
            let mut state = self.state.borrow_mut();
            if state.loaded {
                return;
            }
            match state.waiters.as_mut() {
                Some(waiters) => {
                    let (tx, rx) = flume::bounded(1);
                    waiters.push(tx);
                    Some(rx)
                }
                None => {
                    state.waiters = Some(Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            let _ = rx.recv_async().await;
            return;
        }

        let _in_flight = InFlight { state: &self.state };
        match self.fetch().await {
            Ok(markets) => self.store(markets),
            Err(e) => warn!("⚠️ Failed to load Lighter market metadata: {}", e),
        }
    }

    fn store(&self, markets: Vec<SymbolMetadata>) {
        let mut state = self.state.borrow_mut();
        let count = markets.len();
        for market in markets {
            state.markets.entry(market.symbol.clone()).or_insert(market);
        }
        state.loaded = true;
        info!("📚 Loaded {} Lighter markets", count);
    }

    async fn fetch(&self) -> Result<Vec<SymbolMetadata>> {
        let timer = PerfTimer::start("lighter_order_book_details");

        let response = monoio::time::timeout(self.fetch_timeout, self.http.get(&self.url))
            .await
            .map_err(|_| ExchangeError::Timeout(format!("market metadata after {:?}", self.fetch_timeout)))??
            .error_for_status()?;

        let parsed: OrderBookDetailsResponse = response.json()?;
        parsed.status.ensure_ok()?;

        let markets = parsed
            .order_book_details
            .into_iter()
            .filter_map(SymbolMetadata::from_detail)
            .collect();

        timer.log_elapsed();
        Ok(markets)
    }
}
