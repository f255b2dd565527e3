//! Load Lighter market metadata and show how sizes and prices scale
//!
//! Needs no credentials: the metadata endpoint is public.
//!
//! ```text
//! cargo run -p dexbridge-tests --example lighter_markets -- ETH 0.5 3024.66
//! ```

use anyhow::{Context, bail};
use dexbridge_core::prelude::*;
use dexbridge_exchanges::lighter::config::METADATA_URL;
use dexbridge_exchanges::lighter::{MarketMetadataCache, UnitConverter};
use dexbridge_exchanges::MonoioHttpsClient;
use std::rc::Rc;
use std::time::Duration;
use tracing::info;

#[monoio::main(enable_timer = true)]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let mut args = std::env::args().skip(1);
    let symbol = args.next().unwrap_or_else(|| "ETH".to_string());
    let amount = Fixed::from_str_exact(&args.next().unwrap_or_else(|| "0.5".to_string()))
        .context("amount must be a decimal")?;
    let price = Fixed::from_str_exact(&args.next().unwrap_or_else(|| "3000".to_string()))
        .context("price must be a decimal")?;

    info!("🚀 Loading Lighter markets from {}", METADATA_URL);
    let timer = PerfTimer::start("load_markets");

    let http = Rc::new(MonoioHttpsClient::new().with_timeout(Duration::from_secs(10)));
    let markets = Rc::new(MarketMetadataCache::new(http, METADATA_URL, Duration::from_secs(10)));
    markets.ensure_loaded().await;
    let elapsed = timer.log_elapsed();

    if !markets.is_loaded() {
        bail!("market metadata could not be loaded");
    }

    let all = markets.markets();
    info!("📚 {} markets loaded in {}μs", all.len(), elapsed);
    for market in &all {
        info!(
            "   #{:<4} {:<10} size_decimals={} price_decimals={}",
            market.market_id, market.symbol, market.size_decimals, market.price_decimals
        );
    }

    let units = UnitConverter::new(markets.clone());
    let raw_amount = units.amount_to_base(amount, &symbol).await?;
    let raw_price = units.price_to_base(price, &symbol).await?;

    info!("🔢 {} {} -> {} base units", amount, symbol, raw_amount);
    info!("🔢 price {} -> {} base units", price, raw_price);
    let decoded_amount = units.amount_from_base(&raw_amount.to_string(), &symbol).await?;
    let decoded_price = units.price_from_base(&raw_price.to_string(), &symbol).await?;
    info!("🔁 decoded back: amount {} price {}", decoded_amount, decoded_price);

    Ok(())
}
