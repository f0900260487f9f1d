//! Market data value objects.
//!
//! A `MarketSnapshot` is the normalized output of the price-history tool:
//! a fixed-day window of USD closes with locally computed technical
//! indicators. Indicator values are deterministic for a given input
//! series — there is no dependency on any external indicator library.

use serde::{Deserialize, Serialize};

/// One point in a downsampled price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix timestamp in milliseconds.
    pub t: i64,
    /// USD price.
    pub p: f64,
}

/// MACD(12,26,9) components with a coarse directional label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdSummary {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
    /// "bullish" when the histogram is non-negative, "bearish" otherwise.
    pub label: MacdLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacdLabel {
    Bullish,
    Bearish,
}

/// Technical indicators computed over the close series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// RSI over a 14-bar window, in [0, 100].
    pub rsi_14: f64,
    pub macd: MacdSummary,
}

/// Low/high of the window and where the last close sits relative to both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low_usd: f64,
    pub high_usd: f64,
    pub pct_from_low: Option<f64>,
    pub pct_from_high: Option<f64>,
}

/// Volatility estimate from simple daily returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volatility {
    pub daily_return_std: Option<f64>,
    pub annualized_std: Option<f64>,
}

/// The full technical picture for one asset over a fixed day window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub coin_id: String,
    pub days: u32,
    pub last_price_usd: f64,
    pub range: PriceRange,
    pub volatility: Volatility,
    /// Downsampled close series (sparkline-friendly, at most ~60 points).
    pub price_series: Vec<PricePoint>,
    pub indicators: IndicatorSet,
}

/// Stats for one DEX pool, used when research targets a DEX-only token.
///
/// RSI/MACD are not available on this path; the pool carries spot
/// price, liquidity, and volume instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub id: String,
    pub network: String,
    pub address: String,
    pub name: Option<String>,
    pub dex: Option<String>,
    pub liquidity_usd: Option<f64>,
    pub price_usd: Option<f64>,
    pub volume_usd_h24: Option<f64>,
    pub pool_url: String,
    pub base_symbol: Option<String>,
    pub base_name: Option<String>,
    pub base_image_url: Option<String>,
}
