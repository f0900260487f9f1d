//! CoinGecko client — asset search/resolution, price history, profiles.

use crate::cache::TtlCache;
use crate::http::HttpFetcher;
use crate::indicators;
use coinsage_core::error::{ToolErrorKind, ToolFailure};
use coinsage_core::market::{MarketSnapshot, PricePoint};
use coinsage_core::token::{AssetMatch, TokenProfile};
use std::time::Duration;
use tracing::debug;

/// Hardwired ids for majors so they never pay a search round-trip.
const SYMBOL_OVERRIDES: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("eth", "ethereum"),
    ("sol", "solana"),
    ("ada", "cardano"),
    ("xrp", "ripple"),
    ("doge", "dogecoin"),
];

pub struct CoinGeckoClient {
    http: HttpFetcher,
    base_url: String,
    history_days: u32,
    cache: TtlCache<serde_json::Value>,
}

impl CoinGeckoClient {
    pub fn new(http: HttpFetcher, base_url: impl Into<String>, history_days: u32, cache_ttl: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            history_days,
            cache: TtlCache::new(cache_ttl),
        }
    }

    async fn get_cached(
        &self,
        namespace: &str,
        key: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, ToolFailure> {
        if let Some(hit) = self.cache.get(namespace, key) {
            debug!(namespace, key, "cache hit");
            return Ok(hit);
        }
        let value = self.http.get_json(url, params).await?;
        self.cache.set(namespace, key, value.clone());
        Ok(value)
    }

    /// Search for coins matching a free-text query.
    pub async fn search(&self, query: &str) -> Result<Vec<AssetMatch>, ToolFailure> {
        let q = query.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/search", self.base_url);
        let data = self
            .get_cached("search", &q.to_lowercase(), &url, &[("query", q)])
            .await?;

        let coins = data["coins"].as_array().cloned().unwrap_or_default();
        Ok(coins
            .iter()
            .filter_map(|c| {
                let coin_id = c["id"].as_str()?.to_string();
                Some(AssetMatch {
                    coin_id,
                    name: c["name"].as_str().map(String::from),
                    symbol: c["symbol"].as_str().map(|s| s.to_uppercase()),
                    market_cap_rank: c["market_cap_rank"].as_u64().map(|r| r as u32),
                })
            })
            .collect())
    }

    /// Resolve a natural-language asset query to the best-ranked market.
    ///
    /// Picks the lowest market-cap rank; unranked results sort last.
    /// Majors bypass search entirely via the override table.
    pub async fn resolve_asset(&self, query: &str) -> Result<AssetMatch, ToolFailure> {
        let normalized = query.trim().to_lowercase();
        if let Some((symbol, coin_id)) = SYMBOL_OVERRIDES
            .iter()
            .find(|(s, _)| *s == normalized)
        {
            return Ok(AssetMatch {
                coin_id: (*coin_id).into(),
                name: None,
                symbol: Some(symbol.to_uppercase()),
                market_cap_rank: None,
            });
        }

        let mut matches = self.search(query).await?;
        if matches.is_empty() {
            return Err(ToolFailure::new(
                ToolErrorKind::NotFound,
                format!("no search results for '{query}'"),
            ));
        }

        matches.sort_by_key(|m| m.market_cap_rank.unwrap_or(u32::MAX));
        Ok(matches.remove(0))
    }

    /// Fetch the close series for the configured day window and compute
    /// indicators locally.
    pub async fn market_history(
        &self,
        coin_id: &str,
        symbol: &str,
    ) -> Result<MarketSnapshot, ToolFailure> {
        let url = format!("{}/coins/{}/market_chart", self.base_url, coin_id);
        let days = self.history_days.to_string();
        let data = self
            .get_cached(
                "market",
                coin_id,
                &url,
                &[("vs_currency", "usd"), ("days", &days)],
            )
            .await?;

        let raw = data["prices"].as_array().cloned().unwrap_or_default();
        let mut series: Vec<PricePoint> = raw
            .iter()
            .filter_map(|pair| {
                let t = pair.get(0)?.as_f64()? as i64;
                let p = pair.get(1)?.as_f64()?;
                Some(PricePoint { t, p })
            })
            .collect();
        series.sort_by_key(|pt| pt.t);

        let closes: Vec<f64> = series.iter().map(|pt| pt.p).collect();
        let last = *closes.last().ok_or_else(|| {
            ToolFailure::new(
                ToolErrorKind::Unknown,
                format!("empty market_chart response for '{coin_id}'"),
            )
        })?;

        let indicators = indicators::indicator_set(&closes).ok_or_else(|| {
            ToolFailure::new(
                ToolErrorKind::Unknown,
                format!("series too short for indicators ({} points)", closes.len()),
            )
        })?;
        let range = indicators::price_range(&closes).ok_or_else(|| {
            ToolFailure::new(ToolErrorKind::Unknown, "empty close series".to_string())
        })?;

        Ok(MarketSnapshot {
            symbol: symbol.to_uppercase(),
            coin_id: coin_id.to_string(),
            days: self.history_days,
            last_price_usd: last,
            range,
            volatility: indicators::volatility(&closes),
            price_series: indicators::downsample(&series, 60),
            indicators,
        })
    }

    /// Fetch a minimal token profile, including an image URL.
    pub async fn token_profile(
        &self,
        coin_id: &str,
        symbol: &str,
    ) -> Result<TokenProfile, ToolFailure> {
        let url = format!("{}/coins/{}", self.base_url, coin_id);
        let data = self
            .get_cached(
                "profile",
                coin_id,
                &url,
                &[
                    ("localization", "false"),
                    ("tickers", "false"),
                    ("market_data", "false"),
                    ("community_data", "false"),
                    ("developer_data", "false"),
                    ("sparkline", "false"),
                ],
            )
            .await?;

        let image = &data["image"];
        let image_url = image["large"]
            .as_str()
            .or_else(|| image["small"].as_str())
            .or_else(|| image["thumb"].as_str())
            .map(String::from);

        Ok(TokenProfile {
            symbol: symbol.to_uppercase(),
            coin_id: Some(coin_id.to_string()),
            name: data["name"].as_str().map(String::from),
            image_url,
            homepage: data["links"]["homepage"]
                .as_array()
                .and_then(|a| a.first())
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(String::from),
            listing_url: Some(format!("https://www.coingecko.com/en/coins/{coin_id}")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CoinGeckoClient {
        CoinGeckoClient::new(
            HttpFetcher::new(1),
            "http://127.0.0.1:1/api/v3",
            30,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn overrides_skip_search() {
        // Points at a dead port; succeeding proves no network round-trip.
        let resolved = client().resolve_asset("ETH").await.unwrap();
        assert_eq!(resolved.coin_id, "ethereum");
        assert_eq!(resolved.symbol.as_deref(), Some("ETH"));
    }

    #[tokio::test]
    async fn empty_query_searches_nothing() {
        let matches = client().search("   ").await.unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn override_table_covers_majors() {
        for symbol in ["btc", "eth", "sol", "ada", "xrp", "doge"] {
            assert!(SYMBOL_OVERRIDES.iter().any(|(s, _)| *s == symbol));
        }
    }
}
