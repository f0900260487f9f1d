//! Data provider clients for coinsage.
//!
//! Three upstream services feed the research pipeline:
//! - CoinGecko: asset search/resolution, price history, token profiles
//! - CryptoPanic: latest headlines with sentiment
//! - GeckoTerminal: DEX pool search (disambiguation) and pool stats
//!
//! The agent crate only sees the `ResearchTools` trait; `LiveTools` wires
//! the real clients, tests substitute stubs. Each call makes one attempt
//! and returns a classified `ToolFailure` — the dispatcher owns timeouts
//! and the at-most-one-retry policy.

pub mod cache;
pub mod coingecko;
pub mod cryptopanic;
pub mod geckoterminal;
pub mod http;
pub mod indicators;

pub use cache::TtlCache;
pub use coingecko::CoinGeckoClient;
pub use cryptopanic::CryptoPanicClient;
pub use geckoterminal::GeckoTerminalClient;
pub use http::HttpFetcher;

use async_trait::async_trait;
use coinsage_config::ToolsConfig;
use coinsage_core::error::ToolFailure;
use coinsage_core::market::{MarketSnapshot, PoolStats};
use coinsage_core::news::NewsDigest;
use coinsage_core::token::{AssetMatch, DexCandidate, TokenProfile};
use std::time::Duration;

/// Typed access to the external data providers.
#[async_trait]
pub trait ResearchTools: Send + Sync {
    /// Resolve a natural-language asset query to a single market.
    async fn resolve_asset(&self, query: &str) -> Result<AssetMatch, ToolFailure>;

    /// Price history over the fixed day window, with computed indicators.
    async fn market_history(&self, coin_id: &str, symbol: &str)
    -> Result<MarketSnapshot, ToolFailure>;

    /// Minimal token identity card.
    async fn token_profile(&self, coin_id: &str, symbol: &str)
    -> Result<TokenProfile, ToolFailure>;

    /// Latest headlines for a symbol.
    async fn latest_news(&self, symbol: &str) -> Result<NewsDigest, ToolFailure>;

    /// DEX pool candidates for an unresolved asset query.
    async fn search_pools(&self, query: &str, limit: usize)
    -> Result<Vec<DexCandidate>, ToolFailure>;

    /// Stats for one selected DEX pool.
    async fn pool(&self, pool_id: &str) -> Result<PoolStats, ToolFailure>;
}

/// Production implementation over the real provider clients.
pub struct LiveTools {
    coingecko: CoinGeckoClient,
    cryptopanic: CryptoPanicClient,
    geckoterminal: GeckoTerminalClient,
}

impl LiveTools {
    pub fn from_config(config: &ToolsConfig) -> Self {
        let http = HttpFetcher::new(config.call_timeout_secs);
        let cache_ttl = Duration::from_secs(config.cache_ttl_secs);

        Self {
            coingecko: CoinGeckoClient::new(
                http.clone(),
                &config.price_api_base,
                config.history_days,
                cache_ttl,
            ),
            cryptopanic: CryptoPanicClient::new(
                http.clone(),
                &config.news_api_base,
                config.news_api_key.clone(),
                cache_ttl,
            ),
            geckoterminal: GeckoTerminalClient::new(http, &config.dex_api_base, cache_ttl),
        }
    }
}

#[async_trait]
impl ResearchTools for LiveTools {
    async fn resolve_asset(&self, query: &str) -> Result<AssetMatch, ToolFailure> {
        self.coingecko.resolve_asset(query).await
    }

    async fn market_history(
        &self,
        coin_id: &str,
        symbol: &str,
    ) -> Result<MarketSnapshot, ToolFailure> {
        self.coingecko.market_history(coin_id, symbol).await
    }

    async fn token_profile(
        &self,
        coin_id: &str,
        symbol: &str,
    ) -> Result<TokenProfile, ToolFailure> {
        self.coingecko.token_profile(coin_id, symbol).await
    }

    async fn latest_news(&self, symbol: &str) -> Result<NewsDigest, ToolFailure> {
        self.cryptopanic.latest_news(symbol).await
    }

    async fn search_pools(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<DexCandidate>, ToolFailure> {
        self.geckoterminal.search_pools(query, limit).await
    }

    async fn pool(&self, pool_id: &str) -> Result<PoolStats, ToolFailure> {
        self.geckoterminal.pool(pool_id).await
    }
}
