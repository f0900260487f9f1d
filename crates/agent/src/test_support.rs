//! Shared stubs for agent tests: a scripted tool set and a scripted
//! generation backend. No network anywhere.

use async_trait::async_trait;
use coinsage_core::error::{GenerationError, ToolErrorKind, ToolFailure};
use coinsage_core::generation::{GenerationRequest, Generator};
use coinsage_core::market::{
    IndicatorSet, MacdLabel, MacdSummary, MarketSnapshot, PoolStats, PricePoint, PriceRange,
    Volatility,
};
use coinsage_core::news::{NewsDigest, NewsItem, Sentiment, SentimentSource};
use coinsage_core::token::{AssetMatch, DexCandidate, PoolToken, TokenProfile};
use coinsage_tools::ResearchTools;
use std::sync::Mutex;
use std::time::Duration;

pub fn eth_match() -> AssetMatch {
    AssetMatch {
        coin_id: "ethereum".into(),
        name: Some("Ethereum".into()),
        symbol: Some("eth".into()),
        market_cap_rank: Some(2),
    }
}

pub fn eth_snapshot() -> MarketSnapshot {
    MarketSnapshot {
        symbol: "ETH".into(),
        coin_id: "ethereum".into(),
        days: 30,
        last_price_usd: 3000.0,
        range: PriceRange {
            low_usd: 2500.0,
            high_usd: 3200.0,
            pct_from_low: Some(0.2),
            pct_from_high: Some(-0.0625),
        },
        volatility: Volatility {
            daily_return_std: Some(0.03),
            annualized_std: Some(0.57),
        },
        price_series: (0..30)
            .map(|i| PricePoint {
                t: i * 86_400_000,
                p: 2500.0 + i as f64 * 20.0,
            })
            .collect(),
        indicators: IndicatorSet {
            rsi_14: 55.0,
            macd: MacdSummary {
                line: 1.0,
                signal: 0.5,
                histogram: 0.5,
                label: MacdLabel::Bullish,
            },
        },
    }
}

pub fn eth_profile() -> TokenProfile {
    TokenProfile {
        symbol: "ETH".into(),
        coin_id: Some("ethereum".into()),
        name: Some("Ethereum".into()),
        image_url: Some("https://img.example/eth.png".into()),
        homepage: Some("https://ethereum.org".into()),
        listing_url: Some("https://www.coingecko.com/en/coins/ethereum".into()),
    }
}

pub fn news_digest(n: usize) -> NewsDigest {
    NewsDigest {
        symbol: "ETH".into(),
        items: (0..n)
            .map(|i| NewsItem {
                title: format!("Headline {i} about the network"),
                url: Some(format!("https://news.example/{i}")),
                domain: Some("news.example".into()),
                published_at: Some("2026-08-01T00:00:00Z".into()),
                sentiment: Sentiment::Neutral,
                sentiment_source: SentimentSource::Estimated,
            })
            .collect(),
    }
}

pub fn candidates(n: usize) -> Vec<DexCandidate> {
    (0..n)
        .map(|i| DexCandidate {
            id: format!("solana_0xpool{i}"),
            network: Some("solana".into()),
            address: Some(format!("0xpool{i}")),
            name: Some(format!("MOONPUP / SOL #{i}")),
            dex: Some("raydium".into()),
            liquidity_usd: Some(40_000.0 - i as f64 * 1000.0),
            base_token: PoolToken {
                name: Some("Moonpup".into()),
                symbol: Some("MOONPUP".into()),
                address: Some(format!("0xbase{i}")),
                image_url: None,
            },
            quote_token: PoolToken {
                name: Some("Solana".into()),
                symbol: Some("SOL".into()),
                address: None,
                image_url: None,
            },
            price_usd: Some(0.0001),
            pool_url: Some(format!("https://dex.example/pool{i}")),
        })
        .collect()
}

pub fn sample_pool() -> PoolStats {
    PoolStats {
        id: "solana_0xpool0".into(),
        network: "solana".into(),
        address: "0xpool0".into(),
        name: Some("MOONPUP / SOL".into()),
        dex: Some("raydium".into()),
        liquidity_usd: Some(38_000.0),
        price_usd: Some(0.0001),
        volume_usd_h24: Some(12_000.0),
        pool_url: "https://dex.example/pool0".into(),
        base_symbol: Some("MOONPUP".into()),
        base_name: Some("Moonpup".into()),
        base_image_url: None,
    }
}

/// Scripted tool set. Every call is logged so tests can assert which
/// providers were (not) consulted.
pub struct StubTools {
    pub resolve: Result<AssetMatch, ToolFailure>,
    pub history: Result<MarketSnapshot, ToolFailure>,
    pub profile: Result<TokenProfile, ToolFailure>,
    pub news: Result<NewsDigest, ToolFailure>,
    pub pools: Result<Vec<DexCandidate>, ToolFailure>,
    pub pool: Result<PoolStats, ToolFailure>,
    calls: Mutex<Vec<String>>,
}

impl Default for StubTools {
    fn default() -> Self {
        Self {
            resolve: Ok(eth_match()),
            history: Ok(eth_snapshot()),
            profile: Ok(eth_profile()),
            news: Ok(news_digest(2)),
            pools: Ok(Vec::new()),
            pool: Ok(sample_pool()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl StubTools {
    /// Asset search finds nothing; DEX search offers `n` candidates.
    pub fn with_unresolvable(mut self, n: usize) -> Self {
        self.resolve = Err(ToolFailure::new(ToolErrorKind::NotFound, "no market matched"));
        self.pools = Ok(candidates(n));
        self
    }

    pub fn with_news(mut self, news: Result<NewsDigest, ToolFailure>) -> Self {
        self.news = news;
        self
    }

    pub fn with_history(mut self, history: Result<MarketSnapshot, ToolFailure>) -> Self {
        self.history = history;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn log(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call.into());
    }
}

#[async_trait]
impl ResearchTools for StubTools {
    async fn resolve_asset(&self, query: &str) -> Result<AssetMatch, ToolFailure> {
        self.log(format!("resolve:{query}"));
        self.resolve.clone()
    }

    async fn market_history(
        &self,
        coin_id: &str,
        _symbol: &str,
    ) -> Result<MarketSnapshot, ToolFailure> {
        self.log(format!("history:{coin_id}"));
        self.history.clone()
    }

    async fn token_profile(
        &self,
        coin_id: &str,
        _symbol: &str,
    ) -> Result<TokenProfile, ToolFailure> {
        self.log(format!("profile:{coin_id}"));
        self.profile.clone()
    }

    async fn latest_news(&self, symbol: &str) -> Result<NewsDigest, ToolFailure> {
        self.log(format!("news:{symbol}"));
        self.news.clone()
    }

    async fn search_pools(
        &self,
        query: &str,
        _limit: usize,
    ) -> Result<Vec<DexCandidate>, ToolFailure> {
        self.log(format!("search:{query}"));
        self.pools.clone()
    }

    async fn pool(&self, pool_id: &str) -> Result<PoolStats, ToolFailure> {
        self.log(format!("pool:{pool_id}"));
        self.pool.clone()
    }
}

/// Scripted generation backend. Routes by the system message so one
/// stub serves planning, summarization, and answer synthesis.
pub struct StubGenerator {
    plan_json: String,
    summary: String,
    deltas: Vec<String>,
    fail_stream_after: Option<usize>,
    delta_delay: Duration,
}

impl StubGenerator {
    pub fn with_plan_json(plan_json: impl Into<String>) -> Self {
        Self {
            plan_json: plan_json.into(),
            summary: "• user is researching crypto".into(),
            deltas: vec![
                "Summary: momentum looks constructive. ".into(),
                "Action plan: wait for confirmation. ".into(),
                "Not financial advice.".into(),
            ],
            fail_stream_after: None,
            delta_delay: Duration::ZERO,
        }
    }

    pub fn crypto_plan(asset: &str, language: &str) -> Self {
        Self::with_plan_json(format!(
            r#"{{"intent": "crypto", "asset_query": "{asset}", "language": "{language}"}}"#
        ))
    }

    pub fn general_plan(language: &str) -> Self {
        Self::with_plan_json(format!(
            r#"{{"intent": "general", "asset_query": null, "language": "{language}"}}"#
        ))
    }

    pub fn with_deltas(mut self, deltas: &[&str]) -> Self {
        self.deltas = deltas.iter().map(|d| d.to_string()).collect();
        self
    }

    /// Stream errors out after yielding `n` deltas.
    pub fn failing_stream_after(mut self, n: usize) -> Self {
        self.fail_stream_after = Some(n);
        self
    }

    /// Slow the delta stream down (cancellation tests).
    pub fn with_delta_delay(mut self, delay: Duration) -> Self {
        self.delta_delay = delay;
        self
    }
}

#[async_trait]
impl Generator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let system = request
            .messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        if system.contains("strict JSON") {
            Ok(self.plan_json.clone())
        } else if system.contains("summarize chat history") {
            Ok(self.summary.clone())
        } else {
            Ok(self.deltas.concat())
        }
    }

    async fn stream(
        &self,
        _request: GenerationRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<String, GenerationError>>, GenerationError>
    {
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let deltas = self.deltas.clone();
        let fail_after = self.fail_stream_after;
        let delay = self.delta_delay;
        tokio::spawn(async move {
            for (i, delta) in deltas.into_iter().enumerate() {
                if fail_after == Some(i) {
                    let _ = tx
                        .send(Err(GenerationError::StreamInterrupted(
                            "connection reset".into(),
                        )))
                        .await;
                    return;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(Ok(delta)).await.is_err() {
                    return;
                }
            }
            if let Some(n) = fail_after {
                // fail_after >= len: still report the interruption.
                let _ = tx
                    .send(Err(GenerationError::StreamInterrupted(format!(
                        "interrupted after {n} chunks"
                    ))))
                    .await;
            }
        });
        Ok(rx)
    }
}
