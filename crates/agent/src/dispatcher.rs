//! Concurrent tool dispatch with partial-failure tolerance.
//!
//! For a resolved plan the three research calls (price history, token
//! profile, news) run concurrently, each under its own timeout. Every
//! call produces exactly one Observation, success or failure — a failed
//! sibling never drops another call's result. Transient failures
//! (timeout, unclassified upstream error) get at most one retry;
//! rate limits, auth failures, and not-found are returned as-is.

use crate::sequencer::StreamSequencer;
use coinsage_core::error::{ToolErrorKind, ToolFailure};
use coinsage_core::observation::{Observation, ObservationKind, ObservationPayload};
use coinsage_tools::ResearchTools;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct ToolDispatcher {
    tools: Arc<dyn ResearchTools>,
    call_timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(tools: Arc<dyn ResearchTools>, call_timeout_secs: u64) -> Self {
        Self {
            tools,
            call_timeout: Duration::from_secs(call_timeout_secs),
        }
    }

    /// Research calls for a resolved listed asset. Returns one
    /// Observation per call, in a fixed order: technicals, profile, news.
    pub async fn dispatch(
        &self,
        coin_id: &str,
        symbol: &str,
        seq: &StreamSequencer,
    ) -> Vec<Observation> {
        let (technicals, profile, news) = tokio::join!(
            self.call(seq, "market_history", ObservationKind::Technicals, || async {
                self.tools
                    .market_history(coin_id, symbol)
                    .await
                    .map(ObservationPayload::Technicals)
            }),
            self.call(seq, "token_profile", ObservationKind::TokenProfile, || async {
                self.tools
                    .token_profile(coin_id, symbol)
                    .await
                    .map(ObservationPayload::TokenProfile)
            }),
            self.call(seq, "latest_news", ObservationKind::News, || async {
                self.tools
                    .latest_news(symbol)
                    .await
                    .map(ObservationPayload::News)
            }),
        );
        vec![technicals, profile, news]
    }

    /// Stats for a caller-selected DEX pool. One call, one Observation;
    /// RSI/MACD do not exist on this path.
    pub async fn dispatch_pool(&self, pool_id: &str, seq: &StreamSequencer) -> Vec<Observation> {
        let observation = self
            .call(seq, "pool", ObservationKind::DexPool, || async {
                self.tools.pool(pool_id).await.map(ObservationPayload::DexPool)
            })
            .await;
        vec![observation]
    }

    /// Run one tool call under the per-call timeout with at most one
    /// retry, then emit its paired `tool` and `observation` events.
    async fn call<F, Fut>(
        &self,
        seq: &StreamSequencer,
        name: &str,
        kind: ObservationKind,
        f: F,
    ) -> Observation
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<ObservationPayload, ToolFailure>>,
    {
        let started = Instant::now();
        let mut outcome = self.attempt(name, &f).await;
        if let Err(failure) = &outcome
            && failure.is_transient()
        {
            debug!(tool = name, error = %failure, "Transient failure, retrying once");
            outcome = self.attempt(name, &f).await;
        }
        let ms = started.elapsed().as_millis() as u64;

        let observation = match outcome {
            Ok(payload) => {
                let summary = describe(&payload);
                Observation::success(payload, summary, ms)
            }
            Err(failure) => Observation::failure(kind, &failure, ms),
        };

        let note = observation.error.as_ref().map(|e| e.message.clone());
        // Send failures mean the consumer is gone; the observation is
        // still returned so the report stays complete.
        let _ = seq.tool(name, observation.ok, ms, note).await;
        let _ = seq.observation(observation.clone()).await;
        observation
    }

    async fn attempt<F, Fut>(&self, name: &str, f: &F) -> Result<ObservationPayload, ToolFailure>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<ObservationPayload, ToolFailure>>,
    {
        match tokio::time::timeout(self.call_timeout, f()).await {
            Ok(result) => result,
            Err(_) => Err(ToolFailure::new(
                ToolErrorKind::Timeout,
                format!("{name} exceeded {}s", self.call_timeout.as_secs()),
            )),
        }
    }
}

fn describe(payload: &ObservationPayload) -> String {
    match payload {
        ObservationPayload::Technicals(snap) => format!("Computed RSI/MACD for {}.", snap.symbol),
        ObservationPayload::News(digest) => format!("Retrieved {} headlines.", digest.items.len()),
        ObservationPayload::TokenProfile(profile) => {
            format!("Loaded token profile for {}.", profile.symbol)
        }
        ObservationPayload::DexPool(_) => {
            "Loaded DEX pool stats (price/liquidity/volume). RSI/MACD not available for DEX-only analysis.".into()
        }
        ObservationPayload::Candidates(c) => format!("Found {} candidate pools.", c.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{eth_snapshot, StubTools};
    use async_trait::async_trait;
    use coinsage_core::event::ResearchEvent;
    use coinsage_core::market::{MarketSnapshot, PoolStats};
    use coinsage_core::news::NewsDigest;
    use coinsage_core::token::{AssetMatch, DexCandidate, TokenProfile};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn every_call_yields_an_observation_despite_sibling_failure() {
        let tools = StubTools::default().with_news(Err(ToolFailure::rate_limited(
            "HTTP 429 from news provider",
            Some(30),
        )));
        let dispatcher = ToolDispatcher::new(Arc::new(tools), 5);
        let (seq, mut rx) = StreamSequencer::channel(32);

        let observations = dispatcher.dispatch("ethereum", "ETH", &seq).await;
        drop(seq);

        assert_eq!(observations.len(), 3);
        assert!(observations[0].ok, "technicals should survive news failure");
        assert!(observations[1].ok, "profile should survive news failure");
        let news = &observations[2];
        assert!(!news.ok);
        let err = news.error.as_ref().unwrap();
        assert_eq!(err.kind, ToolErrorKind::RateLimited);
        assert_eq!(err.retry_after_secs, Some(30));

        // Each tool event is paired with its observation.
        let mut tool_events = 0;
        let mut observation_events = 0;
        while let Some(event) = rx.recv().await {
            match event {
                ResearchEvent::Tool { .. } => tool_events += 1,
                ResearchEvent::Observation { .. } => observation_events += 1,
                _ => {}
            }
        }
        assert_eq!(tool_events, 3);
        assert_eq!(observation_events, 3);
    }

    #[tokio::test]
    async fn rate_limit_is_not_retried() {
        let tools = Arc::new(StubTools::default().with_news(Err(ToolFailure::rate_limited(
            "HTTP 429",
            Some(60),
        ))));
        let dispatcher = ToolDispatcher::new(tools.clone(), 5);
        let (seq, _rx) = StreamSequencer::channel(32);

        dispatcher.dispatch("ethereum", "ETH", &seq).await;

        let news_calls = tools.calls().iter().filter(|c| c.starts_with("news")).count();
        assert_eq!(news_calls, 1);
    }

    /// Fails the first history call with a timeout, succeeds after.
    struct FlakyTools {
        inner: StubTools,
        history_attempts: AtomicUsize,
    }

    #[async_trait]
    impl ResearchTools for FlakyTools {
        async fn resolve_asset(&self, query: &str) -> Result<AssetMatch, ToolFailure> {
            self.inner.resolve_asset(query).await
        }

        async fn market_history(
            &self,
            coin_id: &str,
            symbol: &str,
        ) -> Result<MarketSnapshot, ToolFailure> {
            if self.history_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ToolFailure::new(ToolErrorKind::Timeout, "upstream stalled"));
            }
            self.inner.market_history(coin_id, symbol).await
        }

        async fn token_profile(
            &self,
            coin_id: &str,
            symbol: &str,
        ) -> Result<TokenProfile, ToolFailure> {
            self.inner.token_profile(coin_id, symbol).await
        }

        async fn latest_news(&self, symbol: &str) -> Result<NewsDigest, ToolFailure> {
            self.inner.latest_news(symbol).await
        }

        async fn search_pools(
            &self,
            query: &str,
            limit: usize,
        ) -> Result<Vec<DexCandidate>, ToolFailure> {
            self.inner.search_pools(query, limit).await
        }

        async fn pool(&self, pool_id: &str) -> Result<PoolStats, ToolFailure> {
            self.inner.pool(pool_id).await
        }
    }

    #[tokio::test]
    async fn transient_failure_gets_exactly_one_retry() {
        let tools = Arc::new(FlakyTools {
            inner: StubTools::default(),
            history_attempts: AtomicUsize::new(0),
        });
        let dispatcher = ToolDispatcher::new(tools.clone(), 5);
        let (seq, _rx) = StreamSequencer::channel(32);

        let observations = dispatcher.dispatch("ethereum", "ETH", &seq).await;

        assert_eq!(tools.history_attempts.load(Ordering::SeqCst), 2);
        assert!(observations[0].ok);
        assert_eq!(
            observations[0].payload.as_ref().map(|p| p.kind()),
            Some(ObservationKind::Technicals)
        );
    }

    #[tokio::test]
    async fn persistent_transient_failure_stops_after_one_retry() {
        let tools = Arc::new(StubTools::default().with_history(Err(ToolFailure::new(
            ToolErrorKind::Unknown,
            "HTTP 502",
        ))));
        let dispatcher = ToolDispatcher::new(tools.clone(), 5);
        let (seq, _rx) = StreamSequencer::channel(32);

        let observations = dispatcher.dispatch("ethereum", "ETH", &seq).await;

        let history_calls = tools
            .calls()
            .iter()
            .filter(|c| c.starts_with("history"))
            .count();
        assert_eq!(history_calls, 2);
        assert!(!observations[0].ok);
    }

    #[tokio::test]
    async fn pool_dispatch_yields_single_dex_observation() {
        let dispatcher = ToolDispatcher::new(Arc::new(StubTools::default()), 5);
        let (seq, mut rx) = StreamSequencer::channel(32);

        let observations = dispatcher.dispatch_pool("solana_0xpool0", &seq).await;
        drop(seq);

        assert_eq!(observations.len(), 1);
        assert!(observations[0].ok);
        assert_eq!(observations[0].kind, ObservationKind::DexPool);
        assert!(observations[0].summary.contains("RSI/MACD not available"));

        let mut names = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ResearchEvent::Tool { name, .. } = event {
                names.push(name);
            }
        }
        assert_eq!(names, vec!["pool"]);
    }

    #[test]
    fn summaries_name_the_payload() {
        assert_eq!(
            describe(&ObservationPayload::Technicals(eth_snapshot())),
            "Computed RSI/MACD for ETH."
        );
        assert!(describe(&ObservationPayload::Candidates(Vec::new())).contains("0 candidate"));
    }
}
