//! The session store: per-id conversation state with rolling summarization.

use coinsage_config::MemoryConfig;
use coinsage_core::generation::{ChatMessage, GenerationRequest, Generator};
use coinsage_core::session::{MemoryStats, Role, SessionId, Turn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Mutable state for one session. Owned by the store, accessed through
/// a per-session mutex so concurrent requests for the same id serialize
/// while other sessions proceed untouched.
pub struct SessionMemory {
    pub session_id: String,
    /// Rolling digest of turns older than the retained window.
    pub summary: String,
    /// Recent turns kept verbatim.
    pub turns: Vec<Turn>,
    /// Turns displaced from the window, queued for the next fold.
    pub pending: Vec<Turn>,
    /// Most recent resolved ticker, for coreference ("should I buy it?").
    pub last_symbol: Option<String>,
    next_seq: u64,
}

impl SessionMemory {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            summary: String::new(),
            turns: Vec::new(),
            pending: Vec::new(),
            last_symbol: None,
            next_seq: 0,
        }
    }

    /// Character footprint counted against the budget.
    pub fn footprint(&self) -> usize {
        self.summary.chars().count()
            + self.pending.iter().map(Turn::chars).sum::<usize>()
            + self.turns.iter().map(Turn::chars).sum::<usize>()
    }

    fn push(&mut self, role: Role, content: String, keep_last: usize) {
        self.turns.push(Turn::new(role, content, self.next_seq));
        self.next_seq += 1;
        while self.turns.len() > keep_last {
            let displaced = self.turns.remove(0);
            self.pending.push(displaced);
        }
    }

    fn stats(&self, max_chars: usize, was_summarized: bool, dropped: usize) -> MemoryStats {
        MemoryStats {
            approx_chars: self.footprint(),
            summary_chars: self.summary.chars().count(),
            max_chars,
            turns: self.turns.len(),
            pending_turns: self.pending.len(),
            was_summarized,
            dropped_turns: dropped,
        }
    }
}

struct SessionSlot {
    last_seen: Instant,
    memory: Arc<Mutex<SessionMemory>>,
}

/// Store of all live sessions, keyed by opaque id.
///
/// Sessions are created lazily on first use, evicted after an idle TTL,
/// and capped by an LRU bound.
pub struct SessionStore {
    config: MemoryConfig,
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl SessionStore {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Fetch (or lazily create) the session for an id, touching its
    /// recency. Expired sessions are swept on access.
    async fn session(&self, id: &SessionId) -> Arc<Mutex<SessionMemory>> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let ttl = Duration::from_secs(self.config.session_ttl_secs);

        sessions.retain(|_, slot| now.duration_since(slot.last_seen) <= ttl);

        // LRU bound: evict the stalest entry when inserting past capacity.
        if !sessions.contains_key(id.as_str()) && sessions.len() >= self.config.max_sessions {
            if let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, slot)| slot.last_seen)
                .map(|(k, _)| k.clone())
            {
                debug!(session = %oldest, "Evicting least-recently-used session");
                sessions.remove(&oldest);
            }
        }

        let slot = sessions
            .entry(id.as_str().to_string())
            .or_insert_with(|| SessionSlot {
                last_seen: now,
                memory: Arc::new(Mutex::new(SessionMemory::new(id.as_str().to_string()))),
            });
        slot.last_seen = now;
        slot.memory.clone()
    }

    /// Append a turn to a session.
    pub async fn append(&self, id: &SessionId, role: Role, content: &str) {
        let session = self.session(id).await;
        let mut mem = session.lock().await;
        mem.push(role, content.to_string(), self.config.keep_last_turns);
    }

    /// Read the summary and retained turns for context assembly.
    pub async fn read(&self, id: &SessionId) -> (String, Vec<Turn>) {
        let session = self.session(id).await;
        let mem = session.lock().await;
        (mem.summary.clone(), mem.turns.clone())
    }

    pub async fn set_last_symbol(&self, id: &SessionId, symbol: &str) {
        let session = self.session(id).await;
        session.lock().await.last_symbol = Some(symbol.to_string());
    }

    pub async fn last_symbol(&self, id: &SessionId) -> Option<String> {
        let session = self.session(id).await;
        session.lock().await.last_symbol.clone()
    }

    /// Append a turn, then fold older turns into the summary if the
    /// budget was crossed. This is the one entry point requests use, so
    /// the budget invariant holds after every append.
    pub async fn record_turn(
        &self,
        id: &SessionId,
        role: Role,
        content: &str,
        generator: Option<&dyn Generator>,
    ) -> MemoryStats {
        let session = self.session(id).await;
        let mut mem = session.lock().await;
        mem.push(role, content.to_string(), self.config.keep_last_turns);
        self.summarize_locked(&mut mem, generator).await
    }

    /// Fold pending turns into the summary when over budget; no-op when
    /// already under budget. Idempotent for a fixed turn sequence.
    pub async fn maybe_summarize(
        &self,
        id: &SessionId,
        generator: Option<&dyn Generator>,
    ) -> MemoryStats {
        let session = self.session(id).await;
        let mut mem = session.lock().await;
        self.summarize_locked(&mut mem, generator).await
    }

    async fn summarize_locked(
        &self,
        mem: &mut SessionMemory,
        generator: Option<&dyn Generator>,
    ) -> MemoryStats {
        let max_chars = self.config.max_chars;
        let should = !mem.pending.is_empty() && mem.footprint() > max_chars;

        if !should {
            // Still clamp pathological single-turn overflows.
            let dropped = self.clamp(mem);
            return mem.stats(max_chars, false, dropped);
        }

        let pending_text: String = mem
            .pending
            .iter()
            .map(|t| format!("{}: {}", t.role, t.content.trim()))
            .collect::<Vec<_>>()
            .join("\n");

        let mut summarized = false;
        if let Some(generator) = generator
            && !pending_text.trim().is_empty()
        {
            match generator
                .complete(
                    GenerationRequest::new(vec![
                        ChatMessage::system("You summarize chat history into short memory."),
                        ChatMessage::user(self.summary_prompt(&mem.summary, &pending_text)),
                    ])
                    .with_temperature(0.2),
                )
                .await
            {
                Ok(text) => {
                    mem.summary = text.trim().to_string();
                    summarized = true;
                }
                Err(e) => {
                    warn!(session = %mem.session_id, error = %e, "Summarization failed, truncating");
                }
            }
        }

        if !summarized {
            mem.summary = if mem.summary.is_empty() {
                "• (Older context summarized/trimmed.)".into()
            } else {
                format!(
                    "{} …",
                    truncate_chars(&mem.summary, self.config.summary_target_chars)
                )
            };
        }

        mem.summary = clean_summary(&mem.summary, self.config.summary_target_chars);
        let mut dropped = mem.pending.len();
        mem.pending.clear();

        dropped += self.clamp(mem);
        debug!(
            session = %mem.session_id,
            dropped,
            footprint = mem.footprint(),
            "Folded older turns into summary"
        );
        mem.stats(max_chars, true, dropped)
    }

    /// Last-resort enforcement of the budget invariant: shed oldest
    /// content until `summary + turns` fits. The most recent turn is
    /// only ever truncated, never removed.
    fn clamp(&self, mem: &mut SessionMemory) -> usize {
        let max_chars = self.config.max_chars;
        let mut dropped = 0;

        while mem.footprint() > max_chars && !mem.pending.is_empty() {
            mem.pending.remove(0);
            dropped += 1;
        }
        while mem.footprint() > max_chars && mem.turns.len() > 1 {
            mem.turns.remove(0);
            dropped += 1;
        }
        if mem.footprint() > max_chars {
            mem.summary = truncate_chars(&mem.summary, self.config.summary_target_chars);
        }
        if mem.footprint() > max_chars
            && let Some(last) = mem.turns.last_mut()
        {
            let budget = max_chars.saturating_sub(mem.summary.chars().count());
            last.content = truncate_chars(&last.content, budget);
        }
        dropped
    }

    fn summary_prompt(&self, existing: &str, pending_text: &str) -> String {
        format!(
            "Write a compact MEMORY SUMMARY for future turns.\n\
             Hard limits:\n- Max {} characters\n- Max 6 bullet points\n\n\
             Only keep DURABLE state:\n\
             - user goal / task\n\
             - explicit user preferences (language, formatting)\n\
             - decisions made / selected asset or selected DEX pool id\n\
             - unresolved questions / next step\n\n\
             DO NOT include:\n\
             - any numeric market data (prices, RSI, liquidity, volume)\n\
             - lists of news headlines\n\
             - long explanations or action plans\n\
             - unrelated topics (never introduce new coins/topics)\n\n\
             Output: bullet points in plain text (no markdown headings).\n\n\
             Existing summary:\n{}\n\n\
             Dialogue to compress:\n{}\n",
            self.config.summary_target_chars, existing, pending_text
        )
    }
}

/// Truncate to at most `max` characters, respecting char boundaries.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect::<String>().trim().to_string()
}

/// Deterministic post-processing of a generated summary: drop lines with
/// links or obvious numeric market dumps, keep at most 6 bullets, cap
/// the total length.
fn clean_summary(summary: &str, target_chars: usize) -> String {
    let mut cleaned: Vec<&str> = Vec::new();
    for line in summary.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.contains('$') || line.contains("http") || line.contains("www.") {
            continue;
        }
        if line.chars().filter(|c| c.is_ascii_digit()).count() >= 6 {
            continue;
        }
        cleaned.push(line);
        if cleaned.len() >= 6 {
            break;
        }
    }

    let joined = truncate_chars(&cleaned.join("\n"), target_chars);
    if joined.is_empty() {
        "• (Summary trimmed.)".into()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coinsage_core::error::GenerationError;

    struct StubSummarizer;

    #[async_trait]
    impl Generator for StubSummarizer {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            _request: GenerationRequest,
        ) -> std::result::Result<String, GenerationError> {
            Ok("• user is researching a coin\n• prefers short answers".into())
        }
    }

    fn store(max_chars: usize, keep_last: usize) -> SessionStore {
        SessionStore::new(MemoryConfig {
            max_chars,
            keep_last_turns: keep_last,
            summary_target_chars: 200,
            session_ttl_secs: 3600,
            max_sessions: 4,
        })
    }

    fn sid(s: &str) -> SessionId {
        SessionId::new(s)
    }

    #[tokio::test]
    async fn append_keeps_recent_window() {
        let store = store(10_000, 3);
        let id = sid("a");
        for i in 0..5 {
            store.append(&id, Role::User, &format!("turn {i}")).await;
        }
        let (summary, turns) = store.read(&id).await;
        assert!(summary.is_empty());
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].content, "turn 2");
        // Sequence numbers survive the window shift.
        assert_eq!(turns.last().unwrap().seq, 4);
    }

    #[tokio::test]
    async fn under_budget_summarize_is_noop() {
        let store = store(10_000, 3);
        let id = sid("a");
        for i in 0..5 {
            store.append(&id, Role::User, &format!("turn {i}")).await;
        }
        let (summary_before, turns_before) = store.read(&id).await;

        let stats = store.maybe_summarize(&id, Some(&StubSummarizer)).await;
        assert!(!stats.was_summarized);
        assert_eq!(stats.dropped_turns, 0);

        let (summary_after, turns_after) = store.read(&id).await;
        assert_eq!(summary_before, summary_after);
        assert_eq!(turns_before.len(), turns_after.len());
    }

    #[tokio::test]
    async fn budget_invariant_holds_after_every_append() {
        let store = store(2000, 6);
        let id = sid("a");
        let generator = StubSummarizer;
        for i in 0..20 {
            let content = format!("turn {i} {}", "x".repeat(140));
            let stats = store
                .record_turn(&id, Role::User, &content, Some(&generator))
                .await;
            let (summary, turns) = store.read(&id).await;
            let footprint =
                summary.chars().count() + turns.iter().map(Turn::chars).sum::<usize>();
            assert!(
                footprint <= 2000,
                "turn {i}: summary+turns {footprint} over budget"
            );
            assert!(stats.approx_chars <= stats.max_chars + stats.pending_turns * 160);
        }
    }

    #[tokio::test]
    async fn summarizes_exactly_once_at_crossing() {
        let store = store(2000, 6);
        let id = sid("a");
        let generator = StubSummarizer;
        let mut summarized_turns = Vec::new();
        let mut turns_before_crossing = 0;

        for i in 0..20 {
            let content = format!("turn {i} {}", "x".repeat(140));
            let stats = store
                .record_turn(&id, Role::User, &content, Some(&generator))
                .await;
            if stats.was_summarized {
                summarized_turns.push(i);
            } else if summarized_turns.is_empty() {
                turns_before_crossing = stats.turns + stats.pending_turns;
            }
        }

        assert_eq!(
            summarized_turns.len(),
            1,
            "expected one crossing, got {summarized_turns:?}"
        );
        let (_, turns) = store.read(&id).await;
        assert_eq!(turns.len(), 6);
        assert!(turns.len() < turns_before_crossing);
    }

    #[tokio::test]
    async fn fallback_summary_without_generator() {
        let store = store(500, 2);
        let id = sid("a");
        for i in 0..8 {
            store
                .record_turn(&id, Role::User, &format!("turn {i} {}", "y".repeat(90)), None)
                .await;
        }
        let (summary, turns) = store.read(&id).await;
        assert!(!summary.is_empty());
        assert_eq!(turns.len(), 2);
        let footprint = summary.chars().count() + turns.iter().map(Turn::chars).sum::<usize>();
        assert!(footprint <= 500);
    }

    #[tokio::test]
    async fn oversized_single_turn_is_clamped() {
        let store = store(300, 4);
        let id = sid("a");
        let huge = "z".repeat(5000);
        store.record_turn(&id, Role::User, &huge, None).await;
        let (summary, turns) = store.read(&id).await;
        let footprint = summary.chars().count() + turns.iter().map(Turn::chars).sum::<usize>();
        assert!(footprint <= 300);
        assert_eq!(turns.len(), 1);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = store(10_000, 3);
        store.append(&sid("a"), Role::User, "alpha").await;
        store.append(&sid("b"), Role::User, "beta").await;

        let (_, turns_a) = store.read(&sid("a")).await;
        let (_, turns_b) = store.read(&sid("b")).await;
        assert_eq!(turns_a[0].content, "alpha");
        assert_eq!(turns_b[0].content, "beta");
    }

    #[tokio::test]
    async fn lru_cap_evicts_stalest() {
        let store = store(10_000, 3);
        for name in ["a", "b", "c", "d"] {
            store.append(&sid(name), Role::User, name).await;
            // Instant resolution can be coarse; force distinct ordering.
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        // Fifth session evicts the stalest ("a").
        store.append(&sid("e"), Role::User, "e").await;

        let sessions = store.sessions.read().await;
        assert_eq!(sessions.len(), 4);
        assert!(!sessions.contains_key("a"));
        assert!(sessions.contains_key("e"));
    }

    #[tokio::test]
    async fn last_symbol_roundtrip() {
        let store = store(10_000, 3);
        let id = sid("a");
        assert!(store.last_symbol(&id).await.is_none());
        store.set_last_symbol(&id, "ETH").await;
        assert_eq!(store.last_symbol(&id).await.as_deref(), Some("ETH"));
    }

    #[test]
    fn clean_summary_filters_noise() {
        let raw = "\
• goal: research SOL
• price was $152.30 today
• see https://example.com
• id 123456789 tracked
• prefers Italian answers";
        let cleaned = clean_summary(raw, 500);
        assert!(cleaned.contains("goal: research SOL"));
        assert!(cleaned.contains("prefers Italian"));
        assert!(!cleaned.contains('$'));
        assert!(!cleaned.contains("http"));
        assert!(!cleaned.contains("123456789"));
    }

    #[test]
    fn clean_summary_never_empty() {
        assert_eq!(clean_summary("$1 $2 $3", 100), "• (Summary trimmed.)");
    }
}
