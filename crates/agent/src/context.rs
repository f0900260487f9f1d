//! Context assembly: merge plan, observations, and memory under a
//! hard size budget.
//!
//! Pure function of its inputs — no I/O, no clock. When the serialized
//! footprint exceeds the budget, reductions apply in a fixed order:
//! news text first, then the price series, then the oldest retained
//! turns, and the summary tail only as a last resort. Plan metadata and
//! the resolved symbol are never dropped.

use coinsage_core::context::{ContextMeta, MemoryWindow, ResearchContext};
use coinsage_core::observation::{Observation, ObservationPayload};
use coinsage_core::plan::Plan;
use coinsage_core::session::Turn;
use tracing::debug;

/// Most news items kept under size pressure.
const NEWS_CAP: usize = 3;
/// Headline length under size pressure.
const HEADLINE_CAP: usize = 160;
/// Price points kept after thinning.
const SERIES_FLOOR: usize = 12;
/// Recent turns that survive every reduction.
const TURNS_FLOOR: usize = 2;

pub struct ContextAssembler {
    budget: usize,
}

impl ContextAssembler {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    /// Build the bounded context. `symbol` overrides the plan's resolved
    /// symbol on the DEX-pool path, where resolution came from the pool.
    pub fn assemble(
        &self,
        plan: &Plan,
        symbol: Option<&str>,
        observations: &[Observation],
        summary: &str,
        recent_turns: &[Turn],
    ) -> (ResearchContext, ContextMeta) {
        let mut ctx = ResearchContext {
            intent: plan.intent,
            language: plan.language,
            symbol: symbol
                .map(String::from)
                .or_else(|| plan.resolved_symbol().map(String::from)),
            asset_query: plan.asset_query.clone(),
            observations: observations.to_vec(),
            memory: MemoryWindow {
                summary: summary.to_string(),
                recent_turns: recent_turns.to_vec(),
            },
        };
        let mut drops: Vec<String> = Vec::new();

        if ctx.chars() > self.budget
            && let Some(drop) = cap_news(&mut ctx)
        {
            drops.push(drop);
        }

        if ctx.chars() > self.budget
            && let Some(drop) = thin_price_series(&mut ctx)
        {
            drops.push(drop);
        }

        if ctx.chars() > self.budget {
            let before = ctx.memory.recent_turns.len();
            while ctx.chars() > self.budget && ctx.memory.recent_turns.len() > TURNS_FLOOR {
                ctx.memory.recent_turns.remove(0);
            }
            if ctx.memory.recent_turns.len() < before {
                drops.push(format!(
                    "turns: {before} -> {}",
                    ctx.memory.recent_turns.len()
                ));
            }
        }

        // Last resort: shave the summary tail, then remaining turn text.
        if ctx.chars() > self.budget && !ctx.memory.summary.is_empty() {
            let before = ctx.memory.summary.chars().count();
            while ctx.chars() > self.budget && ctx.memory.summary.chars().count() > 80 {
                let keep = ctx.memory.summary.chars().count() / 2;
                ctx.memory.summary = truncate_chars(&ctx.memory.summary, keep);
            }
            let after = ctx.memory.summary.chars().count();
            if after < before {
                drops.push(format!("summary_chars: {before} -> {after}"));
            }
        }

        if ctx.chars() > self.budget {
            let mut cap = (self.budget / 8).max(200);
            let mut trimmed = false;
            loop {
                for turn in &mut ctx.memory.recent_turns {
                    if turn.content.chars().count() > cap {
                        turn.content = truncate_chars(&turn.content, cap);
                        trimmed = true;
                    }
                }
                if ctx.chars() <= self.budget || cap <= 50 {
                    break;
                }
                cap /= 2;
            }
            if trimmed {
                drops.push(format!("turn_chars: capped at {cap}"));
            }
        }

        let chars = ctx.chars();
        if !drops.is_empty() {
            debug!(chars, budget = self.budget, drops = ?drops, "Context truncated to fit budget");
        }
        let meta = ContextMeta {
            chars,
            budget: self.budget,
            truncated: !drops.is_empty(),
            drops,
        };
        (ctx, meta)
    }
}

fn cap_news(ctx: &mut ResearchContext) -> Option<String> {
    let mut before = 0usize;
    let mut after = 0usize;
    for obs in &mut ctx.observations {
        if let Some(ObservationPayload::News(digest)) = &mut obs.payload {
            before += digest.items.len();
            digest.items.truncate(NEWS_CAP);
            for item in &mut digest.items {
                item.title = truncate_chars(&item.title, HEADLINE_CAP);
            }
            after += digest.items.len();
        }
    }
    (after < before).then(|| format!("news_items: {before} -> {after}"))
}

fn thin_price_series(ctx: &mut ResearchContext) -> Option<String> {
    let mut before = 0usize;
    let mut after = 0usize;
    for obs in &mut ctx.observations {
        if let Some(ObservationPayload::Technicals(snap)) = &mut obs.payload {
            before += snap.price_series.len();
            while snap.price_series.len() > SERIES_FLOOR {
                let mut keep = false;
                snap.price_series.retain(|_| {
                    keep = !keep;
                    keep
                });
            }
            after += snap.price_series.len();
        }
    }
    (after < before).then(|| format!("price_points: {before} -> {after}"))
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect::<String>().trim_end().to_string()
}
