//! Intent planning: classify the query, extract and resolve the asset.
//!
//! Classification is LLM-first (strict-JSON output, low temperature)
//! with deterministic cleanup of whatever comes back; anything the
//! backend gets wrong degrades to a general-conversation plan rather
//! than an error. Resolution goes through the market search tool; zero
//! or failed matches produce an ambiguous plan with DEX candidates
//! instead of a guess — wrong silent resolution is worse than asking.

use crate::prompts;
use coinsage_core::generation::{ChatMessage, GenerationRequest, Generator};
use coinsage_core::plan::{Intent, Language, Plan, PlanOutcome};
use coinsage_core::session::Turn;
use coinsage_tools::ResearchTools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Selection kind accepted from a prior disambiguation response.
pub const SELECTION_KIND_DEX_POOL: &str = "dex_pool";

/// A caller's pick from a previously offered candidate list. Bypasses
/// re-search: the planner treats the referenced pool as resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub kind: String,
    pub id: String,
}

impl Selection {
    fn dex_pool_id(&self) -> Option<&str> {
        let id = self.id.trim();
        (self.kind == SELECTION_KIND_DEX_POOL && !id.is_empty()).then_some(id)
    }
}

/// Everything the planner looks at for one query.
pub struct PlannerInput<'a> {
    pub query: &'a str,
    pub summary: &'a str,
    pub recent_turns: &'a [Turn],
    /// Most recently researched ticker, for coreference.
    pub last_symbol: Option<&'a str>,
    pub selection: Option<&'a Selection>,
}

pub struct Planner {
    generator: Option<Arc<dyn Generator>>,
    tools: Arc<dyn ResearchTools>,
    candidate_limit: usize,
}

impl Planner {
    pub fn new(
        generator: Option<Arc<dyn Generator>>,
        tools: Arc<dyn ResearchTools>,
        candidate_limit: usize,
    ) -> Self {
        Self {
            generator,
            tools,
            candidate_limit,
        }
    }

    /// Produce a typed plan for one query. Never fails: classification
    /// problems degrade to `General`, resolution problems to `Ambiguous`.
    pub async fn plan(&self, input: PlannerInput<'_>) -> Plan {
        let (intent, asset_query, language) = self.classify(&input).await;

        // A pool selection overrides search entirely; classification
        // still ran so the answer language is known.
        if let Some(pool_id) = input.selection.and_then(Selection::dex_pool_id) {
            return Plan {
                intent: Intent::Crypto,
                language,
                asset_query,
                outcome: PlanOutcome::SelectedPool {
                    pool_id: pool_id.to_string(),
                },
            };
        }

        if intent == Intent::General {
            return Plan::general(language);
        }

        let Some(query) = asset_query else {
            debug!("Crypto intent without an extractable asset query");
            return Plan {
                intent: Intent::Crypto,
                language,
                asset_query: None,
                outcome: PlanOutcome::Ambiguous {
                    candidates: Vec::new(),
                },
            };
        };

        match self.tools.resolve_asset(&query).await {
            Ok(matched) => Plan {
                intent: Intent::Crypto,
                language,
                outcome: PlanOutcome::Resolved {
                    symbol: matched
                        .symbol
                        .as_deref()
                        .unwrap_or("N/A")
                        .to_uppercase(),
                    coin_id: matched.coin_id,
                },
                asset_query: Some(query),
            },
            Err(e) => {
                debug!(query = %query, error = %e, "Asset resolution failed, searching DEX pools");
                let candidates = self
                    .tools
                    .search_pools(&query, self.candidate_limit)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "DEX pool search failed");
                        Vec::new()
                    });
                Plan {
                    intent: Intent::Crypto,
                    language,
                    asset_query: Some(query),
                    outcome: PlanOutcome::Ambiguous { candidates },
                }
            }
        }
    }

    /// LLM classification of intent, asset query, and language. Degrades
    /// to `(General, None, None)` whenever the backend is missing,
    /// errors, or returns junk.
    async fn classify(&self, input: &PlannerInput<'_>) -> (Intent, Option<String>, Option<Language>) {
        let Some(generator) = &self.generator else {
            return (Intent::General, None, None);
        };

        let request = GenerationRequest::new(vec![
            ChatMessage::system("You output strict JSON. No prose."),
            ChatMessage::user(prompts::planner_prompt(
                input.query,
                input.summary,
                input.recent_turns,
                input.last_symbol,
            )),
        ])
        .with_temperature(0.1);

        let raw = match generator.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Planner classification failed, treating as general");
                return (Intent::General, None, None);
            }
        };

        let Some(parsed) = parse_plan_json(&raw) else {
            warn!("Planner returned non-JSON output, treating as general");
            return (Intent::General, None, None);
        };

        let intent = match parsed.intent.as_deref() {
            Some("crypto") => Intent::Crypto,
            _ => Intent::General,
        };
        let asset_query = parsed.asset_query.as_deref().and_then(normalize_asset_query);
        let language = match parsed.language.as_deref().map(str::trim) {
            Some("it") | Some("IT") => Some(Language::It),
            Some("en") | Some("EN") => Some(Language::En),
            _ => None,
        };
        (intent, asset_query, language)
    }
}

#[derive(Deserialize)]
struct RawPlan {
    intent: Option<String>,
    asset_query: Option<String>,
    language: Option<String>,
}

/// Extract the JSON object from possibly fenced/prose-wrapped output.
fn parse_plan_json(text: &str) -> Option<RawPlan> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    serde_json::from_str(text.get(start..=end)?).ok()
}

/// Deterministic cleanup of the extracted asset query: strip generic
/// words the backend tends to include, collapse whitespace, cap length.
fn normalize_asset_query(raw: &str) -> Option<String> {
    let capped: String = raw.trim().chars().take(60).collect();
    let mut lowered = capped.to_lowercase();
    for word in [" coin", " token", " crypto", " cryptocurrency"] {
        lowered = lowered.replace(word, "");
    }
    let cleaned = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubGenerator, StubTools};

    fn input(query: &str) -> PlannerInput<'_> {
        PlannerInput {
            query,
            summary: "",
            recent_turns: &[],
            last_symbol: None,
            selection: None,
        }
    }

    #[test]
    fn normalize_strips_generic_words() {
        assert_eq!(
            normalize_asset_query("Ethereum coin").as_deref(),
            Some("ethereum")
        );
        assert_eq!(
            normalize_asset_query("  PEPE   token ").as_deref(),
            Some("pepe")
        );
        assert_eq!(normalize_asset_query(" crypto "), Some("crypto".into()));
        assert_eq!(normalize_asset_query("   "), None);
    }

    #[test]
    fn normalize_caps_length() {
        let long = "x".repeat(200);
        assert_eq!(normalize_asset_query(&long).unwrap().len(), 60);
    }

    #[test]
    fn parse_handles_fenced_json() {
        let raw = "```json\n{\"intent\": \"crypto\", \"asset_query\": \"eth\", \"language\": \"en\"}\n```";
        let parsed = parse_plan_json(raw).unwrap();
        assert_eq!(parsed.intent.as_deref(), Some("crypto"));
        assert!(parse_plan_json("no json here").is_none());
    }

    #[tokio::test]
    async fn resolvable_symbol_yields_resolved_plan() {
        let planner = Planner::new(
            Some(Arc::new(StubGenerator::crypto_plan("eth", "en"))),
            Arc::new(StubTools::default()),
            8,
        );
        let plan = planner.plan(input("Should I buy ETH?")).await;
        assert_eq!(plan.intent, Intent::Crypto);
        assert_eq!(plan.resolved_symbol(), Some("ETH"));
        assert_eq!(plan.language, Some(Language::En));
        assert!(!plan.is_ambiguous());
    }

    #[tokio::test]
    async fn unresolved_asset_yields_candidates_not_a_guess() {
        let tools = StubTools::default().with_unresolvable(3);
        let planner = Planner::new(
            Some(Arc::new(StubGenerator::crypto_plan("moonpup", "en"))),
            Arc::new(tools),
            8,
        );
        let plan = planner.plan(input("what about moonpup?")).await;
        assert!(plan.is_ambiguous());
        assert_eq!(plan.candidates().len(), 3);
    }

    #[tokio::test]
    async fn missing_backend_degrades_to_general() {
        let planner = Planner::new(None, Arc::new(StubTools::default()), 8);
        let plan = planner.plan(input("Should I buy ETH?")).await;
        assert_eq!(plan.intent, Intent::General);
        assert!(plan.resolved_symbol().is_none());
    }

    #[tokio::test]
    async fn junk_classification_degrades_to_general() {
        let planner = Planner::new(
            Some(Arc::new(StubGenerator::with_plan_json("the weather is nice"))),
            Arc::new(StubTools::default()),
            8,
        );
        let plan = planner.plan(input("hello there")).await;
        assert_eq!(plan.intent, Intent::General);
    }

    #[tokio::test]
    async fn selection_bypasses_search() {
        let tools = Arc::new(StubTools::default());
        let planner = Planner::new(
            Some(Arc::new(StubGenerator::crypto_plan("moonpup", "it"))),
            tools.clone(),
            8,
        );
        let selection = Selection {
            kind: SELECTION_KIND_DEX_POOL.into(),
            id: "solana_0xabc".into(),
        };
        let plan = planner
            .plan(PlannerInput {
                selection: Some(&selection),
                ..input("analizza questo")
            })
            .await;
        match plan.outcome {
            PlanOutcome::SelectedPool { pool_id } => assert_eq!(pool_id, "solana_0xabc"),
            other => panic!("expected selected pool, got {other:?}"),
        }
        assert_eq!(plan.language, Some(Language::It));
        // Neither resolve nor search ran.
        assert!(tools.calls().iter().all(|c| !c.starts_with("resolve")));
        assert!(tools.calls().iter().all(|c| !c.starts_with("search")));
    }

    #[tokio::test]
    async fn unknown_selection_kind_is_ignored() {
        let planner = Planner::new(
            Some(Arc::new(StubGenerator::crypto_plan("eth", "en"))),
            Arc::new(StubTools::default()),
            8,
        );
        let selection = Selection {
            kind: "bookmark".into(),
            id: "x".into(),
        };
        let plan = planner
            .plan(PlannerInput {
                selection: Some(&selection),
                ..input("Should I buy ETH?")
            })
            .await;
        assert_eq!(plan.resolved_symbol(), Some("ETH"));
    }

    #[tokio::test]
    async fn crypto_intent_without_query_is_ambiguous_with_no_candidates() {
        let planner = Planner::new(
            Some(Arc::new(StubGenerator::with_plan_json(
                r#"{"intent": "crypto", "asset_query": null, "language": "en"}"#,
            ))),
            Arc::new(StubTools::default()),
            8,
        );
        let plan = planner.plan(input("is this coin any good?")).await;
        assert!(plan.is_ambiguous());
        assert!(plan.candidates().is_empty());
    }
}
