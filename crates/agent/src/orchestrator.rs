//! The research orchestrator: one logical task per request.
//!
//! Drives plan → dispatch → assemble → generate → memory update,
//! emitting every intermediate step through the stream sequencer.
//! Retrieval failures degrade into failed observations; only a
//! generation failure is surfaced on the terminal report, together
//! with whatever partial answer was produced. An ambiguous plan
//! short-circuits straight to the terminal event with candidates.

use crate::context::ContextAssembler;
use crate::dispatcher::ToolDispatcher;
use crate::planner::{Planner, PlannerInput, Selection};
use crate::prompts;
use crate::sequencer::StreamSequencer;
use coinsage_config::AppConfig;
use coinsage_core::context::ResearchContext;
use coinsage_core::event::ResearchEvent;
use coinsage_core::generation::{ChatMessage, GenerationRequest, Generator};
use coinsage_core::observation::ObservationPayload;
use coinsage_core::plan::{Plan, PlanOutcome};
use coinsage_core::report::{Report, StepRecord};
use coinsage_core::session::{Role, SessionId};
use coinsage_memory::SessionStore;
use coinsage_tools::ResearchTools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// One research request, as accepted by both entry points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// A candidate pick from a prior disambiguation response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: None,
            selection: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }
}

#[derive(Clone)]
pub struct ResearchAgent {
    generator: Option<Arc<dyn Generator>>,
    tools: Arc<dyn ResearchTools>,
    store: Arc<SessionStore>,
    context_budget: usize,
    call_timeout_secs: u64,
    candidate_limit: usize,
    temperature: f32,
}

enum GenerationOutcome {
    Complete(String),
    Failed { partial: String, error: String },
    /// The consumer went away mid-stream.
    Cancelled { partial: String },
}

impl ResearchAgent {
    pub fn new(
        config: &AppConfig,
        generator: Option<Arc<dyn Generator>>,
        tools: Arc<dyn ResearchTools>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            generator,
            tools,
            store,
            context_budget: config.context.max_chars,
            call_timeout_secs: config.tools.call_timeout_secs,
            candidate_limit: config.tools.candidate_limit,
            temperature: config.generation.temperature,
        }
    }

    /// Run one request, streaming every lifecycle event. The stream
    /// always ends with exactly one `final` event; dropping the
    /// receiver cancels the pipeline.
    pub async fn run_stream(&self, request: ResearchRequest) -> mpsc::Receiver<ResearchEvent> {
        let (seq, rx) = StreamSequencer::channel(128);
        let agent = self.clone();
        let request_id = Uuid::new_v4();
        tokio::spawn(
            async move { agent.drive(request, seq).await }
                .instrument(info_span!("research", request_id = %request_id)),
        );
        rx
    }

    /// Blocking entry point: consumes the event stream and returns the
    /// terminal report.
    pub async fn run(&self, request: ResearchRequest) -> Report {
        let query = request.query.clone();
        let session_id = request.session_id.clone();
        let mut rx = self.run_stream(request).await;
        let mut report = None;
        while let Some(event) = rx.recv().await {
            if let ResearchEvent::Final { report: r } = event {
                report = Some(r);
            }
        }
        // The pipeline always terminates with a final event; this arm
        // exists so a lost task degrades to an error report, not a panic.
        report.unwrap_or_else(|| {
            let mut fallback = Report::from_plan(query, session_id, &Plan::general(None));
            fallback.error = Some("stream ended without a terminal event".into());
            fallback
        })
    }

    async fn drive(self, request: ResearchRequest, seq: StreamSequencer) {
        let session_id = request.session_id.clone().map(SessionId::new);
        seq.record(StepRecord::ok("received_query", 0));
        if !seq
            .trace("plan", "Planning the next actions (tools vs direct answer).")
            .await
        {
            return;
        }

        // Record the user turn first so planning sees it for coreference.
        let mut user_summarized = false;
        if let Some(sid) = &session_id {
            let stats = self
                .store
                .record_turn(sid, Role::User, &request.query, self.generator.as_deref())
                .await;
            user_summarized = stats.was_summarized;
        }

        let (summary, recent_turns, last_symbol) = match &session_id {
            Some(sid) => {
                let (summary, turns) = self.store.read(sid).await;
                let last = self.store.last_symbol(sid).await;
                (summary, turns, last)
            }
            None => (String::new(), Vec::new(), None),
        };

        let planner = Planner::new(
            self.generator.clone(),
            self.tools.clone(),
            self.candidate_limit,
        );
        let plan_started = seq.elapsed_ms();
        let plan = planner
            .plan(PlannerInput {
                query: &request.query,
                summary: &summary,
                recent_turns: &recent_turns,
                last_symbol: last_symbol.as_deref(),
                selection: request.selection.as_ref(),
            })
            .await;
        seq.record(StepRecord::ok(
            "plan_done",
            seq.elapsed_ms().saturating_sub(plan_started),
        ));
        info!(
            intent = ?plan.intent,
            ambiguous = plan.is_ambiguous(),
            symbol = plan.resolved_symbol().unwrap_or("-"),
            "Plan ready"
        );

        let mut report = Report::from_plan(&request.query, request.session_id.clone(), &plan);

        // Ambiguity short-circuits: no dispatch, no context, no deltas.
        if let PlanOutcome::Ambiguous { candidates } = &plan.outcome {
            if !seq
                .trace(
                    "plan",
                    format!(
                        "Asset reference is ambiguous — offering {} candidates.",
                        candidates.len()
                    ),
                )
                .await
            {
                return;
            }
            report.answer = prompts::ambiguous_answer(
                plan.language,
                plan.asset_query.as_deref(),
                candidates.len(),
            );
            self.finish_with_memory(report, &session_id, user_summarized, seq)
                .await;
            return;
        }

        // Dispatch. One observation per attempted call, failures included.
        let dispatcher = ToolDispatcher::new(self.tools.clone(), self.call_timeout_secs);
        let observations = match &plan.outcome {
            PlanOutcome::Resolved { symbol, coin_id } => {
                if !seq
                    .trace(
                        "tools",
                        format!("Fetching market data, token profile, and news for {symbol}."),
                    )
                    .await
                {
                    return;
                }
                dispatcher.dispatch(coin_id, symbol, &seq).await
            }
            PlanOutcome::SelectedPool { pool_id } => {
                if !seq
                    .trace("tools", format!("Fetching selected pool {pool_id}."))
                    .await
                {
                    return;
                }
                dispatcher.dispatch_pool(pool_id, &seq).await
            }
            _ => Vec::new(),
        };

        // On the pool path the symbol comes from the pool itself.
        let mut symbol_override = None;
        if matches!(plan.outcome, PlanOutcome::SelectedPool { .. })
            && let Some(ObservationPayload::DexPool(pool)) =
                observations.first().and_then(|o| o.payload.as_ref())
        {
            let symbol = pool.base_symbol.as_deref().unwrap_or("DEX").to_uppercase();
            report.symbol = symbol.clone();
            symbol_override = Some(symbol);
        }
        report.observations = observations.clone();

        // Assemble the bounded context and expose it before generation.
        let assembler = ContextAssembler::new(self.context_budget);
        let (context, meta) = assembler.assemble(
            &plan,
            symbol_override.as_deref(),
            &observations,
            &summary,
            &recent_turns,
        );
        if !seq
            .emit(ResearchEvent::Context {
                context: context.clone(),
                meta,
            })
            .await
        {
            return;
        }

        // Generation.
        let synthesis_started = seq.elapsed_ms();
        let outcome = self.generate(&plan, &context, &request.query, &seq).await;
        let synthesis_ms = seq.elapsed_ms().saturating_sub(synthesis_started);
        match outcome {
            GenerationOutcome::Complete(answer) => {
                seq.record(StepRecord::ok("llm_synthesis", synthesis_ms));
                report.answer = compact_markdown(&answer);
            }
            GenerationOutcome::Failed { partial, error } => {
                warn!(error = %error, "Generation failed; returning partial answer");
                seq.record(StepRecord::failed("llm_synthesis", error.clone(), synthesis_ms));
                report.answer = compact_markdown(&partial);
                report.error = Some(error);
            }
            GenerationOutcome::Cancelled { partial } => {
                seq.record(StepRecord::failed(
                    "llm_synthesis",
                    "consumer disconnected",
                    synthesis_ms,
                ));
                report.answer = compact_markdown(&partial);
                report.error = Some("cancelled by client".into());
                // Consumer is gone: skip the memory write for a turn
                // that was never delivered, emit the terminal event
                // best-effort, and unwind.
                seq.finish(report).await;
                return;
            }
        }

        self.finish_with_memory(report, &session_id, user_summarized, seq)
            .await;
    }

    /// Record the assistant turn, emit the single post-turn `memory`
    /// event, then the terminal `final`.
    async fn finish_with_memory(
        &self,
        mut report: Report,
        session_id: &Option<SessionId>,
        user_summarized: bool,
        seq: StreamSequencer,
    ) {
        if let Some(sid) = session_id {
            let mut stats = self
                .store
                .record_turn(sid, Role::Assistant, &report.answer, self.generator.as_deref())
                .await;
            stats.was_summarized |= user_summarized;
            if report.is_crypto && report.symbol != "GENERAL" && report.symbol != "N/A" {
                self.store.set_last_symbol(sid, &report.symbol).await;
            }
            report.memory = Some(stats.clone());
            let _ = seq
                .emit(ResearchEvent::Memory {
                    session_id: Some(sid.to_string()),
                    stats,
                })
                .await;
        }
        seq.finish(report).await;
    }

    async fn generate(
        &self,
        plan: &Plan,
        context: &ResearchContext,
        query: &str,
        seq: &StreamSequencer,
    ) -> GenerationOutcome {
        let Some(generator) = &self.generator else {
            return GenerationOutcome::Failed {
                partial: String::new(),
                error: "generation backend not configured".into(),
            };
        };

        if !seq
            .trace("synthesis", "Writing the final answer from tool observations.")
            .await
        {
            return GenerationOutcome::Cancelled {
                partial: String::new(),
            };
        }

        let request = build_generation_request(plan, context, query, self.temperature);
        let mut rx = match generator.stream(request).await {
            Ok(rx) => rx,
            Err(e) => {
                return GenerationOutcome::Failed {
                    partial: String::new(),
                    error: e.to_string(),
                };
            }
        };

        let mut answer = String::new();
        while let Some(delta) = rx.recv().await {
            match delta {
                Ok(text) => {
                    answer.push_str(&text);
                    if !seq
                        .emit(ResearchEvent::AnswerDelta { delta: text })
                        .await
                    {
                        return GenerationOutcome::Cancelled { partial: answer };
                    }
                }
                Err(e) => {
                    return GenerationOutcome::Failed {
                        partial: answer,
                        error: e.to_string(),
                    };
                }
            }
        }
        GenerationOutcome::Complete(answer)
    }
}

/// Build the synthesis request. Crypto plans get the serialized context
/// plus formatting rules; general plans get the conversation replayed.
fn build_generation_request(
    plan: &Plan,
    context: &ResearchContext,
    query: &str,
    temperature: f32,
) -> GenerationRequest {
    let messages = if matches!(
        plan.outcome,
        PlanOutcome::Resolved { .. } | PlanOutcome::SelectedPool { .. }
    ) {
        let context_json = serde_json::to_string(context).unwrap_or_default();
        vec![
            ChatMessage::system(prompts::CRYPTO_SYSTEM),
            ChatMessage::system(prompts::language_instruction(plan.language)),
            ChatMessage::user(format!(
                "{query}\n\nContext (JSON): {context_json}\n\n{}",
                prompts::ANSWER_RULES
            )),
        ]
    } else {
        let mut messages = vec![ChatMessage::system(prompts::GENERAL_SYSTEM)];
        if plan.language.is_some() {
            messages.push(ChatMessage::system(prompts::language_instruction(
                plan.language,
            )));
        }
        let turns = &context.memory.recent_turns;
        for (i, turn) in turns.iter().enumerate() {
            // The current query was already appended to memory; skip it
            // here so it appears once, as the closing user message.
            if i + 1 == turns.len() && turn.role == Role::User && turn.content == query {
                continue;
            }
            messages.push(match turn.role {
                Role::User => ChatMessage::user(&turn.content),
                Role::Assistant => ChatMessage::assistant(&turn.content),
            });
        }
        messages.push(ChatMessage::user(query));
        messages
    };
    GenerationRequest::new(messages).with_temperature(temperature)
}

/// Collapse extreme blank spacing in generated markdown.
fn compact_markdown(text: &str) -> String {
    let mut text = text.replace("\r\n", "\n");
    while text.contains("\n\n\n") {
        text = text.replace("\n\n\n", "\n\n");
    }
    text.trim().to_string()
}
