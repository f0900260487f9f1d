//! `coinsage ask` — run one research query from the terminal.
//!
//! Progress (trace/tool/memory) goes to stderr so the answer on stdout
//! stays pipeable.

use anyhow::Context;
use coinsage_agent::{ResearchRequest, Selection, SELECTION_KIND_DEX_POOL};
use coinsage_config::AppConfig;
use coinsage_core::event::ResearchEvent;
use std::io::Write as _;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    query: String,
    session: Option<String>,
    stream: bool,
    select: Option<String>,
) -> anyhow::Result<()> {
    let config = AppConfig::load(config_path).context("loading configuration")?;
    let agent = super::build_agent(&config);

    let mut request = ResearchRequest::new(query);
    if let Some(session) = session {
        request = request.with_session(session);
    }
    if let Some(pool_id) = select {
        request = request.with_selection(Selection {
            kind: SELECTION_KIND_DEX_POOL.into(),
            id: pool_id,
        });
    }

    let mut rx = agent.run_stream(request).await;
    while let Some(event) = rx.recv().await {
        match event {
            ResearchEvent::Trace { phase, message } => eprintln!("[{phase}] {message}"),
            ResearchEvent::Tool { name, ok, ms, note } => {
                let status = if ok { "ok" } else { "failed" };
                match note {
                    Some(note) => eprintln!("[tool] {name}: {status} in {ms} ms — {note}"),
                    None => eprintln!("[tool] {name}: {status} in {ms} ms"),
                }
            }
            ResearchEvent::Memory { stats, .. } => {
                eprintln!(
                    "[memory] {} / {} chars, {} turns{}",
                    stats.approx_chars,
                    stats.max_chars,
                    stats.turns,
                    if stats.was_summarized {
                        " (summarized)"
                    } else {
                        ""
                    }
                );
            }
            ResearchEvent::AnswerDelta { delta } if stream => {
                print!("{delta}");
                std::io::stdout().flush().ok();
            }
            ResearchEvent::Final { report } => {
                if stream {
                    println!();
                } else {
                    println!("{}", report.answer);
                }
                if report.is_ambiguous && !report.candidates.is_empty() {
                    eprintln!("\nCandidate pools:");
                    for candidate in &report.candidates {
                        eprintln!(
                            "  {}  {}  liquidity ${:.0}",
                            candidate.id,
                            candidate.name.as_deref().unwrap_or("?"),
                            candidate.liquidity_usd.unwrap_or(0.0)
                        );
                    }
                    eprintln!("Re-run with --select <id> (same session) to research one of them.");
                }
                if let Some(error) = &report.error {
                    eprintln!("[error] {error}");
                }
            }
            _ => {}
        }
    }
    Ok(())
}
