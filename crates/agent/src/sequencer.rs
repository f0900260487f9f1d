//! The stream sequencer: single writer for one request's event stream.
//!
//! One sequencer exists per request. Every stage of the pipeline emits
//! through it, so event ordering is owned in one place rather than
//! spread across shared state. `emit` returns `false` once the consumer
//! has gone away; callers treat that as the cancellation signal and
//! unwind, dropping in-flight work.
//!
//! `finish` consumes the sequencer, so emitting a second terminal event
//! is a compile error, not a runtime bug.

use coinsage_core::event::ResearchEvent;
use coinsage_core::observation::Observation;
use coinsage_core::report::{Report, StepRecord};
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::mpsc;

pub struct StreamSequencer {
    tx: mpsc::Sender<ResearchEvent>,
    /// Step trace folded into the final report. Behind a mutex because
    /// concurrent tool calls record completion steps.
    steps: Mutex<Vec<StepRecord>>,
    started: Instant,
}

impl StreamSequencer {
    /// Create a sequencer and the receiving end of its event stream.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ResearchEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                tx,
                steps: Mutex::new(Vec::new()),
                started: Instant::now(),
            },
            rx,
        )
    }

    /// Milliseconds since the request started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Send one event. Returns `false` when the consumer disconnected.
    pub async fn emit(&self, event: ResearchEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    pub async fn trace(&self, phase: &str, message: impl Into<String>) -> bool {
        self.emit(ResearchEvent::Trace {
            phase: phase.into(),
            message: message.into(),
        })
        .await
    }

    /// Record a tool call completion: one step plus the `tool` event.
    pub async fn tool(&self, name: &str, ok: bool, ms: u64, note: Option<String>) -> bool {
        self.record(match &note {
            Some(n) => StepRecord::failed(name, n.clone(), ms),
            None => StepRecord::ok(name, ms),
        });
        self.emit(ResearchEvent::Tool {
            name: name.into(),
            ok,
            ms,
            note,
        })
        .await
    }

    pub async fn observation(&self, observation: Observation) -> bool {
        self.emit(ResearchEvent::Observation { observation }).await
    }

    /// Record a step without emitting an event.
    pub fn record(&self, step: StepRecord) {
        self.steps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(step);
    }

    /// Emit the single terminal event. Consumes the sequencer; the send
    /// is best-effort — a disconnected consumer cannot observe it anyway.
    pub async fn finish(self, mut report: Report) -> Report {
        let total_ms = self.elapsed_ms();
        let mut steps = self.steps.into_inner().unwrap_or_else(|e| e.into_inner());
        steps.push(StepRecord::ok("done", total_ms));
        report.steps = steps;
        let _ = self
            .tx
            .send(ResearchEvent::Final {
                report: report.clone(),
            })
            .await;
        report
    }
}
