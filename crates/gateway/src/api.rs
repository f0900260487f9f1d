//! The /v1 research endpoints.

use crate::SharedState;
use axum::extract::State;
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use coinsage_agent::ResearchRequest;
use coinsage_core::report::Report;
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::info;

pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/research", post(research_handler))
        .route("/research/stream", post(research_stream_handler))
        .with_state(state)
}

/// `POST /v1/research` — run one request to completion, return the report.
async fn research_handler(
    State(state): State<SharedState>,
    Json(request): Json<ResearchRequest>,
) -> Json<Report> {
    info!(session = request.session_id.as_deref().unwrap_or("-"), "v1/research");
    Json(state.agent.run(request).await)
}

/// `POST /v1/research/stream` — the same request as an ordered SSE
/// stream of named events; the stream ends after `final`.
async fn research_stream_handler(
    State(state): State<SharedState>,
    Json(request): Json<ResearchRequest>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    info!(
        session = request.session_id.as_deref().unwrap_or("-"),
        "v1/research/stream"
    );
    let rx = state.agent.run_stream(request).await;
    let stream = ReceiverStream::new(rx).map(|event| {
        let name = event.event_type();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(name).data(data))
    });
    Sse::new(stream)
}
