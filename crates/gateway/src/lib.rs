//! HTTP gateway for coinsage.
//!
//! Exposes the blocking and streaming research endpoints plus a
//! liveness probe, behind the shared-secret gate. Built on Axum with
//! SSE for the event stream.
//!
//! Routes:
//! - `GET  /health`             — liveness, no auth
//! - `POST /v1/research`        — blocking, returns one Report
//! - `POST /v1/research/stream` — SSE stream of research events

pub mod api;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use coinsage_agent::ResearchAgent;
use coinsage_config::AppConfig;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Request body cap; research queries are short.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Header carrying the shared secret.
pub const AUTH_HEADER: &str = "x-auth-token";

pub struct GatewayState {
    pub agent: ResearchAgent,
    /// When set, every /v1 request must present it; when absent the
    /// gate is disabled (local development).
    pub shared_secret: Option<String>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router with middleware.
pub fn build_router(state: SharedState) -> Router {
    let v1 = api::v1_router(state.clone()).layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", v1)
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &AppConfig, agent: ResearchAgent) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState {
        agent,
        shared_secret: config.gateway.shared_secret.clone(),
    });
    if state.shared_secret.is_none() {
        warn!("No shared secret configured — /v1 routes are open");
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, build_router(state)).await
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Shared-secret gate for the /v1 API.
///
/// Rejection happens here, before any planning or dispatch work.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    let Some(secret) = &state.shared_secret else {
        return Ok(next.run(req).await);
    };

    let presented = req
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(token) if token == secret => Ok(next.run(req).await),
        _ => {
            warn!("Rejected /v1 request — missing or invalid shared secret");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
