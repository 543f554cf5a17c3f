//! HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/chat` | Answer a question from the archive |
//! | `GET`  | `/api/stats` | Index size, dimension, and name |
//! | `POST` | `/api/messages` | Enqueue a chat message for indexing |
//! | `GET`  | `/api/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every error response has the shape `{ "error": "<message>" }`. Upstream
//! failure details are logged, never returned: clients see a fixed
//! message for 500 and 504 responses.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser frontends
//! can call the API directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use chat_recall_core::ingest::MessageEvent;
use chat_recall_core::models::Answer;
use chat_recall_core::query::QueryPipeline;
use chat_recall_core::store::VectorStore;
use chat_recall_core::RecallError;

use crate::app::Services;
use crate::config::Config;
use crate::ingest::{self, IngestQueue, Submission};

const GENERIC_QUERY_ERROR: &str = "An error occurred processing your request. Please try again.";

/// Shared state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub query: Arc<QueryPipeline>,
    pub store: Arc<dyn VectorStore>,
    pub ingest: IngestQueue,
    pub index_name: String,
    /// Upper bound on one `/api/chat` round trip.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(services: &Services, ingest: IngestQueue, request_timeout: Duration) -> Self {
        Self {
            query: services.query.clone(),
            store: services.store.clone(),
            ingest,
            index_name: services.index_name.clone(),
            request_timeout,
        }
    }
}

/// Build the router. Exposed so tests can serve it on an ephemeral port.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(handle_chat))
        .route("/api/stats", get(handle_stats))
        .route("/api/messages", post(handle_message))
        .route("/api/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server and the ingestion worker.
///
/// Runs until Ctrl-C, then stops accepting requests and drains the
/// ingestion queue before returning.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let services = Services::from_config(config).await?;
    let (queue, worker) = ingest::spawn(
        services.ingest.clone(),
        config.ingest.queue_capacity,
        config.ingest.concurrency,
    );
    let state = AppState::new(
        &services,
        queue,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, index = %services.index_name, "server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    let summary = worker.finish().await?;
    tracing::info!(stored = summary.stored, failed = summary.failed, "server stopped");
    Ok(())
}

// ============ Error response ============

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(&'static str),
    #[error("request timed out")]
    Timeout,
    #[error("service unavailable")]
    Unavailable,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

// ============ POST /api/chat ============

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Handler for `POST /api/chat`.
///
/// Returns `400` for a missing or blank message, `504` when the pipeline
/// exceeds the request timeout, and `500` for any pipeline failure.
async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::BadRequest("No message provided".into()))?;
    let message = req
        .message
        .ok_or_else(|| ApiError::BadRequest("No message provided".into()))?;
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("Empty message".into()));
    }

    tracing::info!(query = %message, "received query");

    match tokio::time::timeout(state.request_timeout, state.query.answer(&message)).await {
        Ok(Ok(answer)) => Ok(Json(answer)),
        Ok(Err(RecallError::Validation(msg))) => Err(ApiError::BadRequest(msg)),
        Ok(Err(e)) => {
            tracing::error!(kind = e.kind(), error = %e, "query failed");
            Err(ApiError::Internal(GENERIC_QUERY_ERROR))
        }
        Err(_) => {
            tracing::error!(timeout = ?state.request_timeout, "query timed out");
            Err(ApiError::Timeout)
        }
    }
}

// ============ GET /api/stats ============

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_vectors: u64,
    pub dimension: usize,
    pub index_name: String,
}

async fn handle_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.store.describe().await.map_err(|e| {
        tracing::error!(error = %e, "describe failed");
        ApiError::Internal("Could not fetch statistics")
    })?;
    Ok(Json(StatsResponse {
        total_vectors: stats.total_count,
        dimension: stats.dimension,
        index_name: state.index_name.clone(),
    }))
}

// ============ POST /api/messages ============

/// Handler for `POST /api/messages`.
///
/// Fire-and-forget: validated messages are queued and acknowledged with
/// `202`; bot or blank messages are acknowledged with `200` and a reason.
async fn handle_message(
    State(state): State<AppState>,
    payload: Result<Json<MessageEvent>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(event) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    match state.ingest.submit(event).await {
        Ok(Submission::Queued) => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "queued" })),
        )
            .into_response()),
        Ok(Submission::Skipped(reason)) => Ok(Json(serde_json::json!({
            "status": "skipped",
            "reason": reason,
        }))
        .into_response()),
        Err(e) => {
            tracing::error!(error = %e, "could not enqueue message");
            Err(ApiError::Unavailable)
        }
    }
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "Chat Recall API is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}
