//! HTTP transport for the chat agent
//!
//! Routes:
//! - `POST /chat` - run one turn, streamed back as server-sent events
//! - `DELETE /sessions/:id` - forget a conversation
//! - `GET /metrics` - Prometheus text exposition
//! - `GET /health` - liveness probe

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Json, Router,
};
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info};

use crate::agent::AgentController;
use crate::metrics;

/// Server application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<AgentController>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),
    #[error("failed to encode metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Body of `POST /chat`
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/sessions/:id", delete(clear_session))
        .route("/metrics", get(export_metrics))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Run one chat turn and stream its events
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let session_id = request.session_id.trim();
    if session_id.is_empty() {
        return Err(ServerError::BadRequest("session_id must not be empty".into()));
    }
    debug!(session_id, chars = request.message.len(), "Chat request");

    // Dropping this stream (client disconnect) closes the channel and
    // cancels the turn.
    let events = state.controller.start_turn(session_id, request.message);
    let stream = ReceiverStream::new(events)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Forget a session's history
async fn clear_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    let existed = state.controller.sessions().clear(&id);
    debug!(session_id = %id, existed, "Session cleared");
    StatusCode::NO_CONTENT
}

/// Prometheus metrics endpoint
async fn export_metrics() -> Result<impl IntoResponse, ServerError> {
    let body = metrics::encode_metrics()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
