//! HTTP and SSE transport.
//!
//! Routes:
//! - `POST /mcp?userId=<id>`: JSON-RPC over plain HTTP. Requests get a
//!   JSON response; notifications get `202 Accepted` with no body.
//! - `GET /sse`: long-lived Server-Sent-Events channel. The first event
//!   (`endpoint`) tells the client where to POST; responses arrive as
//!   `message` events. Sessions are keyed by id, so concurrent
//!   subscribers each keep their own channel.
//! - `POST /messages?sessionId=<id>&userId=<id>`: dispatches a payload
//!   and pushes the response over that session's SSE channel.
//! - `GET /health`: liveness snapshot.

use crate::health::HealthReport;
use crate::server::{McpServer, McpServerError, McpServerResult};
use crate::types::McpResponse;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

/// Keyed collection of live SSE subscriber channels.
#[derive(Clone, Default)]
pub struct SseSessions {
    inner: Arc<RwLock<HashMap<Uuid, mpsc::Sender<McpResponse>>>>,
}

impl SseSessions {
    /// Create an empty session collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber channel under a fresh session id.
    pub async fn insert(&self, session_id: Uuid, sender: mpsc::Sender<McpResponse>) {
        self.inner.write().await.insert(session_id, sender);
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Deliver a response to a session.
    ///
    /// Returns false when the session is unknown or its subscriber went
    /// away; gone sessions are pruned.
    pub async fn push(&self, session_id: &Uuid, response: McpResponse) -> bool {
        let sender = { self.inner.read().await.get(session_id).cloned() };
        let Some(sender) = sender else {
            return false;
        };
        if sender.send(response).await.is_err() {
            self.inner.write().await.remove(session_id);
            return false;
        }
        true
    }
}

/// Shared state for the HTTP handlers.
struct AppState {
    /// Request dispatcher.
    server: Arc<McpServer>,

    /// Live SSE subscribers.
    sessions: SseSessions,
}

#[derive(Debug, Deserialize)]
struct McpQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    #[serde(rename = "sessionId")]
    session_id: Uuid,

    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// Build the transport router around a server.
pub fn router(server: Arc<McpServer>) -> Router {
    let state = Arc::new(AppState {
        server,
        sessions: SseSessions::new(),
    });

    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/sse", get(handle_sse))
        .route("/messages", post(handle_messages))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, server: Arc<McpServer>) -> McpServerResult<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|_| McpServerError::Transport(format!("invalid bind address {bind}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| McpServerError::Transport(format!("bind failed: {e}")))?;

    info!(%addr, tools = server.tool_count(), "valet mcp server listening");

    axum::serve(listener, router(server))
        .await
        .map_err(|e| McpServerError::Transport(format!("server failed: {e}")))
}

async fn handle_mcp(
    State(state): State<Arc<AppState>>,
    Query(query): Query<McpQuery>,
    body: Bytes,
) -> Response {
    match state
        .server
        .handle_payload(&body, query.user_id.as_deref())
        .await
    {
        Some(response) => Json(response).into_response(),
        // Notification: accepted, no content.
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn handle_sse(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel::<McpResponse>(16);
    state.sessions.insert(session_id, tx).await;
    info!(%session_id, "sse subscriber connected");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={session_id}"));

    let responses = ReceiverStream::new(rx).map(|response| {
        let payload = serde_json::to_string(&response).unwrap_or_else(|_| {
            "{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32603,\
             \"message\":\"serialization failed\"}}"
                .to_string()
        });
        Ok::<_, Infallible>(Event::default().event("message").data(payload))
    });

    let stream = stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(responses);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn handle_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
    body: Bytes,
) -> Response {
    match state
        .server
        .handle_payload(&body, query.user_id.as_deref())
        .await
    {
        None => StatusCode::ACCEPTED.into_response(),
        Some(response) => {
            if state.sessions.push(&query.session_id, response).await {
                StatusCode::ACCEPTED.into_response()
            } else {
                warn!(session_id = %query.session_id, "unknown or closed sse session");
                (StatusCode::NOT_FOUND, "unknown sessionId").into_response()
            }
        }
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(HealthReport::for_server(&state.server))
}
