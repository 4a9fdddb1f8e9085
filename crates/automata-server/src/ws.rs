//! `WebSocket` handler for per-session state streaming.
//!
//! Clients connect to `GET /ws/simulations/{id}?every=N&format=diff` and
//! receive JSON-encoded [`StreamUpdate`] frames: a snapshot first, then a
//! diff (or snapshot) whenever the session has advanced by at least
//! `every` generations, and a final `Closed` frame when the session
//! closes. Disconnecting drops the stream, which cancels it.

use std::sync::Arc;

use automata_types::{SessionId, StreamFormat, StreamUpdate};
use axum::extract::rejection::QueryRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::handlers::parse_session_id;
use crate::state::AppState;

/// Query parameters for the stream socket.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Minimum generation gap between frames.
    pub every: Option<u64>,
    /// `diff` (default) or `snapshot`.
    pub format: Option<StreamFormat>,
}

/// Upgrade an HTTP request to a `WebSocket` connection streaming one
/// session.
///
/// The session is resolved before the upgrade, so an unknown identifier
/// is answered with a plain `404` response.
///
/// # Route
///
/// `GET /ws/simulations/{id}`
pub async fn ws_simulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<StreamQuery>, QueryRejection>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let session_id = parse_session_id(&id)?;
    let Query(query) = query?;
    let updates = state
        .service
        .stream_states(session_id, query.every, query.format.unwrap_or_default())
        .await?;
    Ok(ws.on_upgrade(move |socket| handle_ws(socket, session_id, updates)))
}

/// Forward stream updates as text frames until the stream ends or the
/// client goes away.
async fn handle_ws(
    mut socket: WebSocket,
    session_id: SessionId,
    mut updates: BoxStream<'static, StreamUpdate>,
) {
    debug!(%session_id, "WebSocket client connected");

    loop {
        tokio::select! {
            update = updates.next() => {
                let Some(update) = update else {
                    info!(%session_id, "Stream finished");
                    if let Err(e) = socket.send(Message::Close(None)).await {
                        debug!(%session_id, "WebSocket close frame not delivered: {e}");
                    }
                    return;
                };
                let json = match serde_json::to_string(&update) {
                    Ok(j) => j,
                    Err(e) => {
                        warn!(%session_id, "Failed to serialize stream update: {e}");
                        continue;
                    }
                };
                if socket.send(Message::Text(json.into())).await.is_err() {
                    debug!(%session_id, "WebSocket client disconnected (send failed)");
                    return;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!(%session_id, "Stream cancelled by client");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%session_id, "WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%session_id, "WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Client text and binary frames carry no meaning here.
                    }
                }
            }
        }
    }
}
