//! REST API endpoint handlers.
//!
//! Every handler delegates to the shared
//! [`SimulationService`](automata_core::SimulationService) and returns
//! either a wire message as JSON or an [`ApiError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/health` | Liveness and session count |
//! | `GET` | `/api/simulations` | List live sessions |
//! | `POST` | `/api/simulations` | Create a session |
//! | `GET` | `/api/simulations/{id}` | Latest published state |
//! | `POST` | `/api/simulations/{id}/step` | Advance (`?wait=false` fails fast when busy) |
//! | `DELETE` | `/api/simulations/{id}` | Close a session |
//! | `GET` | `/api/simulations/{id}/stats` | Population and entropy |
//! | `GET` | `/api/simulations/{id}/export` | Export document |
//! | `POST` | `/api/simulations/import` | Create a session from an export |
//! | `GET` | `/api/presets` | Configured rule presets |

use std::sync::Arc;

use automata_core::CloseOutcome;
use automata_types::{Ack, CreateRequest, LatticeExport, SessionId, StepRequest};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies and query parameters
// ---------------------------------------------------------------------------

/// Body of `POST /api/simulations/{id}/step`. The session comes from the
/// path.
#[derive(Debug, Deserialize)]
pub struct StepBody {
    /// Number of generations to advance.
    pub step_count: u64,
}

/// Query parameters for the step endpoint.
#[derive(Debug, Deserialize)]
pub struct StepQuery {
    /// Wait for an in-flight step (default) or fail with `SessionBusy`.
    pub wait: Option<bool>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing server status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.service.registry().len().await;
    let presets = state.service.presets().len();
    let max_steps = state.service.config().engine.max_steps_per_request;
    let uptime = state.uptime_secs();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Automata Engine</title>
    <style>
        body {{
            font-family: 'SF Mono', 'Fira Code', monospace;
            background: #0d1117;
            color: #c9d1d9;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Automata Engine</h1>
    <p class="subtitle">3D cellular automaton sessions</p>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Sessions</div>
            <div class="value">{sessions}</div>
        </div>
        <div class="metric">
            <div class="label">Presets</div>
            <div class="value">{presets}</div>
        </div>
        <div class="metric">
            <div class="label">Max steps / request</div>
            <div class="value">{max_steps}</div>
        </div>
        <div class="metric">
            <div class="label">Uptime (s)</div>
            <div class="value">{uptime}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/health">/api/health</a> -- Liveness</li>
        <li>GET <a href="/api/simulations">/api/simulations</a> -- List sessions</li>
        <li>POST /api/simulations -- Create a session</li>
        <li>GET /api/simulations/{{id}} -- Latest state</li>
        <li>POST /api/simulations/{{id}}/step -- Advance (?wait=false)</li>
        <li>DELETE /api/simulations/{{id}} -- Close</li>
        <li>GET /api/simulations/{{id}}/stats -- Population and entropy</li>
        <li>GET /api/simulations/{{id}}/export -- Export document</li>
        <li>POST /api/simulations/import -- Import document</li>
        <li>GET <a href="/api/presets">/api/presets</a> -- Rule presets</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/simulations/{{id}}?every=N&amp;format=diff|snapshot</code></li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Liveness probe with the live session count.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "sessions": state.service.registry().len().await,
        "uptime_secs": state.uptime_secs(),
    }))
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// List all live sessions in creation order.
pub async fn list_simulations(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.service.list_simulations().await;
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

/// Create a session. Responds `201 Created` with the new identifier.
pub async fn create_simulation(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let created = state.service.create_simulation(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Latest published state of a session.
pub async fn get_simulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&id)?;
    Ok(Json(state.service.get_state(session_id).await?))
}

/// Advance a session.
///
/// # Query Parameters
///
/// - `wait`: `true` (default) queues behind an in-flight step; `false`
///   fails immediately with `SessionBusy`.
pub async fn step_simulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    query: Result<Query<StepQuery>, QueryRejection>,
    body: Result<Json<StepBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&id)?;
    let Query(query) = query?;
    let Json(body) = body?;
    let request = StepRequest {
        session_id,
        step_count: body.step_count,
    };
    let response = state
        .service
        .step_simulation(request, query.wait.unwrap_or(true))
        .await?;
    Ok(Json(response))
}

/// Close a session. Closing an already-closed session succeeds.
pub async fn close_simulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&id)?;
    let message = match state.service.close_simulation(session_id).await? {
        CloseOutcome::Closed => format!("session {session_id} closed"),
        CloseOutcome::AlreadyClosed => format!("session {session_id} was already closed"),
    };
    Ok(Json(Ack::ok(message)))
}

// ---------------------------------------------------------------------------
// Statistics, export, import
// ---------------------------------------------------------------------------

/// Population and entropy statistics for a session.
pub async fn simulation_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&id)?;
    Ok(Json(state.service.session_stats(session_id).await?))
}

/// Export document for the latest published generation.
pub async fn export_simulation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = parse_session_id(&id)?;
    Ok(Json(state.service.export_simulation(session_id).await?))
}

/// Create a session from an export document.
pub async fn import_simulation(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LatticeExport>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(document) = body?;
    let created = state.service.import_simulation(document).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Configured rule presets, name to notation.
pub async fn list_presets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.presets().clone())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a session identifier from a path segment.
pub(crate) fn parse_session_id(s: &str) -> Result<SessionId, ApiError> {
    s.parse::<SessionId>()
        .map_err(|e| ApiError::InvalidId(format!("{s}: {e}")))
}
