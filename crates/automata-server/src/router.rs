//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware and HTTP request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// See [`handlers`] for the REST table. The stream socket lives at
/// `GET /ws/simulations/{id}`. `/api/simulations/import` is a static
/// segment and takes precedence over `{id}`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/simulations/{id}", get(ws::ws_simulation))
        // REST API
        .route("/api/health", get(handlers::health))
        .route("/api/presets", get(handlers::list_presets))
        .route(
            "/api/simulations",
            get(handlers::list_simulations).post(handlers::create_simulation),
        )
        .route("/api/simulations/import", post(handlers::import_simulation))
        .route(
            "/api/simulations/{id}",
            get(handlers::get_simulation).delete(handlers::close_simulation),
        )
        .route("/api/simulations/{id}/step", post(handlers::step_simulation))
        .route("/api/simulations/{id}/stats", get(handlers::simulation_stats))
        .route("/api/simulations/{id}/export", get(handlers::export_simulation))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
