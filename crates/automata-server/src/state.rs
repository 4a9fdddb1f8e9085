//! Shared application state.

use automata_core::SimulationService;
use chrono::{DateTime, Utc};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. All session state lives behind the service's registry, so
/// handlers never hold a lock across an await of their own.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The service every handler delegates to.
    pub service: SimulationService,
    /// When the server started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create application state around a service.
    pub fn new(service: SimulationService) -> Self {
        Self {
            service,
            started_at: Utc::now(),
        }
    }

    /// Whole seconds since the server started.
    pub fn uptime_secs(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0)
    }
}
