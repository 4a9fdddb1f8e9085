//! Service binary for the 3D cellular automaton engine.
//!
//! Loads configuration, builds the shared worker pool and session
//! registry, starts idle eviction and the HTTP server, and on `Ctrl-C`
//! stops accepting requests and closes every remaining session.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (first CLI argument, `AUTOMATA_CONFIG`, or
//!    `automata-config.yaml`; defaults when absent)
//! 2. Initialize structured logging (tracing) in the configured format
//! 3. Build the service: worker pool and session registry
//! 4. Spawn the idle-session eviction task
//! 5. Serve HTTP until `Ctrl-C`
//! 6. Drain the registry

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use automata_core::config::{LogFormat, LoggingConfig};
use automata_core::{ServiceConfig, SimulationService, spawn_eviction_task};
use automata_server::{AppState, ServerConfig, start_server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::error::EngineBinError;

/// Config file used when neither a CLI argument nor `AUTOMATA_CONFIG` is
/// given.
const DEFAULT_CONFIG_PATH: &str = "automata-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the worker pool cannot
/// be built, or the server fails to bind.
#[tokio::main]
async fn main() -> Result<(), EngineBinError> {
    // 1. Load configuration.
    let config_path = config_path();
    let config = ServiceConfig::load_or_default(&config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("automata-engine starting");
    info!(
        path = %config_path.display(),
        host = config.server.host,
        port = config.server.port,
        worker_threads = config.engine.worker_threads,
        max_cells = config.engine.max_cells,
        max_steps_per_request = config.engine.max_steps_per_request,
        presets = config.rules.presets.len(),
        "Configuration loaded"
    );

    // 3. Build the service.
    let server_config = ServerConfig::from(&config.server);
    let sessions_config = config.sessions.clone();
    let service = SimulationService::new(config)?;
    let registry = Arc::clone(service.registry());

    // 4. Idle eviction.
    let eviction = spawn_eviction_task(Arc::clone(&registry), &sessions_config);

    // 5. Serve until Ctrl-C.
    let state = Arc::new(AppState::new(service));
    let served = start_server(&server_config, state, shutdown_signal()).await;

    // 6. Drain.
    if let Some(handle) = eviction {
        handle.abort();
    }
    let closed = registry.drain().await;
    info!(closed, "automata-engine shutdown complete");

    served.map_err(EngineBinError::from)
}

/// Resolve the config file path: first CLI argument, then
/// `AUTOMATA_CONFIG`, then the default file name.
fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("AUTOMATA_CONFIG").ok())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Resolve when `Ctrl-C` is received.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
    info!("Draining sessions");
}
