//! Error types for the service binary.
//!
//! [`EngineBinError`] is the top-level error type that wraps every failure
//! mode during startup and serving.

/// Top-level error for the service binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineBinError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: automata_core::ConfigError,
    },

    /// The worker pool could not be built.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: automata_core::EngineError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: automata_server::ServerError,
    },
}
