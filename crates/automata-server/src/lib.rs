//! HTTP and `WebSocket` transport for the cellular automaton service.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** for the session lifecycle (create, step, read,
//!   close), statistics, export/import, and the configured rule presets
//! - **`WebSocket` endpoint** (`/ws/simulations/{id}`) streaming a
//!   snapshot followed by diffs as the session advances
//! - **Minimal HTML status page** (`GET /`) with the live session count
//!   and links to the API
//!
//! # Architecture
//!
//! Handlers are thin: they decode the request, call one method of
//! [`SimulationService`](automata_core::SimulationService), and encode the
//! result. Every failure becomes an [`Ack`](automata_types::Ack) body with
//! its [`ErrorKind`](automata_types::ErrorKind) and a matching HTTP status.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
