//! Generation engine, sessions, and service layer for the 3D cellular
//! automaton service.
//!
//! This crate turns the synchronous lattice primitives of
//! `automata-lattice` into concurrently usable simulations: many sessions
//! live side by side in a [`Registry`], each advanced by a shared worker
//! pool and observed through published snapshots.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `automata-config.yaml` into
//!   strongly-typed structs.
//! - [`diff`] -- Snapshot diffs and conversions to wire messages.
//! - [`engine`] -- [`GenerationEngine`]: double-buffered, data-parallel
//!   rule application.
//! - [`entropy`] -- State-space entropy and cycle detection.
//! - [`error`] -- [`EngineError`] and [`SessionError`].
//! - [`eviction`] -- Periodic closing of idle sessions and pruning of
//!   closed identifiers.
//! - [`registry`] -- [`Registry`]: the concurrent session map.
//! - [`service`] -- [`SimulationService`]: request handling and streaming.
//! - [`session`] -- [`Session`]: step gate and published state.

pub mod config;
pub mod diff;
pub mod engine;
pub mod entropy;
pub mod error;
pub mod eviction;
pub mod registry;
pub mod service;
pub mod session;

pub use config::{ConfigError, ServiceConfig};
pub use engine::{GenerationEngine, GenerationSnapshot, StepReport, build_pool};
pub use entropy::{EntropyMark, EntropySummary, EntropyTracker};
pub use error::{EngineError, SessionError};
pub use eviction::{prune_closed, spawn_eviction_task, sweep_idle};
pub use registry::{CloseOutcome, Registry};
pub use service::SimulationService;
pub use session::Session;
