//! Service layer: maps requests onto the registry and sessions.
//!
//! This is the boundary the transport talks to. Every method takes and
//! returns wire message types from `automata-types`, and every failure is a
//! [`SessionError`] whose [`kind`](SessionError::kind) is the wire error
//! kind. CPU-heavy work (lattice construction, stepping, diffing) runs on
//! blocking threads so async workers stay responsive.

use std::collections::BTreeMap;
use std::sync::Arc;

use automata_lattice::{Lattice, LatticeError, Rule, validate_dimensions};
use automata_types::{
    CellState, CreateRequest, EXPORT_FORMAT_VERSION, ExportPayload, LatticeExport, SessionCreated,
    SessionId, SessionInfo, SessionStats, StateSnapshot, StepRequest, StepResponse, StreamFormat,
    StreamUpdate,
};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use rayon::ThreadPool;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::diff::{state_diff, state_snapshot};
use crate::engine::{GenerationEngine, GenerationSnapshot, build_pool};
use crate::error::{EngineError, SessionError};
use crate::registry::{CloseOutcome, Registry};
use crate::session::{Published, Session};

/// Request handling on top of a [`Registry`] and a shared worker pool.
#[derive(Debug, Clone)]
pub struct SimulationService {
    registry: Arc<Registry>,
    pool: Arc<ThreadPool>,
    config: Arc<ServiceConfig>,
}

impl SimulationService {
    /// Build a service with a fresh registry and a worker pool sized from
    /// `engine.worker_threads`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Pool`] if the pool cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, EngineError> {
        let pool = Arc::new(build_pool(config.engine.worker_threads)?);
        Ok(Self::with_parts(
            Arc::new(config),
            Arc::new(Registry::new()),
            pool,
        ))
    }

    /// Build a service from existing parts.
    pub const fn with_parts(
        config: Arc<ServiceConfig>,
        registry: Arc<Registry>,
        pool: Arc<ThreadPool>,
    ) -> Self {
        Self {
            registry,
            pool,
            config,
        }
    }

    /// The session registry.
    pub const fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Configured rule presets.
    pub fn presets(&self) -> &BTreeMap<String, String> {
        &self.config.rules.presets
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Validate a create request, build the session, and register it.
    ///
    /// Dimensions are validated before the rule, and both before any
    /// allocation. Nothing is registered on failure.
    ///
    /// # Errors
    ///
    /// Returns the kind-carrying error of the first failed validation.
    pub async fn create_simulation(
        &self,
        request: CreateRequest,
    ) -> Result<SessionCreated, SessionError> {
        let config = Arc::clone(&self.config);
        let pool = Arc::clone(&self.pool);
        let session =
            tokio::task::spawn_blocking(move || build_session(&config, pool, &request)).await??;
        let session = self.registry.insert(session).await;
        info!(
            session_id = %session.id(),
            rule = %session.rule(),
            "Session created"
        );
        Ok(SessionCreated {
            session_id: session.id(),
            generation: 0,
        })
    }

    /// Advance a session. With `wait == false` a step already in flight
    /// yields [`SessionError::Busy`] instead of queueing.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for unknown or closed sessions and
    /// [`EngineError::InvalidStepCount`] for a count outside
    /// `[1, engine.max_steps_per_request]`.
    pub async fn step_simulation(
        &self,
        request: StepRequest,
        wait: bool,
    ) -> Result<StepResponse, SessionError> {
        let session = self.registry.get(request.session_id).await?;
        let max = self.config.engine.max_steps_per_request;
        if request.step_count == 0 || request.step_count > max {
            return Err(EngineError::InvalidStepCount {
                requested: request.step_count,
                max,
            }
            .into());
        }
        debug!(
            session_id = %request.session_id,
            count = request.step_count,
            wait,
            "Step requested"
        );
        session.step(request.step_count, wait).await
    }

    /// Close a session. Closing an already-closed session succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an identifier never issued.
    pub async fn close_simulation(
        &self,
        session_id: SessionId,
    ) -> Result<CloseOutcome, SessionError> {
        self.registry.close(session_id).await
    }

    /// Summaries of all live sessions.
    pub async fn list_simulations(&self) -> Vec<SessionInfo> {
        self.registry.list().await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Latest published state. Never waits for an in-flight step.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for unknown or closed sessions.
    pub async fn get_state(&self, session_id: SessionId) -> Result<StateSnapshot, SessionError> {
        let session = self.registry.get(session_id).await?;
        session.touch();
        let latest = session.latest()?;
        Ok(state_snapshot(session_id, &latest))
    }

    /// Population and entropy statistics.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for unknown or closed sessions.
    pub async fn session_stats(&self, session_id: SessionId) -> Result<SessionStats, SessionError> {
        let session = self.registry.get(session_id).await?;
        session.touch();
        session.stats()
    }

    /// Lazily produced sequence of updates for a session.
    ///
    /// The first item is a snapshot of the latest published generation.
    /// After that an update is produced whenever the published generation
    /// has advanced by at least `every` (default `streaming.default_every`)
    /// since the last item, as a diff or a full snapshot per `format`. When
    /// the session closes a final [`StreamUpdate::Closed`] is produced and
    /// the stream ends. Dropping the stream cancels it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for unknown or closed sessions.
    pub async fn stream_states(
        &self,
        session_id: SessionId,
        every: Option<u64>,
        format: StreamFormat,
    ) -> Result<BoxStream<'static, StreamUpdate>, SessionError> {
        let session = self.registry.get(session_id).await?;
        let mut rx = session.subscribe();
        let first = rx
            .borrow_and_update()
            .clone()
            .ok_or(SessionError::NotFound { session_id })?;
        let every = every.unwrap_or(self.config.streaming.default_every).max(1);
        info!(%session_id, every, ?format, "Stream opened");

        let cursor = StreamCursor {
            session_id,
            rx,
            last: first,
            every,
            format,
            phase: StreamPhase::Start,
        };
        Ok(stream::unfold(cursor, next_update).boxed())
    }

    // -----------------------------------------------------------------------
    // Export / import
    // -----------------------------------------------------------------------

    /// Export the latest published generation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for unknown or closed sessions.
    pub async fn export_simulation(
        &self,
        session_id: SessionId,
    ) -> Result<LatticeExport, SessionError> {
        let session = self.registry.get(session_id).await?;
        session.touch();
        session.export()
    }

    /// Create a new session from an export document. The session continues
    /// from the exported generation.
    ///
    /// # Errors
    ///
    /// Returns the same validation errors as [`Self::create_simulation`],
    /// plus [`LatticeError::InvalidInitialState`] for a malformed payload.
    pub async fn import_simulation(
        &self,
        document: LatticeExport,
    ) -> Result<SessionCreated, SessionError> {
        let config = Arc::clone(&self.config);
        let pool = Arc::clone(&self.pool);
        let session =
            tokio::task::spawn_blocking(move || build_imported(&config, pool, document)).await??;
        let session = self.registry.insert(session).await;
        let generation = session.generation().unwrap_or(0);
        info!(session_id = %session.id(), generation, "Session imported");
        Ok(SessionCreated {
            session_id: session.id(),
            generation,
        })
    }
}

// ---------------------------------------------------------------------------
// Session construction
// ---------------------------------------------------------------------------

fn build_session(
    config: &ServiceConfig,
    pool: Arc<ThreadPool>,
    request: &CreateRequest,
) -> Result<Session, SessionError> {
    let dimensions = validate_dimensions(
        request.dim_x,
        request.dim_y,
        request.dim_z,
        config.engine.max_cells,
    )?;
    let rule = Arc::new(Rule::parse(
        &request.rule_specification,
        &config.rules.presets,
    )?);
    let lattice = Lattice::from_source(
        dimensions,
        request.boundary_mode,
        rule.states(),
        &request.initial_state_source,
    )?;
    let engine = GenerationEngine::new(lattice, rule, pool)?;
    Session::new(SessionId::new(), engine)
}

fn build_imported(
    config: &ServiceConfig,
    pool: Arc<ThreadPool>,
    document: LatticeExport,
) -> Result<Session, SessionError> {
    if document.format_version != EXPORT_FORMAT_VERSION {
        return Err(LatticeError::InvalidInitialState(format!(
            "unsupported export format version {}",
            document.format_version
        ))
        .into());
    }
    let dims = document.dimensions;
    let dimensions = validate_dimensions(
        i64::from(dims.x),
        i64::from(dims.y),
        i64::from(dims.z),
        config.engine.max_cells,
    )?;
    let rule = Arc::new(Rule::parse(
        &document.rule_specification,
        &config.rules.presets,
    )?);
    if rule.states() != document.states {
        return Err(LatticeError::InvalidInitialState(format!(
            "document declares {} states but its rule uses {}",
            document.states,
            rule.states()
        ))
        .into());
    }
    let boundary = document.boundary_mode;
    let lattice = match document.payload {
        ExportPayload::Packed { words } if document.states == 2 => {
            Lattice::from_packed_words(dimensions, boundary, &words)?
        }
        ExportPayload::Packed { .. } => {
            return Err(LatticeError::InvalidInitialState(String::from(
                "packed payloads require a binary alphabet",
            ))
            .into());
        }
        ExportPayload::Bytes { cells } => Lattice::from_cells(
            dimensions,
            boundary,
            document.states,
            cells.into_iter().map(CellState).collect(),
        )?,
    };
    let engine = GenerationEngine::resume(lattice, rule, pool, document.generation)?;
    Session::new(SessionId::new(), engine)
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    Start,
    Running,
    Done,
}

struct StreamCursor {
    session_id: SessionId,
    rx: watch::Receiver<Published>,
    last: Arc<GenerationSnapshot>,
    every: u64,
    format: StreamFormat,
    phase: StreamPhase,
}

async fn next_update(mut cursor: StreamCursor) -> Option<(StreamUpdate, StreamCursor)> {
    let session_id = cursor.session_id;
    match cursor.phase {
        StreamPhase::Done => return None,
        StreamPhase::Start => {
            cursor.phase = StreamPhase::Running;
            let update = StreamUpdate::Snapshot(state_snapshot(session_id, &cursor.last));
            return Some((update, cursor));
        }
        StreamPhase::Running => {}
    }

    loop {
        let published = match cursor.rx.changed().await {
            Ok(()) => cursor.rx.borrow_and_update().clone(),
            Err(_closed) => None,
        };
        let Some(next) = published else {
            cursor.phase = StreamPhase::Done;
            debug!(%session_id, generation = cursor.last.generation, "Stream closed");
            let update = StreamUpdate::Closed {
                session_id,
                generation: cursor.last.generation,
            };
            return Some((update, cursor));
        };
        if next.generation < cursor.last.generation.saturating_add(cursor.every) {
            continue;
        }

        let update = match cursor.format {
            StreamFormat::Snapshot => StreamUpdate::Snapshot(state_snapshot(session_id, &next)),
            StreamFormat::Diff => {
                let before = Arc::clone(&cursor.last);
                let after = Arc::clone(&next);
                let diff =
                    tokio::task::spawn_blocking(move || state_diff(session_id, &before, &after))
                        .await;
                match diff {
                    Ok(Ok(diff)) => StreamUpdate::Diff(diff),
                    _ => StreamUpdate::Snapshot(state_snapshot(session_id, &next)),
                }
            }
        };
        cursor.last = next;
        return Some((update, cursor));
    }
}
