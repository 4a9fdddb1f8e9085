//! A single simulation session.
//!
//! # Concurrency
//!
//! - Steps are serialized by an async mutex around the engine. The guard is
//!   moved into a blocking task for the duration of the computation, so a
//!   long step never occupies an async worker. A non-blocking step uses
//!   `try_lock` and fails with [`SessionError::Busy`].
//! - Every completed step publishes a fresh [`GenerationSnapshot`] on a
//!   `watch` channel while still holding the guard. Readers only ever look
//!   at the latest published snapshot, so they never wait for a step and
//!   never observe a half-computed generation.
//! - Closing takes the engine out of the mutex (after any in-flight step)
//!   and publishes `None`, which ends every stream and makes later reads
//!   fail with [`SessionError::NotFound`].

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

use automata_lattice::{Rule, pack};
use automata_types::{
    BoundaryMode, Dimensions, EXPORT_FORMAT_VERSION, ExportPayload, LatticeExport, SessionId,
    SessionInfo, SessionStats, SessionStatus, StepResponse,
};
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, watch};
use tracing::{debug, info, warn};

use crate::diff::count_changed;
use crate::engine::{GenerationEngine, GenerationSnapshot};
use crate::error::SessionError;

/// Latest published state, `None` once the session is closed.
pub type Published = Option<Arc<GenerationSnapshot>>;

type EngineSlot = Arc<Mutex<Option<GenerationEngine>>>;

/// One simulation: an engine behind a step gate plus its published state.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    last_active_ms: AtomicI64,
    status: AtomicU8,
    dimensions: Dimensions,
    boundary: BoundaryMode,
    rule: Arc<Rule>,
    engine: EngineSlot,
    published: watch::Sender<Published>,
}

impl Session {
    /// Wrap an engine in a new session and publish its initial state.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the initial snapshot cannot be copied.
    pub fn new(id: SessionId, engine: GenerationEngine) -> Result<Self, SessionError> {
        let initial = Arc::new(engine.snapshot()?);
        let lattice = engine.lattice();
        let now = Utc::now();
        let session = Self {
            id,
            created_at: now,
            last_active_ms: AtomicI64::new(now.timestamp_millis()),
            status: AtomicU8::new(status_code(SessionStatus::Active)),
            dimensions: lattice.dimensions(),
            boundary: lattice.boundary(),
            rule: engine.shared_rule(),
            engine: Arc::new(Mutex::new(Some(engine))),
            published: watch::Sender::new(Some(initial)),
        };
        Ok(session)
    }

    /// Session identifier.
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The session's rule.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        status_from_code(self.status.load(Ordering::Acquire))
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.status() == SessionStatus::Closed
    }

    /// When the session last served a request.
    pub fn last_active_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_active_ms.load(Ordering::Acquire))
            .unwrap_or(self.created_at)
    }

    /// Mark the session as used now.
    pub fn touch(&self) {
        self.last_active_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
    }

    /// Latest published snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] once the session is closed.
    pub fn latest(&self) -> Result<Arc<GenerationSnapshot>, SessionError> {
        self.published
            .borrow()
            .clone()
            .ok_or(SessionError::NotFound {
                session_id: self.id,
            })
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.published.subscribe()
    }

    /// Last published generation, or `None` once closed.
    pub fn generation(&self) -> Option<u64> {
        self.published.borrow().as_ref().map(|s| s.generation)
    }

    /// Listing summary.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id,
            created_at: self.created_at,
            last_active_at: self.last_active_at(),
            status: self.status(),
            generation: self.generation().unwrap_or(0),
            dimensions: self.dimensions,
            boundary_mode: self.boundary,
            rule: self.rule.to_string(),
        }
    }

    /// Population and entropy of the latest published generation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] once the session is closed.
    pub fn stats(&self) -> Result<SessionStats, SessionError> {
        let latest = self.latest()?;
        Ok(SessionStats {
            session_id: self.id,
            generation: latest.generation,
            population: latest.lattice.population(),
            volume: u64::try_from(latest.lattice.volume()).unwrap_or(u64::MAX),
            entropy_bits: latest.entropy.entropy_bits,
            distinct_states: latest.entropy.distinct_states,
            observations: latest.entropy.observations,
            cycle_detected_at: latest.entropy.cycle_detected_at,
        })
    }

    /// Self-contained export of the latest published generation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] once the session is closed.
    pub fn export(&self) -> Result<LatticeExport, SessionError> {
        let latest = self.latest()?;
        let states = latest.lattice.states();
        let payload = if states == 2 {
            ExportPayload::Packed {
                words: pack(latest.lattice.cells()),
            }
        } else {
            ExportPayload::Bytes {
                cells: latest.lattice.cells().iter().map(|c| c.value()).collect(),
            }
        };
        Ok(LatticeExport {
            format_version: EXPORT_FORMAT_VERSION,
            dimensions: latest.lattice.dimensions(),
            boundary_mode: latest.lattice.boundary(),
            rule_specification: self.rule.to_specification(),
            generation: latest.generation,
            states,
            payload,
        })
    }

    /// Advance the session by `count` generations.
    ///
    /// With `wait == false` the call fails immediately with
    /// [`SessionError::Busy`] if another step holds the gate. The step runs
    /// to completion and publishes its result even if the caller stops
    /// waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if the session closed,
    /// [`SessionError::Busy`] as above, engine errors from the step itself,
    /// and [`SessionError::TaskFailed`] if the computation panicked. On
    /// every error the generation is unchanged.
    pub async fn step(
        self: &Arc<Self>,
        count: u64,
        wait: bool,
    ) -> Result<StepResponse, SessionError> {
        let guard = if wait {
            Arc::clone(&self.engine).lock_owned().await
        } else {
            Arc::clone(&self.engine)
                .try_lock_owned()
                .map_err(|_busy| SessionError::Busy {
                    session_id: self.id,
                })?
        };
        if guard.is_none() {
            return Err(SessionError::NotFound {
                session_id: self.id,
            });
        }

        self.set_status(SessionStatus::Stepping);
        self.touch();
        let session = Arc::clone(self);
        let result = tokio::task::spawn_blocking(move || session.run_step(guard, count)).await;

        match result {
            Ok(outcome) => outcome,
            Err(join) => {
                warn!(session_id = %self.id, error = %join, "Step task failed");
                if !self.is_closed() {
                    self.set_status(SessionStatus::Active);
                }
                Err(SessionError::from(join))
            }
        }
    }

    /// Body of a step, run on the blocking pool while holding the gate.
    fn run_step(
        &self,
        mut guard: OwnedMutexGuard<Option<GenerationEngine>>,
        count: u64,
    ) -> Result<StepResponse, SessionError> {
        let outcome = self.step_locked(&mut guard, count);
        self.set_status(SessionStatus::Active);
        self.touch();
        drop(guard);
        outcome
    }

    fn step_locked(
        &self,
        slot: &mut Option<GenerationEngine>,
        count: u64,
    ) -> Result<StepResponse, SessionError> {
        let engine = slot.as_mut().ok_or(SessionError::NotFound {
            session_id: self.id,
        })?;
        let before = self.latest()?;
        let (report, after) = engine.step_committed(count, &before)?;
        let changed = if count == 1 {
            report.changed
        } else {
            count_changed(&before, &after)
        };
        self.published.send_replace(Some(Arc::new(after)));
        debug!(
            session_id = %self.id,
            generation = report.generation,
            population = report.population,
            changed,
            "Published generation"
        );
        Ok(StepResponse {
            session_id: self.id,
            generation: report.generation,
            population: report.population,
            changed_cells: changed,
        })
    }

    /// Close the session, waiting for any in-flight step.
    ///
    /// Returns `false` if it was already closed.
    pub async fn close(&self) -> bool {
        let mut guard = self.engine.lock().await;
        let engine = guard.take();
        self.set_status(SessionStatus::Closed);
        self.published.send_replace(None);
        drop(guard);

        match engine {
            Some(engine) => {
                info!(
                    session_id = %self.id,
                    generation = engine.generation(),
                    "Session closed"
                );
                true
            }
            None => false,
        }
    }

    fn set_status(&self, status: SessionStatus) {
        self.status.store(status_code(status), Ordering::Release);
    }
}

const fn status_code(status: SessionStatus) -> u8 {
    match status {
        SessionStatus::Active => 0,
        SessionStatus::Stepping => 1,
        SessionStatus::Closed => 2,
    }
}

const fn status_from_code(code: u8) -> SessionStatus {
    match code {
        0 => SessionStatus::Active,
        1 => SessionStatus::Stepping,
        _ => SessionStatus::Closed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::engine::build_pool;
    use automata_lattice::Lattice;
    use automata_types::{ErrorKind, InitialStateSource};

    fn session(notation: &str) -> Arc<Session> {
        let rule = Arc::new(Rule::from_notation(notation).unwrap());
        let lattice = Lattice::from_source(
            Dimensions::new(10, 10, 10),
            BoundaryMode::Wrapped,
            rule.states(),
            &InitialStateSource::Random {
                density: 0.3,
                seed: 1,
            },
        )
        .unwrap();
        let engine =
            GenerationEngine::new(lattice, rule, Arc::new(build_pool(2).unwrap())).unwrap();
        Arc::new(Session::new(SessionId::new(), engine).unwrap())
    }

    #[tokio::test]
    async fn step_publishes_new_generation() {
        let session = session("4/4/5/M");
        let rx = session.subscribe();

        let response = session.step(3, true).await.unwrap();
        assert_eq!(response.generation, 3);
        assert_eq!(session.generation(), Some(3));
        assert!(rx.has_changed().unwrap());
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.stats().unwrap().observations, 4);
    }

    #[tokio::test]
    async fn failed_step_leaves_generation_unchanged() {
        let session = session("4/4/5/M");
        session.step(1, true).await.unwrap();
        let err = session.step(0, true).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStepCount);
        assert_eq!(session.generation(), Some(1));
    }

    #[tokio::test]
    async fn published_snapshot_matches_engine_between_steps() {
        let session = session("4/4/5/M");
        for count in [1, 4, 2] {
            let response = session.step(count, true).await.unwrap();
            let published = session.latest().unwrap();
            let guard = session.engine.lock().await;
            let engine = guard.as_ref().unwrap();
            assert_eq!(engine.generation(), response.generation);
            assert_eq!(*published, engine.snapshot().unwrap());
        }
        assert_eq!(session.generation(), Some(7));
    }

    #[tokio::test]
    async fn busy_gate_rejects_non_blocking_step() {
        let session = session("4/4/5/M");
        let held = Arc::clone(&session.engine).lock_owned().await;
        let err = session.step(1, false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionBusy);
        drop(held);
        assert!(session.step(1, false).await.is_ok());
    }

    #[tokio::test]
    async fn close_ends_reads_and_steps() {
        let session = session("S4,5/B5");
        let mut rx = session.subscribe();
        assert!(session.close().await);
        assert!(!session.close().await);

        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
        assert_eq!(session.latest().unwrap_err().kind(), ErrorKind::SessionNotFound);
        assert_eq!(
            session.step(1, true).await.unwrap_err().kind(),
            ErrorKind::SessionNotFound
        );
        assert_eq!(session.status(), SessionStatus::Closed);
    }

    #[tokio::test]
    async fn export_uses_packed_words_for_binary_rules() {
        let binary = session("S4,5/B5").export().unwrap();
        assert!(matches!(binary.payload, ExportPayload::Packed { ref words } if words.len() == 16));

        let wide = session("4/4/5/M").export().unwrap();
        assert!(matches!(wide.payload, ExportPayload::Bytes { ref cells } if cells.len() == 1000));
        assert_eq!(wide.states, 5);
    }
}
