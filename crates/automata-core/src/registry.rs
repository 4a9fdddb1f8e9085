//! The session registry: the only shared mutable map in the service.
//!
//! Lookups take a read lock; inserts and removals take a write lock held
//! only for the map operation itself. Lattice construction and session
//! teardown happen outside the lock, so a slow create or close never stalls
//! operations on other sessions.
//!
//! Closed identifiers are remembered with their close time so that closing
//! twice succeeds while closing an identifier that never existed reports it
//! as unknown. [`Registry::prune_closed`] forgets old ones; after that a
//! repeated close reports not found. Session identifiers are time-ordered
//! UUIDs and are never reused.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use automata_types::{SessionId, SessionInfo};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::SessionError;
use crate::session::Session;

/// Whether a close found a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The session was live and is now closed.
    Closed,
    /// The session had already been closed.
    AlreadyClosed,
}

/// Concurrent map of live sessions.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: RwLock<BTreeMap<SessionId, Arc<Session>>>,
    closed: RwLock<HashMap<SessionId, DateTime<Utc>>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return the shared handle.
    pub async fn insert(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        self.sessions
            .write()
            .await
            .insert(session.id(), Arc::clone(&session));
        session
    }

    /// Look up a live session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for unknown and closed sessions.
    pub async fn get(&self, session_id: SessionId) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(SessionError::NotFound { session_id })
    }

    /// Close and remove a session, waiting for any in-flight step.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for an identifier that was never
    /// registered.
    pub async fn close(&self, session_id: SessionId) -> Result<CloseOutcome, SessionError> {
        let removed = {
            let mut sessions = self.sessions.write().await;
            let removed = sessions.remove(&session_id);
            let mut closed = self.closed.write().await;
            match removed {
                Some(session) => {
                    closed.insert(session_id, Utc::now());
                    session
                }
                None if closed.contains_key(&session_id) => return Ok(CloseOutcome::AlreadyClosed),
                None => return Err(SessionError::NotFound { session_id }),
            }
        };
        removed.close().await;
        Ok(CloseOutcome::Closed)
    }

    /// Summaries of every live session, in identifier (creation) order.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<Session>> = self.sessions.read().await.values().cloned().collect();
        sessions.iter().map(|s| s.info()).collect()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Sessions not stepping whose last activity is before `cutoff`.
    pub async fn idle_since(&self, cutoff: DateTime<Utc>) -> Vec<SessionId> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.status() == automata_types::SessionStatus::Active)
            .filter(|s| s.last_active_at() < cutoff)
            .map(|s| s.id())
            .collect()
    }

    /// Forget identifiers closed before `cutoff`. Returns how many were
    /// dropped.
    pub async fn prune_closed(&self, cutoff: DateTime<Utc>) -> usize {
        let mut closed = self.closed.write().await;
        let before = closed.len();
        closed.retain(|_, closed_at| *closed_at >= cutoff);
        before.saturating_sub(closed.len())
    }

    /// Number of remembered closed identifiers.
    pub async fn closed_len(&self) -> usize {
        self.closed.read().await.len()
    }

    /// Close every session. Used at shutdown. Returns how many were closed.
    pub async fn drain(&self) -> usize {
        let drained: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write().await;
            let mut closed = self.closed.write().await;
            let drained: Vec<Arc<Session>> =
                core::mem::take(&mut *sessions).into_values().collect();
            let now = Utc::now();
            closed.extend(drained.iter().map(|s| (s.id(), now)));
            drained
        };
        let count = drained.len();
        for session in drained {
            session.close().await;
        }
        info!(count, "Registry drained");
        count
    }
}
