//! Error types for the `automata-core` crate.
//!
//! [`EngineError`] covers a single engine's computations. [`SessionError`]
//! is what the registry and service layer return; it wraps engine and
//! lattice errors so the original [`ErrorKind`] survives.

use automata_lattice::LatticeError;
use automata_types::{ErrorKind, SessionId};

/// Errors raised by the generation engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A step count outside `[1, max]`.
    #[error("step count {requested} outside [1, {max}]")]
    InvalidStepCount {
        /// The requested count.
        requested: u64,
        /// The configured maximum.
        max: u64,
    },

    /// The lattice alphabet does not match the rule alphabet.
    #[error("lattice has {lattice} states but the rule expects {rule}")]
    AlphabetMismatch {
        /// Alphabet size of the lattice.
        lattice: u8,
        /// Alphabet size of the rule.
        rule: u8,
    },

    /// A diff was applied to a snapshot of the wrong generation.
    #[error("diff is based on generation {expected}, snapshot is at {found}")]
    DiffBaseMismatch {
        /// Generation the diff was computed against.
        expected: u64,
        /// Generation of the snapshot it was applied to.
        found: u64,
    },

    /// Two snapshots of different geometry were compared.
    #[error("snapshots are not comparable")]
    IncompatibleSnapshots,

    /// The generation counter would overflow.
    #[error("generation counter overflow")]
    GenerationOverflow,

    /// A committed step was given a base snapshot of another generation.
    #[error("engine is at generation {engine}, base snapshot is at {base}")]
    StaleBase {
        /// Generation of the engine.
        engine: u64,
        /// Generation of the supplied base.
        base: u64,
    },

    /// A pass panicked; the engine was restored to its base generation.
    #[error("pass panicked after reaching generation {reached}: {message}")]
    PassPanicked {
        /// Generation reached before the panic.
        reached: u64,
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The worker pool could not be built.
    #[error("failed to build worker pool: {0}")]
    Pool(String),

    /// A lattice or rule operation failed.
    #[error(transparent)]
    Lattice(#[from] LatticeError),
}

impl EngineError {
    /// The wire-level kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStepCount { .. } => ErrorKind::InvalidStepCount,
            Self::AlphabetMismatch { .. } => ErrorKind::InvalidInitialState,
            Self::DiffBaseMismatch { .. } => ErrorKind::InvalidRequest,
            Self::IncompatibleSnapshots
            | Self::GenerationOverflow
            | Self::StaleBase { .. }
            | Self::PassPanicked { .. }
            | Self::Pool(_) => ErrorKind::InternalComputationFailure,
            Self::Lattice(err) => err.kind(),
        }
    }
}

/// Errors raised by sessions, the registry, and the service layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session does not exist or has been closed.
    #[error("session {session_id} not found")]
    NotFound {
        /// The requested session.
        session_id: SessionId,
    },

    /// A non-blocking step found another step in flight.
    #[error("session {session_id} is busy stepping")]
    Busy {
        /// The requested session.
        session_id: SessionId,
    },

    /// A blocking task panicked or was cancelled.
    #[error("computation task failed: {0}")]
    TaskFailed(String),

    /// The request payload is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An engine operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A lattice or rule operation failed.
    #[error(transparent)]
    Lattice(#[from] LatticeError),
}

impl SessionError {
    /// The wire-level kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::SessionNotFound,
            Self::Busy { .. } => ErrorKind::SessionBusy,
            Self::TaskFailed(_) => ErrorKind::InternalComputationFailure,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Engine(err) => err.kind(),
            Self::Lattice(err) => err.kind(),
        }
    }
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}
