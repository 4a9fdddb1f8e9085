//! Error types for the `automata-lattice` crate.
//!
//! All fallible operations in this crate return [`LatticeError`]. Each
//! variant maps onto exactly one wire-level [`ErrorKind`] via
//! [`LatticeError::kind`].

use automata_types::ErrorKind;

/// Errors that can occur while constructing or reading lattices and rules.
#[derive(Debug, thiserror::Error)]
pub enum LatticeError {
    /// A dimension is zero or negative, or the volume is not addressable.
    #[error("invalid dimensions {x}x{y}x{z}: {reason}")]
    InvalidDimensions {
        /// Requested x extent.
        x: i64,
        /// Requested y extent.
        y: i64,
        /// Requested z extent.
        z: i64,
        /// Why the dimensions were rejected.
        reason: String,
    },

    /// A coordinate lies outside the lattice under clamped boundaries.
    #[error("coordinate ({x}, {y}, {z}) is outside the lattice")]
    IndexOutOfRange {
        /// X coordinate.
        x: i64,
        /// Y coordinate.
        y: i64,
        /// Z coordinate.
        z: i64,
    },

    /// The rule specification is malformed.
    #[error("invalid rule specification: {0}")]
    InvalidRule(String),

    /// The multi-state rule table misses reachable combinations and has no
    /// default transition.
    #[error("incomplete rule specification: {listed} of {required} reachable combinations mapped and no default given")]
    IncompleteRule {
        /// Number of combinations the table maps.
        listed: u128,
        /// Number of reachable combinations.
        required: u128,
    },

    /// The initial state source is invalid.
    #[error("invalid initial state: {0}")]
    InvalidInitialState(String),

    /// Lattice storage could not be allocated.
    #[error("failed to allocate {cells} cells: {reason}")]
    Allocation {
        /// Requested number of cells.
        cells: usize,
        /// Allocator message.
        reason: String,
    },
}

impl LatticeError {
    /// The wire-level kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDimensions { .. } => ErrorKind::InvalidDimensions,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::InvalidRule(_) => ErrorKind::InvalidRuleSpecification,
            Self::IncompleteRule { .. } => ErrorKind::IncompleteRuleSpecification,
            Self::InvalidInitialState(_) => ErrorKind::InvalidInitialState,
            Self::Allocation { .. } => ErrorKind::InternalComputationFailure,
        }
    }
}
