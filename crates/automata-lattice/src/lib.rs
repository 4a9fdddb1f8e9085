//! Lattice storage, neighborhoods, and transition rules for the 3D
//! cellular automaton service.
//!
//! This crate is synchronous and allocation-aware: every buffer that scales
//! with the lattice volume is reserved fallibly, so an oversized request
//! surfaces as an error instead of an abort.
//!
//! # Modules
//!
//! - [`error`] -- [`LatticeError`] and its mapping onto wire error kinds.
//! - [`lattice`] -- The dense grid: indexing, boundary policies, initial
//!   population, and neighbor summaries.
//! - [`neighborhood`] -- Moore and von Neumann offsets and the per-state
//!   [`NeighborSummary`] histogram.
//! - [`packed`] -- One-bit-per-cell encoding used by exports and digests.
//! - [`rule`] -- Rule notation parsing, validation, and evaluation.
//! - [`snapshot`] -- Immutable copies of a lattice handed to readers.

pub mod error;
pub mod lattice;
pub mod neighborhood;
pub mod packed;
pub mod rule;
pub mod snapshot;

// Re-export primary types at crate root.
pub use error::LatticeError;
pub use lattice::{Lattice, validate_dimensions};
pub use neighborhood::{NeighborSummary, offsets};
pub use packed::{pack, packed_len, unpack};
pub use rule::{CountSet, Rule};
pub use snapshot::{Snapshot, SnapshotBuffer};
