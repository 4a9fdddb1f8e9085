//! Core data structs: cell states, lattice dimensions, session metadata,
//! and the export document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BoundaryMode, SessionStatus};
use crate::ids::SessionId;
use crate::rules::RuleSpecification;

/// Largest alphabet a lattice may use (states `0..MAX_STATES`).
pub const MAX_STATES: u8 = 16;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// The discrete state of one lattice cell.
///
/// `0` is dead and `1` is alive. Multi-state alphabets use `2..states` for
/// their additional states.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct CellState(pub u8);

impl CellState {
    /// The dead (empty) state.
    pub const DEAD: Self = Self(0);
    /// The alive state of a binary alphabet.
    pub const ALIVE: Self = Self(1);

    /// Raw state value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Whether the cell is in the dead state.
    pub const fn is_dead(self) -> bool {
        self.0 == 0
    }

    /// Whether the cell is in the alive state (state `1`).
    pub const fn is_alive(self) -> bool {
        self.0 == 1
    }
}

/// Lattice extent along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Dimensions {
    /// Extent along the x axis.
    pub x: u32,
    /// Extent along the y axis.
    pub y: u32,
    /// Extent along the z axis.
    pub z: u32,
}

impl Dimensions {
    /// Construct dimensions without validation.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Number of cells, or `None` if the product overflows `usize`.
    pub fn volume(self) -> Option<usize> {
        let x = usize::try_from(self.x).ok()?;
        let y = usize::try_from(self.y).ok()?;
        let z = usize::try_from(self.z).ok()?;
        x.checked_mul(y)?.checked_mul(z)
    }
}

impl core::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// An explicit assignment of a state to one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CellAssignment {
    /// X coordinate.
    pub x: u32,
    /// Y coordinate.
    pub y: u32,
    /// Z coordinate.
    pub z: u32,
    /// State to assign. Defaults to alive.
    #[serde(default = "default_assigned_state")]
    pub state: CellState,
}

const fn default_assigned_state() -> CellState {
    CellState::ALIVE
}

/// A cell whose state differs between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ChangedCell {
    /// X coordinate.
    pub x: u32,
    /// Y coordinate.
    pub y: u32,
    /// Z coordinate.
    pub z: u32,
    /// The state in the newer snapshot.
    pub new_state: CellState,
}

// ---------------------------------------------------------------------------
// Session metadata
// ---------------------------------------------------------------------------

/// Summary of one session, returned by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SessionInfo {
    /// Session identifier.
    pub session_id: SessionId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session last served a request.
    pub last_active_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// Last published generation number.
    pub generation: u64,
    /// Lattice dimensions.
    pub dimensions: Dimensions,
    /// Lattice boundary mode.
    pub boundary_mode: BoundaryMode,
    /// Human-readable rule description (e.g. `4/4/5/M`).
    pub rule: String,
}

/// Population and entropy statistics of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SessionStats {
    /// Session identifier.
    pub session_id: SessionId,
    /// Generation the statistics describe.
    pub generation: u64,
    /// Number of non-dead cells.
    pub population: u64,
    /// Total number of cells.
    pub volume: u64,
    /// Shannon entropy (bits) of the distribution of observed lattice states.
    pub entropy_bits: f64,
    /// Number of distinct lattice states observed so far.
    pub distinct_states: u64,
    /// Number of generations observed so far.
    pub observations: u64,
    /// First generation whose state had already been observed, if any.
    /// From then on the automaton is in a cycle or a still life.
    pub cycle_detected_at: Option<u64>,
}

// ---------------------------------------------------------------------------
// Export / import
// ---------------------------------------------------------------------------

/// Current version of the [`LatticeExport`] document format.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Cell payload of an export document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "encoding")]
#[ts(export, export_to = "bindings/")]
pub enum ExportPayload {
    /// One bit per cell in little-endian `u64` words. Only valid for
    /// binary alphabets.
    Packed {
        /// Packed cell bits, cell `i` at bit `i % 64` of word `i / 64`.
        words: Vec<u64>,
    },
    /// One byte per cell.
    Bytes {
        /// Raw cell states in index order.
        cells: Vec<u8>,
    },
}

/// A self-contained copy of a session's lattice, rule, and generation.
///
/// Importing the document creates a new session that continues from the
/// exported generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LatticeExport {
    /// Document format version.
    pub format_version: u32,
    /// Lattice dimensions.
    pub dimensions: Dimensions,
    /// Lattice boundary mode.
    pub boundary_mode: BoundaryMode,
    /// Fully resolved rule specification.
    pub rule_specification: RuleSpecification,
    /// Generation number at export time.
    pub generation: u64,
    /// Alphabet size.
    pub states: u8,
    /// Cell payload.
    pub payload: ExportPayload,
}
