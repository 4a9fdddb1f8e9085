//! Request, response, and stream message shapes of the simulation service.
//!
//! Encoding is the transport's concern; these types fix only the shapes.
//! Full-state messages ([`StateSnapshot`]) answer `GetState` and open a
//! stream. Later stream updates carry [`StateDiff`]s.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BoundaryMode, ErrorKind};
use crate::ids::SessionId;
use crate::rules::RuleSpecification;
use crate::structs::{CellAssignment, CellState, ChangedCell, Dimensions};

// ---------------------------------------------------------------------------
// Initial state
// ---------------------------------------------------------------------------

/// How a new lattice is populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind")]
#[ts(export, export_to = "bindings/")]
pub enum InitialStateSource {
    /// Every cell dead.
    #[default]
    Empty,
    /// Explicit per-cell assignments. Unlisted cells are dead.
    Cells {
        /// The assignments, each validated to lie inside the lattice.
        cells: Vec<CellAssignment>,
    },
    /// Seeded random fill: each cell is alive with probability `density`.
    Random {
        /// Probability in `[0, 1]` that a cell starts alive.
        density: f64,
        /// Seed for reproducible fills.
        seed: u64,
    },
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Create a new simulation session.
///
/// Dimensions are signed so that zero and negative extents reach
/// validation and fail with [`ErrorKind::InvalidDimensions`] rather than
/// a decoding error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CreateRequest {
    /// Extent along the x axis.
    pub dim_x: i64,
    /// Extent along the y axis.
    pub dim_y: i64,
    /// Extent along the z axis.
    pub dim_z: i64,
    /// Boundary mode.
    #[serde(default)]
    pub boundary_mode: BoundaryMode,
    /// Transition rule.
    pub rule_specification: RuleSpecification,
    /// Initial lattice population.
    #[serde(default)]
    pub initial_state_source: InitialStateSource,
}

/// Advance a session by a number of generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StepRequest {
    /// Target session.
    pub session_id: SessionId,
    /// Number of generations, at least one.
    pub step_count: u64,
}

/// Close a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CloseRequest {
    /// Target session.
    pub session_id: SessionId,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Result of a successful create or import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SessionCreated {
    /// The new session identifier.
    pub session_id: SessionId,
    /// Generation the session starts at (0 unless imported).
    pub generation: u64,
}

/// Result of a successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StepResponse {
    /// Target session.
    pub session_id: SessionId,
    /// Generation number reached.
    pub generation: u64,
    /// Number of non-dead cells after the step.
    pub population: u64,
    /// Number of cells whose state differs from the generation the step
    /// started at.
    pub changed_cells: u64,
}

/// Full lattice state at one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateSnapshot {
    /// Source session.
    pub session_id: SessionId,
    /// Generation number.
    pub generation: u64,
    /// Lattice dimensions.
    pub dimensions: Dimensions,
    /// Boundary mode.
    pub boundary_mode: BoundaryMode,
    /// Alphabet size.
    pub states: u8,
    /// Cell states indexed by `x + y*dimX + z*dimX*dimY`.
    pub cell_states: Vec<CellState>,
}

/// Cells that changed between two generations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StateDiff {
    /// Source session.
    pub session_id: SessionId,
    /// Generation the diff leads to.
    pub generation: u64,
    /// Generation the diff was computed against.
    pub base_generation: u64,
    /// Changed cells with their new states.
    pub changed_cells: Vec<ChangedCell>,
}

/// Generic acknowledgement, also the body of every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Ack {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Failure kind, absent on success.
    pub error_kind: Option<ErrorKind>,
    /// Human-readable message.
    pub message: String,
}

impl Ack {
    /// A successful acknowledgement.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            error_kind: None,
            message: message.into(),
        }
    }

    /// A failed acknowledgement carrying one error kind.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_kind: Some(kind),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// One message of a `StreamStates` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export, export_to = "bindings/")]
pub enum StreamUpdate {
    /// Full state; always the first message of a stream.
    Snapshot(StateSnapshot),
    /// Changes since the previous message.
    Diff(StateDiff),
    /// The session closed; no further messages follow.
    Closed {
        /// Source session.
        session_id: SessionId,
        /// Last generation the stream delivered.
        generation: u64,
    },
}

impl StreamUpdate {
    /// Generation the update describes.
    pub const fn generation(&self) -> u64 {
        match self {
            Self::Snapshot(s) => s.generation,
            Self::Diff(d) => d.generation,
            Self::Closed { generation, .. } => *generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_defaults() {
        let json = r#"{
            "dim_x": 3, "dim_y": 3, "dim_z": 3,
            "rule_specification": {"kind": "Notation", "notation": "4/4/5/M"}
        }"#;
        let parsed: Result<CreateRequest, _> = serde_json::from_str(json);
        let request = parsed.ok();
        assert_eq!(
            request.as_ref().map(|r| r.boundary_mode),
            Some(BoundaryMode::Clamped)
        );
        assert_eq!(
            request.map(|r| r.initial_state_source),
            Some(InitialStateSource::Empty)
        );
    }

    #[test]
    fn ack_error_carries_kind() {
        let ack = Ack::error(ErrorKind::SessionBusy, "busy");
        assert!(!ack.success);
        assert_eq!(ack.error_kind, Some(ErrorKind::SessionBusy));
    }

    #[test]
    fn stream_update_is_tagged() {
        let update = StreamUpdate::Closed {
            session_id: SessionId::new(),
            generation: 7,
        };
        let value = serde_json::to_value(&update).unwrap_or_default();
        assert_eq!(value["type"], "Closed");
        assert_eq!(update.generation(), 7);
    }
}
