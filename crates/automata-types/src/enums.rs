//! Enumeration types shared by the engine, the service layer, and clients.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Lattice geometry
// ---------------------------------------------------------------------------

/// Policy for neighbor lookup at the lattice edge.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum BoundaryMode {
    /// Coordinates outside `[0, dim)` do not exist. Edge cells have fewer
    /// neighbors and out-of-range lookups fail.
    #[default]
    Clamped,
    /// Coordinates wrap toroidally along every axis.
    Wrapped,
}

/// The set of cells considered adjacent to a given cell.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum Neighborhood {
    /// 26-connected: every cell of the surrounding 3x3x3 cube.
    #[default]
    Moore,
    /// 6-connected: the face-adjacent cells only.
    VonNeumann,
}

impl Neighborhood {
    /// Number of neighbors an interior cell has under this neighborhood.
    pub const fn size(self) -> u8 {
        match self {
            Self::Moore => 26,
            Self::VonNeumann => 6,
        }
    }

    /// Short code used in rule notation (`M` or `VN`).
    pub const fn code(self) -> &'static str {
        match self {
            Self::Moore => "M",
            Self::VonNeumann => "VN",
        }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// What a multi-state rule does for a combination its table does not list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DefaultTransition {
    /// Unlisted combinations produce a dead cell.
    Dead,
    /// Unlisted combinations keep the current state.
    Unchanged,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Lifecycle status of a simulation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SessionStatus {
    /// Idle and ready to accept a step.
    Active,
    /// A step is in flight.
    Stepping,
    /// Closed. Every further operation fails with [`ErrorKind::SessionNotFound`].
    Closed,
}

/// Encoding of the updates that follow the first frame of a state stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum StreamFormat {
    /// Only the cells that changed since the previous frame.
    #[default]
    Diff,
    /// A full snapshot every frame.
    Snapshot,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The failure kinds every operation can surface to a caller.
///
/// Library errors in each crate map onto exactly one of these via their
/// `kind()` method, so the kind survives every layer without translation
/// loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ErrorKind {
    /// A dimension is zero or negative, or the volume exceeds the
    /// addressable (or configured) cell limit.
    InvalidDimensions,
    /// A rule specification is malformed.
    InvalidRuleSpecification,
    /// A multi-state rule leaves reachable combinations unmapped and has
    /// no default transition.
    IncompleteRuleSpecification,
    /// A step count is below one or above the configured maximum.
    InvalidStepCount,
    /// A coordinate is outside the lattice under clamped boundaries.
    IndexOutOfRange,
    /// The session does not exist or has been closed.
    SessionNotFound,
    /// A non-blocking step was requested while another step was in flight.
    SessionBusy,
    /// The engine could not complete a computation (e.g. allocation failure).
    InternalComputationFailure,
    /// The initial state source is invalid (density outside `[0, 1]`, a
    /// state outside the alphabet, or a malformed import payload).
    InvalidInitialState,
    /// The transport payload could not be decoded.
    InvalidRequest,
}

impl ErrorKind {
    /// Stable string name of the kind, matching its serialized form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidDimensions => "InvalidDimensions",
            Self::InvalidRuleSpecification => "InvalidRuleSpecification",
            Self::IncompleteRuleSpecification => "IncompleteRuleSpecification",
            Self::InvalidStepCount => "InvalidStepCount",
            Self::IndexOutOfRange => "IndexOutOfRange",
            Self::SessionNotFound => "SessionNotFound",
            Self::SessionBusy => "SessionBusy",
            Self::InternalComputationFailure => "InternalComputationFailure",
            Self::InvalidInitialState => "InvalidInitialState",
            Self::InvalidRequest => "InvalidRequest",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighborhood_sizes() {
        assert_eq!(Neighborhood::Moore.size(), 26);
        assert_eq!(Neighborhood::VonNeumann.size(), 6);
    }

    #[test]
    fn error_kind_display_matches_serde() {
        let kind = ErrorKind::SessionNotFound;
        let json = serde_json::to_string(&kind).unwrap_or_default();
        assert_eq!(json, format!("\"{kind}\""));
    }

    #[test]
    fn stream_format_is_lowercase_on_the_wire() {
        let parsed: Result<StreamFormat, _> = serde_json::from_str("\"snapshot\"");
        assert_eq!(parsed.ok(), Some(StreamFormat::Snapshot));
        assert_eq!(StreamFormat::default(), StreamFormat::Diff);
    }
}
