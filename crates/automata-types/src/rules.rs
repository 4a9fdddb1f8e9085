//! Rule specification shapes as they travel over the wire.
//!
//! These are unvalidated inputs. `automata-lattice` parses them into an
//! executable rule and rejects malformed or incomplete specifications.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{DefaultTransition, Neighborhood};

/// One row of a multi-state transition table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TransitionEntry {
    /// Current state of the cell.
    pub from: u8,
    /// Neighbor histogram: `neighbors[i]` is the number of neighbors in
    /// state `i + 1`. Its length must equal `states - 1`.
    pub neighbors: Vec<u8>,
    /// Next state of the cell.
    pub to: u8,
}

/// A transition rule specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind")]
#[ts(export, export_to = "bindings/")]
pub enum RuleSpecification {
    /// Text notation, `survival/birth/states/neighborhood` (e.g. `4/4/5/M`)
    /// or `S../B..` with an optional `/M` or `/VN` suffix.
    Notation {
        /// The notation string.
        notation: String,
    },
    /// A named preset from the service configuration.
    Preset {
        /// Preset name.
        name: String,
    },
    /// Binary life-like rule.
    LifeLike {
        /// Neighborhood used for counting.
        #[serde(default)]
        neighborhood: Neighborhood,
        /// Alive-neighbor counts under which an alive cell survives.
        survival: Vec<u8>,
        /// Alive-neighbor counts under which a dead cell is born.
        birth: Vec<u8>,
    },
    /// Life-like rule with decay states: alive cells that fail survival
    /// step through states `2..states` before dying.
    Generations {
        /// Neighborhood used for counting.
        #[serde(default)]
        neighborhood: Neighborhood,
        /// Alive-neighbor counts under which an alive cell survives.
        survival: Vec<u8>,
        /// Alive-neighbor counts under which a dead cell is born.
        birth: Vec<u8>,
        /// Alphabet size, including dead and alive.
        states: u8,
    },
    /// Arbitrary multi-state rule keyed by current state and neighbor
    /// histogram.
    MultiState {
        /// Neighborhood used for counting.
        #[serde(default)]
        neighborhood: Neighborhood,
        /// Alphabet size, including dead.
        states: u8,
        /// Transition table.
        transitions: Vec<TransitionEntry>,
        /// Result for combinations the table does not list. Without a
        /// default the table must be complete.
        #[serde(default)]
        default: Option<DefaultTransition>,
    },
}

impl RuleSpecification {
    /// Convenience constructor for a Moore life-like rule.
    pub fn life_like(survival: &[u8], birth: &[u8]) -> Self {
        Self::LifeLike {
            neighborhood: Neighborhood::Moore,
            survival: survival.to_vec(),
            birth: birth.to_vec(),
        }
    }

    /// Convenience constructor for a notation rule.
    pub fn notation(notation: &str) -> Self {
        Self::Notation {
            notation: notation.to_owned(),
        }
    }
}
