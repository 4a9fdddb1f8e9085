//! Transition rules: parsing, validation, and evaluation.
//!
//! A [`Rule`] is a closed variant validated exhaustively at construction:
//!
//! - **Life-like** -- binary alphabet; survival and birth count sets.
//! - **Generations** -- life-like counting with decay states: an alive
//!   cell that fails survival steps through `2..states` before dying.
//!   Only state `1` counts as a neighbor and decaying cells ignore births.
//! - **Multi-state** -- explicit table keyed by current state and the
//!   histogram of neighbor states `1..states`, with an optional default.
//!
//! # Notation
//!
//! `survival/birth/states/neighborhood`, e.g. `4/4/5/M` or
//! `9-26/5-7,12-13,15/5/M`. Counts are comma-separated values or inclusive
//! ranges. `M` is Moore and `VN` von Neumann. The `S4,5/B5` form (with an
//! optional `/M` or `/VN` suffix) is accepted for binary rules.

use std::collections::{BTreeMap, HashMap};

use automata_types::{
    CellState, DefaultTransition, MAX_STATES, Neighborhood, RuleSpecification, TransitionEntry,
};

use crate::error::LatticeError;
use crate::neighborhood::NeighborSummary;

/// Width of a multi-state histogram key.
const HISTOGRAM_WIDTH: usize = MAX_STATES as usize - 1;

// ---------------------------------------------------------------------------
// Count sets
// ---------------------------------------------------------------------------

/// A set of neighbor counts in `0..=26`, stored as a bit mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CountSet(u32);

impl CountSet {
    /// Build a set from counts, rejecting any count above `max`.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidRule`] for a count above `max`.
    pub fn from_counts(counts: &[u8], max: u8) -> Result<Self, LatticeError> {
        let mut mask = 0_u32;
        for &count in counts {
            if count > max {
                return Err(LatticeError::InvalidRule(format!(
                    "neighbor count {count} outside [0, {max}]"
                )));
            }
            mask |= 1_u32.checked_shl(u32::from(count)).unwrap_or(0);
        }
        Ok(Self(mask))
    }

    /// Whether the set contains a count.
    pub fn contains(self, count: u8) -> bool {
        self.0
            .checked_shr(u32::from(count))
            .is_some_and(|bits| bits & 1 == 1)
    }

    /// Counts in ascending order.
    pub fn counts(self) -> Vec<u8> {
        (0..32_u8).filter(|c| self.contains(*c)).collect()
    }

    /// Compact notation with inclusive ranges, e.g. `4-5,7`.
    pub fn to_notation(self) -> String {
        let counts = self.counts();
        let mut parts: Vec<String> = Vec::new();
        let mut iter = counts.iter().copied().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek().copied() == end.checked_add(1) {
                end = iter.next().unwrap_or(end);
            }
            if start == end {
                parts.push(start.to_string());
            } else {
                parts.push(format!("{start}-{end}"));
            }
        }
        parts.join(",")
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TransitionKey {
    from: u8,
    histogram: [u8; HISTOGRAM_WIDTH],
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RuleKind {
    LifeLike {
        survival: CountSet,
        birth: CountSet,
    },
    Generations {
        survival: CountSet,
        birth: CountSet,
        states: u8,
    },
    MultiState {
        states: u8,
        table: HashMap<TransitionKey, CellState>,
        default: Option<DefaultTransition>,
    },
}

/// A validated, immutable transition rule.
///
/// Evaluation is a pure function of the current state and the neighbor
/// summary, so one rule can be shared by any number of worker threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    neighborhood: Neighborhood,
    kind: RuleKind,
}

impl Rule {
    /// Parse a rule specification, resolving presets by name.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidRule`] for malformed specifications
    /// or unknown presets, and [`LatticeError::IncompleteRule`] for a
    /// multi-state table without default that misses reachable
    /// combinations.
    pub fn parse(
        spec: &RuleSpecification,
        presets: &BTreeMap<String, String>,
    ) -> Result<Self, LatticeError> {
        match spec {
            RuleSpecification::Notation { notation } => Self::from_notation(notation),
            RuleSpecification::Preset { name } => {
                let notation = presets
                    .get(name)
                    .ok_or_else(|| LatticeError::InvalidRule(format!("unknown preset '{name}'")))?;
                Self::from_notation(notation)
            }
            RuleSpecification::LifeLike {
                neighborhood,
                survival,
                birth,
            } => Self::life_like(*neighborhood, survival, birth),
            RuleSpecification::Generations {
                neighborhood,
                survival,
                birth,
                states,
            } => Self::generations(*neighborhood, survival, birth, *states),
            RuleSpecification::MultiState {
                neighborhood,
                states,
                transitions,
                default,
            } => Self::multi_state(*neighborhood, *states, transitions, *default),
        }
    }

    /// Binary life-like rule.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidRule`] for a count above the
    /// neighborhood size.
    pub fn life_like(
        neighborhood: Neighborhood,
        survival: &[u8],
        birth: &[u8],
    ) -> Result<Self, LatticeError> {
        let max = neighborhood.size();
        Ok(Self {
            neighborhood,
            kind: RuleKind::LifeLike {
                survival: CountSet::from_counts(survival, max)?,
                birth: CountSet::from_counts(birth, max)?,
            },
        })
    }

    /// Life-like rule with decay states. Two states degrade to a plain
    /// life-like rule.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidRule`] for a bad count or alphabet.
    pub fn generations(
        neighborhood: Neighborhood,
        survival: &[u8],
        birth: &[u8],
        states: u8,
    ) -> Result<Self, LatticeError> {
        check_states(states)?;
        if states == 2 {
            return Self::life_like(neighborhood, survival, birth);
        }
        let max = neighborhood.size();
        Ok(Self {
            neighborhood,
            kind: RuleKind::Generations {
                survival: CountSet::from_counts(survival, max)?,
                birth: CountSet::from_counts(birth, max)?,
                states,
            },
        })
    }

    /// Table-driven multi-state rule.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidRule`] for an entry with a state
    /// outside the alphabet, a histogram of the wrong width or with more
    /// neighbors than the neighborhood holds, or a duplicated key. Returns
    /// [`LatticeError::IncompleteRule`] if `default` is `None` and the
    /// table does not cover every reachable combination.
    pub fn multi_state(
        neighborhood: Neighborhood,
        states: u8,
        transitions: &[TransitionEntry],
        default: Option<DefaultTransition>,
    ) -> Result<Self, LatticeError> {
        check_states(states)?;
        let n = neighborhood.size();
        let width = usize::from(states.saturating_sub(1));
        let mut table = HashMap::with_capacity(transitions.len());

        for entry in transitions {
            if entry.from >= states || entry.to >= states {
                return Err(LatticeError::InvalidRule(format!(
                    "transition {} -> {} outside alphabet of {states}",
                    entry.from, entry.to
                )));
            }
            if entry.neighbors.len() != width {
                return Err(LatticeError::InvalidRule(format!(
                    "histogram has {} entries, expected {width}",
                    entry.neighbors.len()
                )));
            }
            let total: u32 = entry.neighbors.iter().map(|c| u32::from(*c)).sum();
            if total > u32::from(n) {
                return Err(LatticeError::InvalidRule(format!(
                    "histogram sums to {total}, neighborhood holds {n}"
                )));
            }
            let mut histogram = [0_u8; HISTOGRAM_WIDTH];
            for (slot, count) in histogram.iter_mut().zip(&entry.neighbors) {
                *slot = *count;
            }
            let key = TransitionKey {
                from: entry.from,
                histogram,
            };
            if table.insert(key, CellState(entry.to)).is_some() {
                return Err(LatticeError::InvalidRule(format!(
                    "duplicate transition for state {} with neighbors {:?}",
                    entry.from, entry.neighbors
                )));
            }
        }

        if default.is_none() {
            let per_state = reachable_histograms(n, width).ok_or_else(|| {
                LatticeError::InvalidRule(String::from("reachable combination count overflows"))
            })?;
            let required = per_state.saturating_mul(u128::from(states));
            let listed = u128::try_from(table.len()).unwrap_or(u128::MAX);
            if listed < required {
                return Err(LatticeError::IncompleteRule { listed, required });
            }
        }

        Ok(Self {
            neighborhood,
            kind: RuleKind::MultiState {
                states,
                table,
                default,
            },
        })
    }

    /// Parse rule notation (see the module docs).
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidRule`] for malformed notation.
    pub fn from_notation(notation: &str) -> Result<Self, LatticeError> {
        let trimmed = notation.trim();
        let parts: Vec<&str> = trimmed.split('/').map(str::trim).collect();
        let starts_with_letter = parts
            .first()
            .is_some_and(|p| p.starts_with(['S', 's', 'B', 'b']));
        if starts_with_letter {
            parse_letter_notation(&parts, trimmed)
        } else {
            parse_numeric_notation(&parts, trimmed)
        }
    }

    /// Compute the next state of a cell.
    pub fn evaluate(&self, current: CellState, summary: &NeighborSummary) -> CellState {
        match &self.kind {
            RuleKind::LifeLike { survival, birth } => {
                let alive = summary.alive();
                let next_alive = if current.is_alive() {
                    survival.contains(alive)
                } else {
                    current.is_dead() && birth.contains(alive)
                };
                if next_alive {
                    CellState::ALIVE
                } else {
                    CellState::DEAD
                }
            }
            RuleKind::Generations {
                survival,
                birth,
                states,
            } => {
                let alive = summary.alive();
                match current.value() {
                    0 if birth.contains(alive) => CellState::ALIVE,
                    0 => CellState::DEAD,
                    1 if survival.contains(alive) => CellState::ALIVE,
                    s => {
                        let next = s.saturating_add(1);
                        if next < *states {
                            CellState(next)
                        } else {
                            CellState::DEAD
                        }
                    }
                }
            }
            RuleKind::MultiState {
                states,
                table,
                default,
            } => {
                let key = TransitionKey {
                    from: current.value(),
                    histogram: summary.histogram(*states),
                };
                table.get(&key).copied().unwrap_or(match default {
                    Some(DefaultTransition::Unchanged) => current,
                    Some(DefaultTransition::Dead) | None => CellState::DEAD,
                })
            }
        }
    }

    /// Neighborhood the rule counts over.
    pub const fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    /// Alphabet size the rule operates on.
    pub const fn states(&self) -> u8 {
        match &self.kind {
            RuleKind::LifeLike { .. } => 2,
            RuleKind::Generations { states, .. } | RuleKind::MultiState { states, .. } => *states,
        }
    }

    /// Fully resolved specification, suitable for export.
    ///
    /// Multi-state tables are emitted in a deterministic order.
    pub fn to_specification(&self) -> RuleSpecification {
        let neighborhood = self.neighborhood;
        match &self.kind {
            RuleKind::LifeLike { survival, birth } => RuleSpecification::LifeLike {
                neighborhood,
                survival: survival.counts(),
                birth: birth.counts(),
            },
            RuleKind::Generations {
                survival,
                birth,
                states,
            } => RuleSpecification::Generations {
                neighborhood,
                survival: survival.counts(),
                birth: birth.counts(),
                states: *states,
            },
            RuleKind::MultiState {
                states,
                table,
                default,
            } => {
                let width = usize::from(states.saturating_sub(1));
                let mut transitions: Vec<TransitionEntry> = table
                    .iter()
                    .map(|(key, to)| TransitionEntry {
                        from: key.from,
                        neighbors: key.histogram.iter().take(width).copied().collect(),
                        to: to.value(),
                    })
                    .collect();
                transitions.sort_by(|a, b| (a.from, &a.neighbors).cmp(&(b.from, &b.neighbors)));
                RuleSpecification::MultiState {
                    neighborhood,
                    states: *states,
                    transitions,
                    default: *default,
                }
            }
        }
    }
}

impl core::fmt::Display for Rule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let code = self.neighborhood.code();
        match &self.kind {
            RuleKind::LifeLike { survival, birth } => write!(
                f,
                "{}/{}/2/{code}",
                survival.to_notation(),
                birth.to_notation()
            ),
            RuleKind::Generations {
                survival,
                birth,
                states,
            } => write!(
                f,
                "{}/{}/{states}/{code}",
                survival.to_notation(),
                birth.to_notation()
            ),
            RuleKind::MultiState { states, table, .. } => {
                write!(f, "multi-state/{states}/{code} ({} transitions)", table.len())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_states(states: u8) -> Result<(), LatticeError> {
    if (2..=MAX_STATES).contains(&states) {
        Ok(())
    } else {
        Err(LatticeError::InvalidRule(format!(
            "alphabet size {states} outside [2, {MAX_STATES}]"
        )))
    }
}

/// Number of histograms over `width` states summing to at most `n`:
/// `C(n + width, width)`.
fn reachable_histograms(n: u8, width: usize) -> Option<u128> {
    let n = u128::from(n);
    let mut result: u128 = 1;
    for i in 1..=u128::try_from(width).ok()? {
        result = result.checked_mul(n.checked_add(i)?)?.checked_div(i)?;
    }
    Some(result)
}

fn parse_neighborhood(code: &str) -> Result<Neighborhood, LatticeError> {
    match code.to_ascii_uppercase().as_str() {
        "M" | "MOORE" => Ok(Neighborhood::Moore),
        "VN" | "N" | "VONNEUMANN" => Ok(Neighborhood::VonNeumann),
        other => Err(LatticeError::InvalidRule(format!(
            "unknown neighborhood '{other}'"
        ))),
    }
}

fn parse_count(text: &str, token: &str) -> Result<u8, LatticeError> {
    text.trim()
        .parse()
        .map_err(|e| LatticeError::InvalidRule(format!("malformed count '{token}': {e}")))
}

/// Parse `a,b,c-d` into counts. An empty list is valid.
fn parse_counts(list: &str) -> Result<Vec<u8>, LatticeError> {
    let mut counts = Vec::new();
    for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if let Some((lo, hi)) = token.split_once('-') {
            let lo = parse_count(lo, token)?;
            let hi = parse_count(hi, token)?;
            if lo > hi {
                return Err(LatticeError::InvalidRule(format!(
                    "descending range '{token}'"
                )));
            }
            counts.extend(lo..=hi);
        } else {
            counts.push(parse_count(token, token)?);
        }
    }
    Ok(counts)
}

fn parse_numeric_notation(parts: &[&str], notation: &str) -> Result<Rule, LatticeError> {
    let malformed = || {
        LatticeError::InvalidRule(format!(
            "'{notation}' is not survival/birth/states/neighborhood notation"
        ))
    };
    let (survival, birth, rest) = match parts {
        [s, b, rest @ ..] if rest.len() <= 2 => (*s, *b, rest),
        _ => return Err(malformed()),
    };
    let states = match rest.first() {
        Some(s) => s.parse::<u8>().map_err(|e| {
            LatticeError::InvalidRule(format!("malformed alphabet size in '{notation}': {e}"))
        })?,
        None => 2,
    };
    let neighborhood = match rest.get(1) {
        Some(code) => parse_neighborhood(code)?,
        None => Neighborhood::Moore,
    };
    Rule::generations(
        neighborhood,
        &parse_counts(survival)?,
        &parse_counts(birth)?,
        states,
    )
}

fn parse_letter_notation(parts: &[&str], notation: &str) -> Result<Rule, LatticeError> {
    let malformed =
        || LatticeError::InvalidRule(format!("'{notation}' is not S../B.. notation"));
    let mut survival: Option<Vec<u8>> = None;
    let mut birth: Option<Vec<u8>> = None;
    let mut neighborhood = Neighborhood::Moore;

    for (position, part) in parts.iter().enumerate() {
        let mut chars = part.chars();
        match chars.next() {
            Some('S' | 's') if survival.is_none() => survival = Some(parse_counts(chars.as_str())?),
            Some('B' | 'b') if birth.is_none() => birth = Some(parse_counts(chars.as_str())?),
            Some(_) if position == 2 => neighborhood = parse_neighborhood(part)?,
            _ => return Err(malformed()),
        }
    }

    match (survival, birth) {
        (Some(s), Some(b)) => Rule::life_like(neighborhood, &s, &b),
        _ => Err(malformed()),
    }
}
