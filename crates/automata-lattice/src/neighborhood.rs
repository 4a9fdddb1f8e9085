//! Neighborhood offsets and per-state neighbor histograms.

use automata_types::{CellState, MAX_STATES, Neighborhood};

/// Number of histogram slots (one per possible state).
const SLOTS: usize = MAX_STATES as usize;

/// Relative offsets of the 26 Moore neighbors.
const MOORE: [(i8, i8, i8); 26] = [
    (-1, -1, -1),
    (0, -1, -1),
    (1, -1, -1),
    (-1, 0, -1),
    (0, 0, -1),
    (1, 0, -1),
    (-1, 1, -1),
    (0, 1, -1),
    (1, 1, -1),
    (-1, -1, 0),
    (0, -1, 0),
    (1, -1, 0),
    (-1, 0, 0),
    (1, 0, 0),
    (-1, 1, 0),
    (0, 1, 0),
    (1, 1, 0),
    (-1, -1, 1),
    (0, -1, 1),
    (1, -1, 1),
    (-1, 0, 1),
    (0, 0, 1),
    (1, 0, 1),
    (-1, 1, 1),
    (0, 1, 1),
    (1, 1, 1),
];

/// Relative offsets of the 6 von Neumann neighbors.
const VON_NEUMANN: [(i8, i8, i8); 6] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

/// Relative `(dx, dy, dz)` offsets of a neighborhood.
pub const fn offsets(neighborhood: Neighborhood) -> &'static [(i8, i8, i8)] {
    match neighborhood {
        Neighborhood::Moore => &MOORE,
        Neighborhood::VonNeumann => &VON_NEUMANN,
    }
}

/// Histogram of neighbor states around one cell.
///
/// `present` counts every neighbor that exists under the boundary policy;
/// `count(state)` counts those in a given state. Binary rules read only
/// [`NeighborSummary::alive`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NeighborSummary {
    counts: [u8; SLOTS],
    present: u8,
}

impl NeighborSummary {
    /// Record one existing neighbor in the given state.
    pub fn record(&mut self, state: CellState) {
        self.present = self.present.saturating_add(1);
        if let Some(slot) = self.counts.get_mut(usize::from(state.value())) {
            *slot = slot.saturating_add(1);
        }
    }

    /// Number of neighbors in a state.
    pub fn count(&self, state: CellState) -> u8 {
        self.counts
            .get(usize::from(state.value()))
            .copied()
            .unwrap_or(0)
    }

    /// Number of neighbors in the alive state.
    pub fn alive(&self) -> u8 {
        self.count(CellState::ALIVE)
    }

    /// Number of neighbors that exist under the boundary policy.
    pub const fn present(&self) -> u8 {
        self.present
    }

    /// Counts of states `1..states`, zero-padded to a fixed width.
    ///
    /// Dead and out-of-range neighbors are indistinguishable here, which
    /// keeps multi-state tables independent of the boundary mode.
    pub fn histogram(&self, states: u8) -> [u8; SLOTS - 1] {
        let mut histogram = [0_u8; SLOTS - 1];
        let live = usize::from(states.saturating_sub(1));
        for (slot, count) in histogram
            .iter_mut()
            .zip(self.counts.iter().skip(1))
            .take(live)
        {
            *slot = *count;
        }
        histogram
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_exclude_center_and_are_unique() {
        for nb in [Neighborhood::Moore, Neighborhood::VonNeumann] {
            let list = offsets(nb);
            assert_eq!(list.len(), usize::from(nb.size()));
            assert!(!list.contains(&(0, 0, 0)));
            let mut sorted = list.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), list.len());
        }
    }

    #[test]
    fn histogram_skips_dead_and_truncates() {
        let mut summary = NeighborSummary::default();
        summary.record(CellState::DEAD);
        summary.record(CellState::ALIVE);
        summary.record(CellState(2));
        summary.record(CellState(2));
        summary.record(CellState(3));

        assert_eq!(summary.present(), 5);
        assert_eq!(summary.alive(), 1);
        let h = summary.histogram(3);
        assert_eq!(h.first().copied(), Some(1));
        assert_eq!(h.get(1).copied(), Some(2));
        // State 3 is outside a 3-state alphabet and is dropped.
        assert_eq!(h.get(2).copied(), Some(0));
    }
}
