//! State-space entropy and cycle detection.
//!
//! Each observed generation is reduced to a 32-byte `blake3` digest of its
//! cells. The tracker keeps a frequency table of digests, from which it
//! derives the Shannon entropy of the visited-state distribution and the
//! first generation that revisited an earlier state.

use std::collections::HashMap;

use automata_lattice::Lattice;

/// Digest of one lattice state.
pub type StateDigest = [u8; 32];

/// Point-in-time view of an [`EntropyTracker`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntropySummary {
    /// Shannon entropy in bits of the observed state distribution.
    pub entropy_bits: f64,
    /// Number of distinct states observed.
    pub distinct_states: u64,
    /// Number of generations observed.
    pub observations: u64,
    /// First generation whose state had been observed before.
    pub cycle_detected_at: Option<u64>,
}

/// Tracker position saved by [`EntropyTracker::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntropyMark {
    observations: u64,
    cycle_detected_at: Option<u64>,
}

/// Frequency table of visited lattice states.
#[derive(Debug, Clone, Default)]
pub struct EntropyTracker {
    frequencies: HashMap<StateDigest, u64>,
    observations: u64,
    cycle_detected_at: Option<u64>,
}

impl EntropyTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state of `lattice` at `generation`, returning its digest.
    pub fn observe(&mut self, generation: u64, lattice: &Lattice) -> StateDigest {
        let digest = state_digest(lattice);
        let count = self.frequencies.entry(digest).or_insert(0);
        if *count > 0 && self.cycle_detected_at.is_none() {
            self.cycle_detected_at = Some(generation);
        }
        *count = count.saturating_add(1);
        self.observations = self.observations.saturating_add(1);
        digest
    }

    /// Position to [`EntropyTracker::rewind`] back to.
    pub const fn mark(&self) -> EntropyMark {
        EntropyMark {
            observations: self.observations,
            cycle_detected_at: self.cycle_detected_at,
        }
    }

    /// Undo the observations made since `mark`. `digests` must be exactly
    /// the digests returned by those observations.
    pub fn rewind(&mut self, mark: EntropyMark, digests: &[StateDigest]) {
        for digest in digests {
            if let Some(count) = self.frequencies.get_mut(digest) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.frequencies.remove(digest);
                }
            }
        }
        self.observations = mark.observations;
        self.cycle_detected_at = mark.cycle_detected_at;
    }

    /// Shannon entropy in bits: `-sum(p * log2(p))` over observed states.
    #[allow(clippy::cast_precision_loss)]
    pub fn entropy_bits(&self) -> f64 {
        if self.observations == 0 {
            return 0.0;
        }
        let total = self.observations as f64;
        self.frequencies
            .values()
            .map(|&count| {
                let p = count as f64 / total;
                -p * p.log2()
            })
            .sum()
    }

    /// Number of distinct states observed.
    pub fn distinct_states(&self) -> u64 {
        u64::try_from(self.frequencies.len()).unwrap_or(u64::MAX)
    }

    /// Number of observations.
    pub const fn observations(&self) -> u64 {
        self.observations
    }

    /// First generation that repeated an earlier state.
    pub const fn cycle_detected_at(&self) -> Option<u64> {
        self.cycle_detected_at
    }

    /// All statistics at once.
    pub fn summary(&self) -> EntropySummary {
        EntropySummary {
            entropy_bits: self.entropy_bits(),
            distinct_states: self.distinct_states(),
            observations: self.observations,
            cycle_detected_at: self.cycle_detected_at,
        }
    }
}

/// `blake3` digest of a lattice state.
///
/// Binary lattices hash their packed words; wider alphabets hash one byte
/// per cell.
pub fn state_digest(lattice: &Lattice) -> StateDigest {
    let mut hasher = blake3::Hasher::new();
    if let Some(words) = lattice.to_packed_words() {
        for word in words {
            hasher.update(&word.to_le_bytes());
        }
    } else {
        let bytes: Vec<u8> = lattice.cells().iter().map(|c| c.value()).collect();
        hasher.update(&bytes);
    }
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use automata_types::{BoundaryMode, CellState, Dimensions};

    fn lattice_with(alive: &[usize]) -> Lattice {
        let mut lattice =
            Lattice::new(Dimensions::new(4, 4, 4), BoundaryMode::Wrapped, 2).unwrap();
        for &i in alive {
            if let Some(cell) = lattice.cells_mut().get_mut(i) {
                *cell = CellState::ALIVE;
            }
        }
        lattice
    }

    #[test]
    fn single_state_has_zero_entropy() {
        let mut tracker = EntropyTracker::new();
        let lattice = lattice_with(&[]);
        tracker.observe(0, &lattice);
        assert!(tracker.entropy_bits().abs() < 1e-12);
        assert_eq!(tracker.cycle_detected_at(), None);
        tracker.observe(1, &lattice);
        assert_eq!(tracker.cycle_detected_at(), Some(1));
        assert_eq!(tracker.distinct_states(), 1);
        assert_eq!(tracker.observations(), 2);
    }

    #[test]
    fn two_equally_likely_states_carry_one_bit() {
        let mut tracker = EntropyTracker::new();
        tracker.observe(0, &lattice_with(&[]));
        tracker.observe(1, &lattice_with(&[5]));
        assert!((tracker.entropy_bits() - 1.0).abs() < 1e-12);
        assert_eq!(tracker.distinct_states(), 2);
    }

    #[test]
    fn cycle_generation_is_the_first_repeat() {
        let mut tracker = EntropyTracker::new();
        tracker.observe(0, &lattice_with(&[1]));
        tracker.observe(1, &lattice_with(&[2]));
        tracker.observe(2, &lattice_with(&[1]));
        tracker.observe(3, &lattice_with(&[2]));
        assert_eq!(tracker.summary().cycle_detected_at, Some(2));
    }

    #[test]
    fn rewind_forgets_observations_after_mark() {
        let mut tracker = EntropyTracker::new();
        tracker.observe(0, &lattice_with(&[1]));
        tracker.observe(1, &lattice_with(&[2]));
        let before = tracker.summary();
        let mark = tracker.mark();

        let digests = [
            tracker.observe(2, &lattice_with(&[1])),
            tracker.observe(3, &lattice_with(&[5])),
        ];
        assert_eq!(tracker.cycle_detected_at(), Some(2));
        assert_eq!(tracker.distinct_states(), 3);

        tracker.rewind(mark, &digests);
        assert_eq!(tracker.summary(), before);
        assert_eq!(tracker.distinct_states(), 2);
    }

    #[test]
    fn digests_differ_by_content() {
        assert_ne!(state_digest(&lattice_with(&[0])), state_digest(&lattice_with(&[63])));
        assert_eq!(state_digest(&lattice_with(&[7])), state_digest(&lattice_with(&[7])));
    }
}
