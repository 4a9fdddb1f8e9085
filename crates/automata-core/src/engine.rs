//! The generation engine: double-buffered, data-parallel rule application.
//!
//! An engine owns two lattices of identical geometry. Each generation reads
//! every cell of the front buffer and writes its successor into the back
//! buffer, then swaps them. Rows of the back buffer are distributed over a
//! shared `rayon` pool; every cell is a pure function of the front buffer,
//! so the result does not depend on the number of workers or their order.
//!
//! The generation counter only advances after a complete pass.
//! [`GenerationEngine::step_committed`] extends that to whole steps: the
//! result is either every requested generation plus its snapshot, or the
//! engine exactly as it was.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use automata_lattice::{Lattice, Rule, Snapshot, SnapshotBuffer};
use automata_types::{CellState, Dimensions};
use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::entropy::{EntropyMark, EntropySummary, EntropyTracker, StateDigest};
use crate::error::EngineError;

/// Outcome of one `step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// Generation reached.
    pub generation: u64,
    /// Non-dead cells in the final generation.
    pub population: u64,
    /// Cells that changed in the final generation.
    pub changed: u64,
}

/// An immutable lattice copy tagged with its generation and statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSnapshot {
    /// Generation the cells belong to.
    pub generation: u64,
    /// The cells.
    pub lattice: Snapshot,
    /// Entropy statistics up to and including this generation.
    pub entropy: EntropySummary,
}

/// Build the shared worker pool. `threads == 0` means one per CPU.
///
/// # Errors
///
/// Returns [`EngineError::Pool`] if the pool cannot be created.
pub fn build_pool(threads: usize) -> Result<ThreadPool, EngineError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("automata-step-{i}"))
        .build()
        .map_err(|e| EngineError::Pool(e.to_string()))
}

/// Double-buffered generation engine for one session.
#[derive(Debug)]
pub struct GenerationEngine {
    front: Lattice,
    back: Lattice,
    rule: Arc<Rule>,
    generation: u64,
    pool: Arc<ThreadPool>,
    entropy: EntropyTracker,
    /// Digests observed by the step in progress.
    journal: Vec<StateDigest>,
}

impl GenerationEngine {
    /// Engine starting at generation 0.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlphabetMismatch`] if the rule and lattice
    /// disagree on the alphabet, or a lattice allocation error for the
    /// scratch buffer.
    pub fn new(lattice: Lattice, rule: Arc<Rule>, pool: Arc<ThreadPool>) -> Result<Self, EngineError> {
        Self::resume(lattice, rule, pool, 0)
    }

    /// Engine continuing from an arbitrary generation, used by imports.
    ///
    /// # Errors
    ///
    /// Same as [`GenerationEngine::new`].
    pub fn resume(
        lattice: Lattice,
        rule: Arc<Rule>,
        pool: Arc<ThreadPool>,
        generation: u64,
    ) -> Result<Self, EngineError> {
        if lattice.states() != rule.states() {
            return Err(EngineError::AlphabetMismatch {
                lattice: lattice.states(),
                rule: rule.states(),
            });
        }
        let back = Lattice::new(lattice.dimensions(), lattice.boundary(), lattice.states())?;
        let mut entropy = EntropyTracker::new();
        entropy.observe(generation, &lattice);
        Ok(Self {
            front: lattice,
            back,
            rule,
            generation,
            pool,
            entropy,
            journal: Vec::new(),
        })
    }

    /// Current generation number.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The current (front) lattice.
    pub const fn lattice(&self) -> &Lattice {
        &self.front
    }

    /// The rule being applied.
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Shared handle to the rule.
    pub fn shared_rule(&self) -> Arc<Rule> {
        Arc::clone(&self.rule)
    }

    /// Entropy statistics so far.
    pub const fn entropy(&self) -> &EntropyTracker {
        &self.entropy
    }

    /// Copy of the current generation.
    ///
    /// # Errors
    ///
    /// Returns a lattice allocation error if the copy fails.
    pub fn snapshot(&self) -> Result<GenerationSnapshot, EngineError> {
        Ok(GenerationSnapshot {
            generation: self.generation,
            lattice: self.front.snapshot()?,
            entropy: self.entropy.summary(),
        })
    }

    /// Advance `count` generations, one full pass each.
    ///
    /// `count` is not bounded here beyond being non-zero; request limits
    /// are enforced by the service layer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidStepCount`] for `count == 0` and
    /// [`EngineError::GenerationOverflow`] if the counter would wrap. On
    /// error no generation is applied.
    pub fn step(&mut self, count: u64) -> Result<StepReport, EngineError> {
        if count == 0 {
            return Err(EngineError::InvalidStepCount {
                requested: count,
                max: u64::MAX,
            });
        }
        if self.generation.checked_add(count).is_none() {
            return Err(EngineError::GenerationOverflow);
        }

        self.journal.clear();
        let mut changed = 0;
        for _ in 0..count {
            changed = self.advance();
            self.generation = self.generation.saturating_add(1);
            let digest = self.entropy.observe(self.generation, &self.front);
            self.journal.push(digest);
        }

        let report = StepReport {
            generation: self.generation,
            population: self.front.population(),
            changed,
        };
        debug!(
            generation = report.generation,
            population = report.population,
            changed = report.changed,
            count,
            "Step complete"
        );
        Ok(report)
    }

    /// Advance `count` generations and copy the result, or change nothing.
    ///
    /// `base` must be the snapshot of the current generation. Storage for
    /// the new snapshot is reserved before the first pass, so once the
    /// passes finish nothing can fail. If a pass panics, the cells,
    /// generation and entropy statistics are put back to `base`.
    ///
    /// # Errors
    ///
    /// Everything [`GenerationEngine::step`] returns, plus
    /// [`EngineError::StaleBase`] if `base` is not the current generation,
    /// a lattice allocation error if the snapshot cannot be reserved, and
    /// [`EngineError::PassPanicked`] after recovering from a panic.
    pub fn step_committed(
        &mut self,
        count: u64,
        base: &GenerationSnapshot,
    ) -> Result<(StepReport, GenerationSnapshot), EngineError> {
        if base.generation != self.generation {
            return Err(EngineError::StaleBase {
                engine: self.generation,
                base: base.generation,
            });
        }
        let buffer = self.front.reserve_snapshot()?;
        let mark = self.entropy.mark();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.step(count)));
        self.settle(outcome, base, mark, buffer)
    }

    /// Turn the outcome of a guarded step into a committed snapshot, or
    /// restore `base` after a panic.
    fn settle(
        &mut self,
        outcome: std::thread::Result<Result<StepReport, EngineError>>,
        base: &GenerationSnapshot,
        mark: EntropyMark,
        buffer: SnapshotBuffer,
    ) -> Result<(StepReport, GenerationSnapshot), EngineError> {
        match outcome {
            Ok(Ok(report)) => {
                self.journal.clear();
                let snapshot = GenerationSnapshot {
                    generation: self.generation,
                    lattice: self.front.snapshot_into(buffer),
                    entropy: self.entropy.summary(),
                };
                Ok((report, snapshot))
            }
            Ok(Err(err)) => Err(err),
            Err(payload) => {
                let reached = self.generation;
                let message = panic_message(payload.as_ref());
                self.rewind(base, mark)?;
                warn!(
                    reached,
                    restored = base.generation,
                    "Pass panicked, engine restored: {message}"
                );
                Err(EngineError::PassPanicked { reached, message })
            }
        }
    }

    /// Put cells, generation and entropy back to `base`, forgetting the
    /// journaled observations made since `mark`.
    fn rewind(&mut self, base: &GenerationSnapshot, mark: EntropyMark) -> Result<(), EngineError> {
        self.front.restore(&base.lattice)?;
        self.generation = base.generation;
        self.entropy.rewind(mark, &self.journal);
        self.journal.clear();
        Ok(())
    }

    /// One generation: fill the back buffer, then swap. Returns the number
    /// of cells that changed.
    fn advance(&mut self) -> u64 {
        let Self {
            front,
            back,
            rule,
            pool,
            ..
        } = self;
        let dims = front.dimensions();
        let row_len = usize::try_from(dims.x).unwrap_or(usize::MAX).max(1);
        let neighborhood = rule.neighborhood();
        let current: &Lattice = front;
        let rule: &Rule = rule;

        let changed: usize = pool.install(|| {
            back.cells_mut()
                .par_chunks_mut(row_len)
                .zip(current.cells().par_chunks(row_len))
                .enumerate()
                .map(|(row, (next_row, current_row))| {
                    let (y, z) = row_origin(row, dims);
                    let mut changed = 0_usize;
                    for ((x, next), state) in (0_u32..).zip(next_row.iter_mut()).zip(current_row) {
                        let summary = current.summary_at(x, y, z, neighborhood);
                        let successor: CellState = rule.evaluate(*state, &summary);
                        if successor != *state {
                            changed = changed.saturating_add(1);
                        }
                        *next = successor;
                    }
                    changed
                })
                .sum()
        });

        core::mem::swap(front, back);
        u64::try_from(changed).unwrap_or(u64::MAX)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("non-string panic payload"))
}

/// `(y, z)` of the first cell in an x-row.
fn row_origin(row: usize, dims: Dimensions) -> (u32, u32) {
    let height = usize::try_from(dims.y).unwrap_or(usize::MAX).max(1);
    let y = row.checked_rem(height).unwrap_or(0);
    let z = row.checked_div(height).unwrap_or(0);
    (
        u32::try_from(y).unwrap_or(u32::MAX),
        u32::try_from(z).unwrap_or(u32::MAX),
    )
}
