//! Snapshot diffs and the message conversions built on them.

use automata_types::{ChangedCell, SessionId, StateDiff, StateSnapshot};

use crate::engine::GenerationSnapshot;
use crate::error::EngineError;

/// Cells whose state differs between `before` and `after`, in index order.
///
/// # Errors
///
/// Returns [`EngineError::IncompatibleSnapshots`] if the snapshots differ in
/// geometry or alphabet.
pub fn changed_cells(
    before: &GenerationSnapshot,
    after: &GenerationSnapshot,
) -> Result<Vec<ChangedCell>, EngineError> {
    if !before.lattice.is_compatible(&after.lattice) {
        return Err(EngineError::IncompatibleSnapshots);
    }
    let changes = before
        .lattice
        .cells()
        .iter()
        .zip(after.lattice.cells())
        .enumerate()
        .filter(|(_, (old, new))| old != new)
        .filter_map(|(index, (_, new))| {
            let (x, y, z) = after.lattice.coords(index)?;
            Some(ChangedCell {
                x,
                y,
                z,
                new_state: *new,
            })
        })
        .collect();
    Ok(changes)
}

/// Number of cells that differ between two snapshots of the same lattice.
///
/// Cells past the end of the shorter snapshot are not counted.
pub fn count_changed(before: &GenerationSnapshot, after: &GenerationSnapshot) -> u64 {
    let changed = before
        .lattice
        .cells()
        .iter()
        .zip(after.lattice.cells())
        .filter(|(old, new)| old != new)
        .count();
    u64::try_from(changed).unwrap_or(u64::MAX)
}

/// Diff message leading from `before` to `after`.
///
/// # Errors
///
/// Same as [`changed_cells`].
pub fn state_diff(
    session_id: SessionId,
    before: &GenerationSnapshot,
    after: &GenerationSnapshot,
) -> Result<StateDiff, EngineError> {
    Ok(StateDiff {
        session_id,
        generation: after.generation,
        base_generation: before.generation,
        changed_cells: changed_cells(before, after)?,
    })
}

/// Reconstruct the snapshot a diff leads to.
///
/// # Errors
///
/// Returns [`EngineError::DiffBaseMismatch`] if the diff was computed
/// against a different generation, or a lattice error for a change outside
/// the lattice or alphabet.
pub fn apply_diff(
    base: &GenerationSnapshot,
    diff: &StateDiff,
) -> Result<GenerationSnapshot, EngineError> {
    if diff.base_generation != base.generation {
        return Err(EngineError::DiffBaseMismatch {
            expected: diff.base_generation,
            found: base.generation,
        });
    }
    Ok(GenerationSnapshot {
        generation: diff.generation,
        lattice: base.lattice.with_changes(&diff.changed_cells)?,
        entropy: base.entropy,
    })
}

/// Full-state message for a snapshot.
pub fn state_snapshot(session_id: SessionId, snapshot: &GenerationSnapshot) -> StateSnapshot {
    StateSnapshot {
        session_id,
        generation: snapshot.generation,
        dimensions: snapshot.lattice.dimensions(),
        boundary_mode: snapshot.lattice.boundary(),
        states: snapshot.lattice.states(),
        cell_states: snapshot.lattice.cells().to_vec(),
    }
}
