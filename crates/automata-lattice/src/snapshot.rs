//! Immutable lattice copies handed to readers.

use automata_types::{BoundaryMode, CellState, ChangedCell, Dimensions};

use crate::error::LatticeError;
use crate::lattice::{allocate_cells, coords_of, linear_index, resolve_index};

/// A fully copied, read-only view of a lattice.
///
/// Snapshots never alias the engine's live buffers, so holding one across
/// later steps is always safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    dimensions: Dimensions,
    boundary: BoundaryMode,
    states: u8,
    cells: Box<[CellState]>,
}

/// Storage reserved up front for one [`Snapshot`].
///
/// Filling a buffer obtained from [`Lattice::reserve_snapshot`] never
/// allocates, so it cannot fail.
///
/// [`Lattice::reserve_snapshot`]: crate::Lattice::reserve_snapshot
#[derive(Debug)]
pub struct SnapshotBuffer {
    cells: Vec<CellState>,
}

impl SnapshotBuffer {
    pub(crate) fn reserve(volume: usize) -> Result<Self, LatticeError> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(volume)
            .map_err(|e| LatticeError::Allocation {
                cells: volume,
                reason: e.to_string(),
            })?;
        Ok(Self { cells })
    }

    pub(crate) fn fill(mut self, source: &[CellState]) -> Box<[CellState]> {
        self.cells.extend_from_slice(source);
        self.cells.into_boxed_slice()
    }
}

impl Snapshot {
    pub(crate) const fn new(
        dimensions: Dimensions,
        boundary: BoundaryMode,
        states: u8,
        cells: Box<[CellState]>,
    ) -> Self {
        Self {
            dimensions,
            boundary,
            states,
            cells,
        }
    }

    /// Lattice dimensions.
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Boundary policy of the source lattice.
    pub const fn boundary(&self) -> BoundaryMode {
        self.boundary
    }

    /// Alphabet size.
    pub const fn states(&self) -> u8 {
        self.states
    }

    /// Cells in index order.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Number of cells.
    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    /// Number of non-dead cells.
    pub fn population(&self) -> u64 {
        let alive = self.cells.iter().filter(|c| !c.is_dead()).count();
        u64::try_from(alive).unwrap_or(u64::MAX)
    }

    /// State at a coordinate, with the same boundary policy as the source
    /// lattice.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::IndexOutOfRange`] for an out-of-range
    /// coordinate under clamped boundaries.
    pub fn get(&self, x: i64, y: i64, z: i64) -> Result<CellState, LatticeError> {
        let index = resolve_index(self.dimensions, self.boundary, x, y, z)?;
        self.cells
            .get(index)
            .copied()
            .ok_or(LatticeError::IndexOutOfRange { x, y, z })
    }

    /// Coordinate of a buffer index.
    pub fn coords(&self, index: usize) -> Option<(u32, u32, u32)> {
        coords_of(self.dimensions, index)
    }

    /// Whether two snapshots have identical geometry and alphabet.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.dimensions == other.dimensions && self.states == other.states
    }

    /// A new snapshot with the given changes applied cell by cell.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::IndexOutOfRange`] for a change outside the
    /// lattice, [`LatticeError::InvalidInitialState`] for a state outside
    /// the alphabet, or [`LatticeError::Allocation`] if the copy fails.
    pub fn with_changes(&self, changes: &[ChangedCell]) -> Result<Self, LatticeError> {
        let mut cells = allocate_cells(self.cells.len())?;
        cells.copy_from_slice(&self.cells);
        for change in changes {
            if change.new_state.value() >= self.states {
                return Err(LatticeError::InvalidInitialState(format!(
                    "state {} outside alphabet of {}",
                    change.new_state.value(),
                    self.states
                )));
            }
            let slot = linear_index(self.dimensions, change.x, change.y, change.z)
                .and_then(|i| cells.get_mut(i))
                .ok_or(LatticeError::IndexOutOfRange {
                    x: i64::from(change.x),
                    y: i64::from(change.y),
                    z: i64::from(change.z),
                })?;
            *slot = change.new_state;
        }
        Ok(Self::new(
            self.dimensions,
            self.boundary,
            self.states,
            cells.into_boxed_slice(),
        ))
    }
}
