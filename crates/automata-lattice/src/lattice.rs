//! The dense 3D grid of cell states.
//!
//! Cells are stored in one contiguous buffer indexed by
//! `x + y*dimX + z*dimX*dimY`. The buffer length always equals the volume
//! and dimensions never change after construction.

use automata_types::{
    BoundaryMode, CellAssignment, CellState, Dimensions, InitialStateSource, MAX_STATES,
    Neighborhood,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::LatticeError;
use crate::neighborhood::{NeighborSummary, offsets};
use crate::packed::{pack, unpack};
use crate::snapshot::{Snapshot, SnapshotBuffer};

/// Validate requested extents and turn them into [`Dimensions`].
///
/// Every extent must be positive and fit in `u32`, the volume must be
/// addressable as `usize`, and it must not exceed `max_cells`.
///
/// # Errors
///
/// Returns [`LatticeError::InvalidDimensions`] describing the first
/// violated constraint.
pub fn validate_dimensions(
    x: i64,
    y: i64,
    z: i64,
    max_cells: usize,
) -> Result<Dimensions, LatticeError> {
    let reject = |reason: &str| LatticeError::InvalidDimensions {
        x,
        y,
        z,
        reason: reason.to_owned(),
    };

    if x <= 0 || y <= 0 || z <= 0 {
        return Err(reject("every dimension must be positive"));
    }
    let (Ok(dx), Ok(dy), Ok(dz)) = (u32::try_from(x), u32::try_from(y), u32::try_from(z)) else {
        return Err(reject("dimension exceeds u32 range"));
    };
    let dimensions = Dimensions::new(dx, dy, dz);
    let volume = dimensions
        .volume()
        .ok_or_else(|| reject("volume overflows the addressable index range"))?;
    if volume > max_cells {
        return Err(reject(&format!(
            "volume {volume} exceeds the configured limit of {max_cells} cells"
        )));
    }
    Ok(dimensions)
}

/// Allocate a dead-filled cell buffer, reporting allocation failure
/// instead of aborting.
pub(crate) fn allocate_cells(volume: usize) -> Result<Vec<CellState>, LatticeError> {
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(volume)
        .map_err(|e| LatticeError::Allocation {
            cells: volume,
            reason: e.to_string(),
        })?;
    cells.resize(volume, CellState::DEAD);
    Ok(cells)
}

fn checked_volume(dimensions: Dimensions) -> Result<usize, LatticeError> {
    dimensions
        .volume()
        .filter(|v| *v > 0)
        .ok_or_else(|| LatticeError::InvalidDimensions {
            x: i64::from(dimensions.x),
            y: i64::from(dimensions.y),
            z: i64::from(dimensions.z),
            reason: String::from("volume must be positive and addressable"),
        })
}

fn check_alphabet(states: u8) -> Result<(), LatticeError> {
    if (2..=MAX_STATES).contains(&states) {
        Ok(())
    } else {
        Err(LatticeError::InvalidInitialState(format!(
            "alphabet size {states} outside [2, {MAX_STATES}]"
        )))
    }
}

/// Map a signed coordinate triple onto a buffer index under the given
/// boundary policy.
pub(crate) fn resolve_index(
    dimensions: Dimensions,
    boundary: BoundaryMode,
    x: i64,
    y: i64,
    z: i64,
) -> Result<usize, LatticeError> {
    let out_of_range = || LatticeError::IndexOutOfRange { x, y, z };
    let axis = |c: i64, extent: u32| -> Option<u32> {
        match boundary {
            BoundaryMode::Clamped => u32::try_from(c).ok().filter(|v| *v < extent),
            BoundaryMode::Wrapped => c
                .checked_rem_euclid(i64::from(extent))
                .and_then(|v| u32::try_from(v).ok()),
        }
    };
    let cx = axis(x, dimensions.x).ok_or_else(out_of_range)?;
    let cy = axis(y, dimensions.y).ok_or_else(out_of_range)?;
    let cz = axis(z, dimensions.z).ok_or_else(out_of_range)?;
    linear_index(dimensions, cx, cy, cz).ok_or_else(out_of_range)
}

/// `x + y*dimX + z*dimX*dimY`, or `None` if the coordinate is outside.
pub(crate) fn linear_index(dimensions: Dimensions, x: u32, y: u32, z: u32) -> Option<usize> {
    if x >= dimensions.x || y >= dimensions.y || z >= dimensions.z {
        return None;
    }
    let dx = usize::try_from(dimensions.x).ok()?;
    let dy = usize::try_from(dimensions.y).ok()?;
    let plane = dx.checked_mul(dy)?;
    usize::try_from(z)
        .ok()?
        .checked_mul(plane)?
        .checked_add(usize::try_from(y).ok()?.checked_mul(dx)?)?
        .checked_add(usize::try_from(x).ok()?)
}

/// Inverse of [`linear_index`].
pub(crate) fn coords_of(dimensions: Dimensions, index: usize) -> Option<(u32, u32, u32)> {
    let dx = usize::try_from(dimensions.x).ok()?;
    let dy = usize::try_from(dimensions.y).ok()?;
    let x = index.checked_rem(dx)?;
    let rest = index.checked_div(dx)?;
    let y = rest.checked_rem(dy)?;
    let z = rest.checked_div(dy)?;
    if z >= usize::try_from(dimensions.z).ok()? {
        return None;
    }
    Some((
        u32::try_from(x).ok()?,
        u32::try_from(y).ok()?,
        u32::try_from(z).ok()?,
    ))
}

/// Move one step along an axis, honouring the boundary policy.
fn step_axis(coord: u32, delta: i8, extent: u32, boundary: BoundaryMode) -> Option<u32> {
    let target = i64::from(coord).checked_add(i64::from(delta))?;
    match boundary {
        BoundaryMode::Clamped => u32::try_from(target).ok().filter(|t| *t < extent),
        BoundaryMode::Wrapped => target
            .checked_rem_euclid(i64::from(extent))
            .and_then(|t| u32::try_from(t).ok()),
    }
}

/// A 3D lattice of cell states with a fixed boundary policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    dimensions: Dimensions,
    boundary: BoundaryMode,
    states: u8,
    cells: Vec<CellState>,
}

impl Lattice {
    /// Create an all-dead lattice.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidDimensions`] for an empty or
    /// unaddressable volume, [`LatticeError::InvalidInitialState`] for an
    /// alphabet outside `[2, MAX_STATES]`, and [`LatticeError::Allocation`]
    /// if the buffer cannot be allocated.
    pub fn new(
        dimensions: Dimensions,
        boundary: BoundaryMode,
        states: u8,
    ) -> Result<Self, LatticeError> {
        let volume = checked_volume(dimensions)?;
        check_alphabet(states)?;
        Ok(Self {
            dimensions,
            boundary,
            states,
            cells: allocate_cells(volume)?,
        })
    }

    /// Create a lattice populated from an initial state source.
    ///
    /// Explicit assignments are validated against the lattice (no
    /// wrapping) and the alphabet. A random fill with density `0` yields
    /// an all-dead lattice and density `1` an all-alive one.
    ///
    /// # Errors
    ///
    /// Everything [`Lattice::new`] returns, plus
    /// [`LatticeError::IndexOutOfRange`] for an assignment outside the
    /// lattice and [`LatticeError::InvalidInitialState`] for a bad density
    /// or state.
    pub fn from_source(
        dimensions: Dimensions,
        boundary: BoundaryMode,
        states: u8,
        source: &InitialStateSource,
    ) -> Result<Self, LatticeError> {
        let mut lattice = Self::new(dimensions, boundary, states)?;
        match source {
            InitialStateSource::Empty => {}
            InitialStateSource::Cells { cells } => lattice.assign(cells)?,
            InitialStateSource::Random { density, seed } => lattice.fill_random(*density, *seed)?,
        }
        debug!(
            %dimensions,
            population = lattice.population(),
            "Lattice initialized"
        );
        Ok(lattice)
    }

    /// Rebuild a lattice from a raw cell buffer in index order.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidInitialState`] if the buffer length
    /// does not match the volume or a state lies outside the alphabet.
    pub fn from_cells(
        dimensions: Dimensions,
        boundary: BoundaryMode,
        states: u8,
        cells: Vec<CellState>,
    ) -> Result<Self, LatticeError> {
        let expected = checked_volume(dimensions)?;
        check_alphabet(states)?;
        if cells.len() != expected {
            return Err(LatticeError::InvalidInitialState(format!(
                "expected {expected} cells, got {}",
                cells.len()
            )));
        }
        if let Some(bad) = cells.iter().find(|c| c.value() >= states) {
            return Err(LatticeError::InvalidInitialState(format!(
                "state {} outside alphabet of {states}",
                bad.value()
            )));
        }
        Ok(Self {
            dimensions,
            boundary,
            states,
            cells,
        })
    }

    fn assign(&mut self, assignments: &[CellAssignment]) -> Result<(), LatticeError> {
        for cell in assignments {
            if cell.state.value() >= self.states {
                return Err(LatticeError::InvalidInitialState(format!(
                    "state {} outside alphabet of {}",
                    cell.state.value(),
                    self.states
                )));
            }
            let index = linear_index(self.dimensions, cell.x, cell.y, cell.z).ok_or(
                LatticeError::IndexOutOfRange {
                    x: i64::from(cell.x),
                    y: i64::from(cell.y),
                    z: i64::from(cell.z),
                },
            )?;
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = cell.state;
            }
        }
        Ok(())
    }

    fn fill_random(&mut self, density: f64, seed: u64) -> Result<(), LatticeError> {
        if !density.is_finite() || !(0.0..=1.0).contains(&density) {
            return Err(LatticeError::InvalidInitialState(format!(
                "density {density} outside [0, 1]"
            )));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        for cell in &mut self.cells {
            *cell = if rng.random_bool(density) {
                CellState::ALIVE
            } else {
                CellState::DEAD
            };
        }
        Ok(())
    }

    /// Lattice dimensions.
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Boundary policy.
    pub const fn boundary(&self) -> BoundaryMode {
        self.boundary
    }

    /// Alphabet size.
    pub const fn states(&self) -> u8 {
        self.states
    }

    /// Number of cells.
    pub fn volume(&self) -> usize {
        self.cells.len()
    }

    /// Read-only view of the cell buffer in index order.
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Mutable view of the cell buffer. Used by the generation engine to
    /// write its scratch buffer; the length cannot change through it.
    pub fn cells_mut(&mut self) -> &mut [CellState] {
        &mut self.cells
    }

    /// Buffer index of an in-range coordinate.
    pub fn index(&self, x: u32, y: u32, z: u32) -> Option<usize> {
        linear_index(self.dimensions, x, y, z)
    }

    /// Coordinate of a buffer index.
    pub fn coords(&self, index: usize) -> Option<(u32, u32, u32)> {
        coords_of(self.dimensions, index)
    }

    /// State at a coordinate.
    ///
    /// Under [`BoundaryMode::Wrapped`] coordinates are reduced modulo the
    /// extent and never fail.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::IndexOutOfRange`] for an out-of-range
    /// coordinate under [`BoundaryMode::Clamped`].
    pub fn get(&self, x: i64, y: i64, z: i64) -> Result<CellState, LatticeError> {
        let index = resolve_index(self.dimensions, self.boundary, x, y, z)?;
        self.cells
            .get(index)
            .copied()
            .ok_or(LatticeError::IndexOutOfRange { x, y, z })
    }

    /// Neighbor summary of an in-range cell.
    ///
    /// Clamped lattices skip neighbors that fall outside, so edge cells have
    /// fewer. Wrapped lattices always visit every offset of the
    /// neighborhood; on extents below 3 the same cell can be visited more
    /// than once and is counted each time.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::IndexOutOfRange`] if the center cell itself
    /// is outside the lattice.
    pub fn neighbor_summary(
        &self,
        x: i64,
        y: i64,
        z: i64,
        neighborhood: Neighborhood,
    ) -> Result<NeighborSummary, LatticeError> {
        let index = resolve_index(self.dimensions, self.boundary, x, y, z)?;
        let (cx, cy, cz) =
            coords_of(self.dimensions, index).ok_or(LatticeError::IndexOutOfRange { x, y, z })?;
        Ok(self.summary_at(cx, cy, cz, neighborhood))
    }

    /// Neighbor summary without validating the center coordinate.
    ///
    /// Hot path of the generation engine, which only passes coordinates it
    /// derived from valid indices.
    pub fn summary_at(&self, x: u32, y: u32, z: u32, neighborhood: Neighborhood) -> NeighborSummary {
        let mut summary = NeighborSummary::default();
        let d = self.dimensions;
        for &(dx, dy, dz) in offsets(neighborhood) {
            let neighbor = step_axis(x, dx, d.x, self.boundary).and_then(|nx| {
                let ny = step_axis(y, dy, d.y, self.boundary)?;
                let nz = step_axis(z, dz, d.z, self.boundary)?;
                linear_index(d, nx, ny, nz)
            });
            if let Some(state) = neighbor.and_then(|i| self.cells.get(i)) {
                summary.record(*state);
            }
        }
        summary
    }

    /// Number of non-dead cells.
    pub fn population(&self) -> u64 {
        let alive = self.cells.iter().filter(|c| !c.is_dead()).count();
        u64::try_from(alive).unwrap_or(u64::MAX)
    }

    /// Immutable copy of the current cells.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::Allocation`] if the copy cannot be allocated.
    pub fn snapshot(&self) -> Result<Snapshot, LatticeError> {
        Ok(self.snapshot_into(self.reserve_snapshot()?))
    }

    /// Reserve room for a later [`Lattice::snapshot_into`].
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::Allocation`] if the storage cannot be
    /// reserved.
    pub fn reserve_snapshot(&self) -> Result<SnapshotBuffer, LatticeError> {
        SnapshotBuffer::reserve(self.cells.len())
    }

    /// Copy the current cells into storage reserved for a lattice of this
    /// volume.
    pub fn snapshot_into(&self, buffer: SnapshotBuffer) -> Snapshot {
        Snapshot::new(
            self.dimensions,
            self.boundary,
            self.states,
            buffer.fill(&self.cells),
        )
    }

    /// Overwrite every cell with the contents of `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidInitialState`] if the snapshot's
    /// geometry, boundary or alphabet differ from this lattice's. The
    /// lattice is untouched in that case.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), LatticeError> {
        if snapshot.dimensions() != self.dimensions
            || snapshot.boundary() != self.boundary
            || snapshot.states() != self.states
            || snapshot.cells().len() != self.cells.len()
        {
            return Err(LatticeError::InvalidInitialState(String::from(
                "snapshot does not match the lattice it restores",
            )));
        }
        self.cells.copy_from_slice(snapshot.cells());
        Ok(())
    }

    /// One bit per cell, or `None` for alphabets wider than two states.
    pub fn to_packed_words(&self) -> Option<Vec<u64>> {
        (self.states == 2).then(|| pack(&self.cells))
    }

    /// Rebuild a binary lattice from packed words.
    ///
    /// # Errors
    ///
    /// Returns [`LatticeError::InvalidDimensions`] for an empty volume and
    /// [`LatticeError::InvalidInitialState`] if the word count does not
    /// match it.
    pub fn from_packed_words(
        dimensions: Dimensions,
        boundary: BoundaryMode,
        words: &[u64],
    ) -> Result<Self, LatticeError> {
        let volume = checked_volume(dimensions)?;
        let cells = unpack(words, volume)?;
        Self::from_cells(dimensions, boundary, 2, cells)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const UNLIMITED: usize = usize::MAX;

    fn cube(n: u32, boundary: BoundaryMode) -> Lattice {
        Lattice::new(Dimensions::new(n, n, n), boundary, 2).unwrap()
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        for (x, y, z) in [(0, 3, 3), (3, -1, 3), (3, 3, 0)] {
            let err = validate_dimensions(x, y, z, UNLIMITED).unwrap_err();
            assert_eq!(err.kind(), automata_types::ErrorKind::InvalidDimensions);
        }
    }

    #[test]
    fn rejects_overflowing_volume() {
        let big = i64::from(u32::MAX);
        assert!(validate_dimensions(big, big, big, UNLIMITED).is_err());
    }

    #[test]
    fn rejects_volume_above_limit() {
        assert!(validate_dimensions(10, 10, 10, 999).is_err());
        assert!(validate_dimensions(10, 10, 10, 1000).is_ok());
    }

    #[test]
    fn buffer_length_matches_volume() {
        let lattice = Lattice::new(Dimensions::new(3, 4, 5), BoundaryMode::Clamped, 2).unwrap();
        assert_eq!(lattice.volume(), 60);
        assert_eq!(lattice.population(), 0);
    }

    #[test]
    fn index_formula_and_inverse() {
        let lattice = Lattice::new(Dimensions::new(4, 3, 2), BoundaryMode::Clamped, 2).unwrap();
        assert_eq!(lattice.index(0, 0, 0), Some(0));
        assert_eq!(lattice.index(1, 0, 0), Some(1));
        assert_eq!(lattice.index(0, 1, 0), Some(4));
        assert_eq!(lattice.index(0, 0, 1), Some(12));
        assert_eq!(lattice.index(3, 2, 1), Some(23));
        assert_eq!(lattice.index(4, 0, 0), None);
        for i in 0..lattice.volume() {
            let (x, y, z) = lattice.coords(i).unwrap();
            assert_eq!(lattice.index(x, y, z), Some(i));
        }
        assert_eq!(lattice.coords(24), None);
    }

    #[test]
    fn clamped_get_rejects_out_of_range() {
        let lattice = cube(3, BoundaryMode::Clamped);
        assert!(lattice.get(2, 2, 2).is_ok());
        let err = lattice.get(3, 0, 0).unwrap_err();
        assert_eq!(err.kind(), automata_types::ErrorKind::IndexOutOfRange);
        assert!(lattice.get(-1, 0, 0).is_err());
    }

    #[test]
    fn wrapped_get_reduces_modulo() {
        let cells = InitialStateSource::Cells {
            cells: vec![CellAssignment {
                x: 0,
                y: 0,
                z: 0,
                state: CellState::ALIVE,
            }],
        };
        let lattice = Lattice::from_source(
            Dimensions::new(3, 3, 3),
            BoundaryMode::Wrapped,
            2,
            &cells,
        )
        .unwrap();
        assert_eq!(lattice.get(3, -3, 6).unwrap(), CellState::ALIVE);
        assert_eq!(lattice.get(-1, 0, 0).unwrap(), CellState::DEAD);
    }

    #[test]
    fn explicit_assignment_out_of_range_fails() {
        let cells = InitialStateSource::Cells {
            cells: vec![CellAssignment {
                x: 5,
                y: 0,
                z: 0,
                state: CellState::ALIVE,
            }],
        };
        let err = Lattice::from_source(Dimensions::new(3, 3, 3), BoundaryMode::Wrapped, 2, &cells)
            .unwrap_err();
        assert_eq!(err.kind(), automata_types::ErrorKind::IndexOutOfRange);
    }

    #[test]
    fn explicit_assignment_outside_alphabet_fails() {
        let cells = InitialStateSource::Cells {
            cells: vec![CellAssignment {
                x: 0,
                y: 0,
                z: 0,
                state: CellState(2),
            }],
        };
        let err = Lattice::from_source(Dimensions::new(3, 3, 3), BoundaryMode::Clamped, 2, &cells)
            .unwrap_err();
        assert_eq!(err.kind(), automata_types::ErrorKind::InvalidInitialState);
    }

    #[test]
    fn random_fill_extremes() {
        let dims = Dimensions::new(4, 4, 4);
        let empty = Lattice::from_source(
            dims,
            BoundaryMode::Clamped,
            2,
            &InitialStateSource::Random {
                density: 0.0,
                seed: 9,
            },
        )
        .unwrap();
        assert_eq!(empty.population(), 0);

        let full = Lattice::from_source(
            dims,
            BoundaryMode::Clamped,
            2,
            &InitialStateSource::Random {
                density: 1.0,
                seed: 9,
            },
        )
        .unwrap();
        assert_eq!(full.population(), 64);
    }

    #[test]
    fn random_fill_is_reproducible() {
        let dims = Dimensions::new(8, 8, 8);
        let source = InitialStateSource::Random {
            density: 0.3,
            seed: 42,
        };
        let a = Lattice::from_source(dims, BoundaryMode::Wrapped, 2, &source).unwrap();
        let b = Lattice::from_source(dims, BoundaryMode::Wrapped, 2, &source).unwrap();
        assert_eq!(a, b);
        assert!(a.population() > 0 && a.population() < 512);
    }

    #[test]
    fn random_fill_rejects_bad_density() {
        for density in [-0.1, 1.5, f64::NAN] {
            let err = Lattice::from_source(
                Dimensions::new(2, 2, 2),
                BoundaryMode::Clamped,
                2,
                &InitialStateSource::Random { density, seed: 1 },
            )
            .unwrap_err();
            assert_eq!(err.kind(), automata_types::ErrorKind::InvalidInitialState);
        }
    }

    #[test]
    fn wrapped_cells_have_full_neighborhoods() {
        let lattice = cube(4, BoundaryMode::Wrapped);
        for nb in [Neighborhood::Moore, Neighborhood::VonNeumann] {
            for i in 0..lattice.volume() {
                let (x, y, z) = lattice.coords(i).unwrap();
                let summary = lattice.summary_at(x, y, z, nb);
                assert_eq!(summary.present(), nb.size());
            }
        }
    }

    #[test]
    fn clamped_corners_have_fewer_neighbors() {
        let lattice = cube(4, BoundaryMode::Clamped);
        let corner = lattice.neighbor_summary(0, 0, 0, Neighborhood::Moore).unwrap();
        assert_eq!(corner.present(), 7);
        let corner_vn = lattice
            .neighbor_summary(3, 3, 3, Neighborhood::VonNeumann)
            .unwrap();
        assert_eq!(corner_vn.present(), 3);
        let interior = lattice.neighbor_summary(1, 1, 1, Neighborhood::Moore).unwrap();
        assert_eq!(interior.present(), 26);
    }

    #[test]
    fn neighbor_counts_alive_cells() {
        let cells = InitialStateSource::Cells {
            cells: vec![
                CellAssignment { x: 1, y: 1, z: 1, state: CellState::ALIVE },
                CellAssignment { x: 0, y: 1, z: 1, state: CellState::ALIVE },
                CellAssignment { x: 2, y: 2, z: 2, state: CellState::ALIVE },
            ],
        };
        let lattice =
            Lattice::from_source(Dimensions::new(5, 5, 5), BoundaryMode::Clamped, 2, &cells)
                .unwrap();
        let moore = lattice.neighbor_summary(1, 1, 1, Neighborhood::Moore).unwrap();
        assert_eq!(moore.alive(), 2);
        let vn = lattice
            .neighbor_summary(1, 1, 1, Neighborhood::VonNeumann)
            .unwrap();
        assert_eq!(vn.alive(), 1);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut lattice = cube(2, BoundaryMode::Clamped);
        let before = lattice.snapshot().unwrap();
        if let Some(cell) = lattice.cells_mut().first_mut() {
            *cell = CellState::ALIVE;
        }
        assert_eq!(before.population(), 0);
        assert_eq!(lattice.population(), 1);
    }

    #[test]
    fn reserved_snapshot_reflects_cells_at_fill_time() {
        let mut lattice = cube(2, BoundaryMode::Clamped);
        let buffer = lattice.reserve_snapshot().unwrap();
        if let Some(cell) = lattice.cells_mut().last_mut() {
            *cell = CellState::ALIVE;
        }
        let snapshot = lattice.snapshot_into(buffer);
        assert_eq!(snapshot.population(), 1);
        assert_eq!(snapshot.cells(), lattice.cells());
    }

    #[test]
    fn restore_overwrites_cells_from_matching_snapshot() {
        let mut lattice = cube(3, BoundaryMode::Wrapped);
        let saved = lattice.snapshot().unwrap();
        for cell in lattice.cells_mut().iter_mut().step_by(2) {
            *cell = CellState::ALIVE;
        }
        lattice.restore(&saved).unwrap();
        assert_eq!(lattice.population(), 0);

        let other = cube(3, BoundaryMode::Clamped).snapshot().unwrap();
        assert!(lattice.restore(&other).is_err());
        let smaller = cube(2, BoundaryMode::Wrapped).snapshot().unwrap();
        assert!(lattice.restore(&smaller).is_err());
    }

    #[test]
    fn from_cells_validates_length_and_alphabet() {
        let dims = Dimensions::new(2, 2, 2);
        assert!(Lattice::from_cells(dims, BoundaryMode::Clamped, 2, vec![CellState::DEAD; 7]).is_err());
        assert!(Lattice::from_cells(dims, BoundaryMode::Clamped, 2, vec![CellState(3); 8]).is_err());
        assert!(Lattice::from_cells(dims, BoundaryMode::Clamped, 4, vec![CellState(3); 8]).is_ok());
    }

    #[test]
    fn packed_words_round_trip_binary_only() {
        let source = InitialStateSource::Random {
            density: 0.3,
            seed: 9,
        };
        let dims = Dimensions::new(5, 4, 7);
        let lattice = Lattice::from_source(dims, BoundaryMode::Wrapped, 2, &source).unwrap();
        let words = lattice.to_packed_words().unwrap();
        assert_eq!(words.len(), 3);
        let restored = Lattice::from_packed_words(dims, BoundaryMode::Wrapped, &words).unwrap();
        assert_eq!(restored, lattice);

        let wide = Lattice::new(dims, BoundaryMode::Wrapped, 5).unwrap();
        assert!(wide.to_packed_words().is_none());
    }
}
