//! Bit-packed encoding of binary lattices.
//!
//! Cell `i` lives at bit `i % 64` of word `i / 64`. Trailing bits of the
//! last word are zero. The encoding backs export documents and the state
//! digests used for entropy tracking.

use automata_types::CellState;

use crate::error::LatticeError;

/// Bits per packed word.
const WORD_BITS: usize = 64;

/// Number of words needed to pack `volume` cells.
pub const fn packed_len(volume: usize) -> usize {
    volume.div_ceil(WORD_BITS)
}

/// Pack cells into words: any non-dead state becomes a set bit.
pub fn pack(cells: &[CellState]) -> Vec<u64> {
    let mut words = vec![0_u64; packed_len(cells.len())];
    for (word, chunk) in words.iter_mut().zip(cells.chunks(WORD_BITS)) {
        for (bit, cell) in chunk.iter().enumerate() {
            if !cell.is_dead() {
                *word |= 1_u64.checked_shl(u32::try_from(bit).unwrap_or(u32::MAX)).unwrap_or(0);
            }
        }
    }
    words
}

/// Unpack `volume` cells from words produced by [`pack`].
///
/// # Errors
///
/// Returns [`LatticeError::InvalidInitialState`] if the word count does not
/// match the volume.
pub fn unpack(words: &[u64], volume: usize) -> Result<Vec<CellState>, LatticeError> {
    if words.len() != packed_len(volume) {
        return Err(LatticeError::InvalidInitialState(format!(
            "expected {} packed words for {volume} cells, got {}",
            packed_len(volume),
            words.len()
        )));
    }
    let mut cells = Vec::new();
    cells
        .try_reserve_exact(volume)
        .map_err(|e| LatticeError::Allocation {
            cells: volume,
            reason: e.to_string(),
        })?;
    for word in words {
        for bit in 0..64_u32 {
            if cells.len() == volume {
                break;
            }
            let set = word.checked_shr(bit).is_some_and(|w| w & 1 == 1);
            cells.push(if set { CellState::ALIVE } else { CellState::DEAD });
        }
    }
    Ok(cells)
}
