//! Fixed-width packed integer arrays.
//!
//! A `ChunkSet` stores one small unsigned value per cell, packed into 64-bit
//! chunks. A chunk holds `64 / width` cells; the high bits that do not fit a
//! whole cell are left unused so a cell never straddles two chunks.

use crate::error::StoreError;

const CHUNK_BITS: usize = 64;

/// Number of bits needed to store every value in `0..=max`.
pub fn width_for(max: u32) -> usize {
    let bits = (u32::BITS - max.leading_zeros()) as usize;
    bits.max(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSet {
    chunks: Vec<u64>,
    width: usize,
    per_chunk: usize,
    mask: u64,
    len: usize,
}

impl ChunkSet {
    /// A zeroed set of `len` cells able to hold values up to `max`.
    pub fn new(len: usize, max: u32) -> Self {
        let width = width_for(max);
        let per_chunk = CHUNK_BITS / width;
        let num_chunks = len.div_ceil(per_chunk);
        ChunkSet {
            chunks: vec![0; num_chunks],
            width,
            per_chunk,
            mask: (1u64 << width) - 1,
            len,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Largest value a cell can hold.
    #[inline]
    pub fn max_value(&self) -> u32 {
        self.mask as u32
    }

    #[inline]
    fn locate(&self, cell: usize) -> (usize, usize) {
        (cell / self.per_chunk, (cell % self.per_chunk) * self.width)
    }

    fn check_index(&self, cell: usize) -> Result<(), StoreError> {
        if cell >= self.len {
            return Err(StoreError::IndexOutOfRange {
                index: cell,
                len: self.len,
            });
        }
        Ok(())
    }

    pub fn get(&self, cell: usize) -> Result<u32, StoreError> {
        self.check_index(cell)?;
        let (chunk, shift) = self.locate(cell);
        Ok(((self.chunks[chunk] >> shift) & self.mask) as u32)
    }

    /// Writes `value` at `cell` and returns the previous value.
    pub fn set(&mut self, cell: usize, value: u32) -> Result<u32, StoreError> {
        self.check_index(cell)?;
        if u64::from(value) > self.mask {
            return Err(StoreError::BadValue {
                value,
                max: self.max_value(),
            });
        }
        let (chunk, shift) = self.locate(cell);
        let word = &mut self.chunks[chunk];
        let old = ((*word >> shift) & self.mask) as u32;
        *word = (*word & !(self.mask << shift)) | (u64::from(value) << shift);
        Ok(old)
    }

    /// Sets every cell to `value`.
    pub fn fill(&mut self, value: u32) -> Result<(), StoreError> {
        for cell in 0..self.len {
            self.set(cell, value)?;
        }
        Ok(())
    }

    /// Zeroes every cell.
    pub fn clear(&mut self) {
        self.chunks.iter_mut().for_each(|c| *c = 0);
    }

    pub fn num_non_zero_chunks(&self) -> usize {
        self.chunks.iter().filter(|&&c| c != 0).count()
    }

    /// Cells holding a non-zero value, ascending. Zero chunks are skipped
    /// without being expanded.
    pub fn non_zero_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks
            .iter()
            .enumerate()
            .filter(|(_, chunk)| **chunk != 0)
            .flat_map(move |(index, &chunk)| {
                let first = index * self.per_chunk;
                (0..self.per_chunk).filter_map(move |slot| {
                    let cell = first + slot;
                    let value = (chunk >> (slot * self.width)) & self.mask;
                    (value != 0 && cell < self.len).then_some(cell)
                })
            })
    }

    pub fn count_non_zero(&self) -> usize {
        self.non_zero_cells().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_for() {
        assert_eq!(width_for(0), 1);
        assert_eq!(width_for(1), 1);
        assert_eq!(width_for(2), 2);
        assert_eq!(width_for(3), 2);
        assert_eq!(width_for(4), 3);
        assert_eq!(width_for(255), 8);
    }

    #[test]
    fn test_cells_do_not_straddle_chunks() {
        // width 3 -> 21 cells per chunk, one bit left over
        let mut set = ChunkSet::new(50, 5);
        assert_eq!(set.width(), 3);
        set.set(20, 7).unwrap();
        set.set(21, 5).unwrap();
        assert_eq!(set.get(20).unwrap(), 7);
        assert_eq!(set.get(21).unwrap(), 5);
        assert_eq!(set.get(19).unwrap(), 0);
        assert_eq!(set.get(22).unwrap(), 0);
        assert_eq!(set.num_non_zero_chunks(), 2);
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut set = ChunkSet::new(10, 3);
        assert_eq!(set.set(4, 2).unwrap(), 0);
        assert_eq!(set.set(4, 3).unwrap(), 2);
        assert_eq!(set.set(4, 0).unwrap(), 3);
        assert_eq!(set.count_non_zero(), 0);
    }

    #[test]
    fn test_bad_value_rejected() {
        let mut set = ChunkSet::new(10, 2);
        assert_eq!(set.set(0, 4), Err(StoreError::BadValue { value: 4, max: 3 }));
        assert_eq!(set.get(0).unwrap(), 0);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut set = ChunkSet::new(10, 2);
        assert_eq!(
            set.get(10),
            Err(StoreError::IndexOutOfRange { index: 10, len: 10 })
        );
        assert!(set.set(11, 1).is_err());
    }

    #[test]
    fn test_non_zero_cells_in_order() {
        let mut set = ChunkSet::new(200, 1);
        for cell in [3, 64, 65, 130, 199] {
            set.set(cell, 1).unwrap();
        }
        let cells: Vec<usize> = set.non_zero_cells().collect();
        assert_eq!(cells, vec![3, 64, 65, 130, 199]);
        // 3 | 64, 65 | 130 | 199
        assert_eq!(set.num_non_zero_chunks(), 4);
    }

    #[test]
    fn test_fill_stops_at_len() {
        let mut set = ChunkSet::new(5, 1);
        set.fill(1).unwrap();
        assert_eq!(set.count_non_zero(), 5);
        set.clear();
        assert_eq!(set.count_non_zero(), 0);
    }
}
