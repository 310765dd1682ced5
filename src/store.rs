//! Per-container packed state.
//!
//! A flat container keeps six parallel slices (who, what, count, state,
//! rotation, value), each a `ChunkSet` with its own Zobrist basis. The board
//! additionally keeps a hashed `playable` bit set and an `empty` bit vector
//! that mirrors the `what` slice.

use serde::{Deserialize, Serialize};

use crate::chunks::ChunkSet;
use crate::error::StoreError;
use crate::zobrist::{Zobrist, derive_seed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slice {
    Who,
    What,
    Count,
    State,
    Rotation,
    Value,
}

impl Slice {
    pub const ALL: [Slice; 6] = [
        Slice::Who,
        Slice::What,
        Slice::Count,
        Slice::State,
        Slice::Rotation,
        Slice::Value,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Basis slot used by the playable set, after the six value slices.
const PLAYABLE_SLOT: usize = Slice::ALL.len();

/// Largest value each slice must hold. Widths are derived from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceLimits {
    pub who: u32,
    pub what: u32,
    pub count: u32,
    pub state: u32,
    pub rotation: u32,
    pub value: u32,
}

impl SliceLimits {
    pub fn max(&self, slice: Slice) -> u32 {
        match slice {
            Slice::Who => self.who,
            Slice::What => self.what,
            Slice::Count => self.count,
            Slice::State => self.state,
            Slice::Rotation => self.rotation,
            Slice::Value => self.value,
        }
    }
}

/// A chunk set carrying a running Zobrist hash of its contents.
#[derive(Debug, Clone)]
pub struct HashedChunkSet {
    chunks: ChunkSet,
    zobrist: Zobrist,
    hash: u64,
}

impl HashedChunkSet {
    pub fn new(len: usize, max: u32, seed: u64) -> Self {
        let chunks = ChunkSet::new(len, max);
        let stride = chunks.max_value() as usize + 1;
        HashedChunkSet {
            zobrist: Zobrist::new(seed, len, stride),
            chunks,
            hash: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, cell: usize) -> Result<u32, StoreError> {
        self.chunks.get(cell)
    }

    pub fn set(&mut self, cell: usize, value: u32) -> Result<u32, StoreError> {
        let old = self.chunks.set(cell, value)?;
        self.hash ^= self.zobrist.key(cell, old) ^ self.zobrist.key(cell, value);
        Ok(old)
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Hash folded from scratch over the current non-zero cells.
    pub fn folded_hash(&self) -> u64 {
        self.chunks.non_zero_cells().fold(0, |acc, cell| {
            let value = self.chunks.get(cell).unwrap_or(0);
            acc ^ self.zobrist.key(cell, value)
        })
    }

    pub fn non_zero_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks.non_zero_cells()
    }

    /// Empty set of `len` cells with the same width and basis seed.
    pub fn reallocate(&self, len: usize) -> Self {
        HashedChunkSet {
            chunks: ChunkSet::new(len, self.chunks.max_value()),
            zobrist: self.zobrist.resized(len),
            hash: 0,
        }
    }
}

/// One bit per cell with a running hash.
#[derive(Debug, Clone)]
pub struct HashedBitSet {
    bits: HashedChunkSet,
}

impl HashedBitSet {
    pub fn new(len: usize, seed: u64) -> Self {
        HashedBitSet {
            bits: HashedChunkSet::new(len, 1, seed),
        }
    }

    pub fn get(&self, cell: usize) -> Result<bool, StoreError> {
        Ok(self.bits.get(cell)? != 0)
    }

    pub fn set(&mut self, cell: usize, on: bool) -> Result<bool, StoreError> {
        Ok(self.bits.set(cell, u32::from(on))? != 0)
    }

    pub fn hash(&self) -> u64 {
        self.bits.hash()
    }

    pub fn cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.non_zero_cells()
    }

    pub fn reallocate(&self, len: usize) -> Self {
        HashedBitSet {
            bits: self.bits.reallocate(len),
        }
    }
}

/// Bit vector of `len` ones.
fn all_set(len: usize) -> ChunkSet {
    let mut set = ChunkSet::new(len, 1);
    // a 1-bit set always accepts 1
    let _ = set.fill(1);
    set
}

/// Flat packed state of one container.
#[derive(Debug, Clone)]
pub struct FlatStore {
    container: usize,
    limits: SliceLimits,
    slices: Vec<HashedChunkSet>,
    playable: Option<HashedBitSet>,
    empty: Option<ChunkSet>,
}

impl FlatStore {
    /// A zeroed store. `board` enables the playable and empty sets; fixed
    /// size containers such as hands leave both unused.
    pub fn new(container: usize, len: usize, limits: SliceLimits, seed: u64, board: bool) -> Self {
        let slices = Slice::ALL
            .iter()
            .map(|&slice| {
                let slot_seed = derive_seed(seed, container, slice.index());
                HashedChunkSet::new(len, limits.max(slice), slot_seed)
            })
            .collect();

        let (playable, empty) = if board {
            let empty = all_set(len);
            let playable = HashedBitSet::new(len, derive_seed(seed, container, PLAYABLE_SLOT));
            (Some(playable), Some(empty))
        } else {
            (None, None)
        };

        FlatStore {
            container,
            limits,
            slices,
            playable,
            empty,
        }
    }

    pub fn container(&self) -> usize {
        self.container
    }

    pub fn len(&self) -> usize {
        self.slices[Slice::Who.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn limits(&self) -> SliceLimits {
        self.limits
    }

    pub fn get(&self, slice: Slice, cell: usize) -> Result<u32, StoreError> {
        self.slices[slice.index()].get(cell)
    }

    /// Writes one slice value, updating its hash, and returns the old value.
    pub fn set(&mut self, slice: Slice, cell: usize, value: u32) -> Result<u32, StoreError> {
        let old = self.slices[slice.index()].set(cell, value)?;
        if slice == Slice::What {
            if let Some(empty) = self.empty.as_mut() {
                empty.set(cell, u32::from(value == 0))?;
            }
        }
        Ok(old)
    }

    pub fn who(&self, cell: usize) -> Result<u32, StoreError> {
        self.get(Slice::Who, cell)
    }

    pub fn what(&self, cell: usize) -> Result<u32, StoreError> {
        self.get(Slice::What, cell)
    }

    pub fn count(&self, cell: usize) -> Result<u32, StoreError> {
        self.get(Slice::Count, cell)
    }

    /// Puts `count` pieces of kind `what` owned by `who` on `cell`.
    pub fn place(&mut self, cell: usize, who: u32, what: u32, count: u32) -> Result<(), StoreError> {
        self.set(Slice::Who, cell, who)?;
        self.set(Slice::What, cell, what)?;
        self.set(Slice::Count, cell, count)?;
        Ok(())
    }

    /// Zeroes every slice at `cell`.
    pub fn clear_cell(&mut self, cell: usize) -> Result<(), StoreError> {
        for slice in Slice::ALL {
            self.set(slice, cell, 0)?;
        }
        Ok(())
    }

    pub fn is_empty_cell(&self, cell: usize) -> Result<bool, StoreError> {
        match &self.empty {
            Some(empty) => Ok(empty.get(cell)? != 0),
            None => Ok(self.what(cell)? == 0),
        }
    }

    /// Board cells with no piece. Always empty for hand containers.
    pub fn empty_cells(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match &self.empty {
            Some(empty) => Box::new(empty.non_zero_cells()),
            None => Box::new(std::iter::empty()),
        }
    }

    pub fn is_playable(&self, cell: usize) -> Result<bool, StoreError> {
        match &self.playable {
            Some(playable) => playable.get(cell),
            None => Ok(false),
        }
    }

    pub fn set_playable(&mut self, cell: usize, on: bool) -> Result<(), StoreError> {
        if let Some(playable) = self.playable.as_mut() {
            playable.set(cell, on)?;
        }
        Ok(())
    }

    pub fn playable_cells(&self) -> Box<dyn Iterator<Item = usize> + '_> {
        match &self.playable {
            Some(playable) => Box::new(playable.cells()),
            None => Box::new(std::iter::empty()),
        }
    }

    pub fn non_zero_cells(&self, slice: Slice) -> impl Iterator<Item = usize> + '_ {
        self.slices[slice.index()].non_zero_cells()
    }

    /// Hash of the piece slices only.
    pub fn pieces_hash(&self) -> u64 {
        self.slices.iter().fold(0, |acc, s| acc ^ s.hash())
    }

    /// Hash of the piece slices and the playable set.
    pub fn hash(&self) -> u64 {
        let playable = self.playable.as_ref().map_or(0, HashedBitSet::hash);
        self.pieces_hash() ^ playable
    }

    /// Piece hash recomputed from scratch, for checking the running hash.
    pub fn folded_pieces_hash(&self) -> u64 {
        self.slices.iter().fold(0, |acc, s| acc ^ s.folded_hash())
    }

    /// Empty store of `len` cells with the same widths and basis seeds.
    pub fn reallocate(&self, len: usize) -> FlatStore {
        let empty = self.empty.as_ref().map(|_| all_set(len));
        FlatStore {
            container: self.container,
            limits: self.limits,
            slices: self.slices.iter().map(|s| s.reallocate(len)).collect(),
            playable: self.playable.as_ref().map(|p| p.reallocate(len)),
            empty,
        }
    }

    /// Zeroes the whole store, keeping its size and basis.
    pub fn reset(&mut self) {
        *self = self.reallocate(self.len());
    }

    /// Copies every non-zero cell of `self` into `dst` at `map(cell)`.
    ///
    /// Cells without an image are dropped. Two source cells landing on the
    /// same destination cell fail with `NonInjectiveMap`. Every write goes
    /// through `set`, so the destination hashes come out equal to a store
    /// built from zero with the same contents.
    pub fn copy_through<F>(&self, dst: &mut FlatStore, map: F) -> Result<(), StoreError>
    where
        F: Fn(usize) -> Option<usize>,
    {
        for slice in Slice::ALL {
            let src = &self.slices[slice.index()];
            for cell in src.non_zero_cells() {
                let Some(target) = map(cell) else {
                    continue;
                };
                if dst.get(slice, target)? != 0 {
                    return Err(StoreError::NonInjectiveMap { cell: target });
                }
                dst.set(slice, target, src.get(cell)?)?;
            }
        }

        if let (Some(src), Some(_)) = (&self.playable, &dst.playable) {
            for cell in src.cells() {
                if let Some(target) = map(cell) {
                    dst.set_playable(target, true)?;
                }
            }
        }
        Ok(())
    }
}

/// Stacked container state: a pile of (who, what) per cell.
#[derive(Debug, Clone, Default)]
pub struct StackStore {
    stacks: Vec<Vec<(u32, u32)>>,
}

impl StackStore {
    pub fn new(len: usize) -> Self {
        StackStore {
            stacks: vec![Vec::new(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn push(&mut self, cell: usize, who: u32, what: u32) -> Result<(), StoreError> {
        let len = self.stacks.len();
        let stack = self
            .stacks
            .get_mut(cell)
            .ok_or(StoreError::IndexOutOfRange { index: cell, len })?;
        stack.push((who, what));
        Ok(())
    }

    pub fn height(&self, cell: usize) -> usize {
        self.stacks.get(cell).map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone)]
pub enum ContainerState {
    Flat(FlatStore),
    Stacked(StackStore),
}

impl ContainerState {
    pub fn as_flat(&self) -> Option<&FlatStore> {
        match self {
            ContainerState::Flat(store) => Some(store),
            ContainerState::Stacked(_) => None,
        }
    }

    pub fn as_flat_mut(&mut self) -> Option<&mut FlatStore> {
        match self {
            ContainerState::Flat(store) => Some(store),
            ContainerState::Stacked(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ContainerState::Flat(store) => store.len(),
            ContainerState::Stacked(store) => store.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SliceLimits {
        SliceLimits {
            who: 2,
            what: 3,
            count: 3,
            state: 1,
            rotation: 1,
            value: 1,
        }
    }

    #[test]
    fn test_running_hash_matches_fold() {
        let mut store = FlatStore::new(0, 25, limits(), 99, true);
        store.place(3, 1, 2, 1).unwrap();
        store.place(12, 2, 3, 1).unwrap();
        store.place(3, 2, 3, 2).unwrap();
        store.clear_cell(12).unwrap();
        assert_eq!(store.pieces_hash(), store.folded_pieces_hash());
        assert_ne!(store.pieces_hash(), 0);
    }

    #[test]
    fn test_empty_mirrors_what() {
        let mut store = FlatStore::new(0, 9, limits(), 1, true);
        assert_eq!(store.empty_cells().count(), 9);
        store.place(4, 1, 2, 1).unwrap();
        assert!(!store.is_empty_cell(4).unwrap());
        assert_eq!(store.empty_cells().count(), 8);
        store.clear_cell(4).unwrap();
        assert!(store.is_empty_cell(4).unwrap());
    }

    #[test]
    fn test_hand_store_has_no_empty_or_playable() {
        let mut hand = FlatStore::new(1, 1, limits(), 1, false);
        hand.set_playable(0, true).unwrap();
        assert!(!hand.is_playable(0).unwrap());
        assert_eq!(hand.empty_cells().count(), 0);
        assert_eq!(hand.playable_cells().count(), 0);
    }

    #[test]
    fn test_bad_value_per_slice() {
        let mut store = FlatStore::new(0, 4, limits(), 1, true);
        assert!(matches!(
            store.set(Slice::Who, 0, 4),
            Err(StoreError::BadValue { value: 4, .. })
        ));
        assert!(matches!(
            store.get(Slice::What, 4),
            Err(StoreError::IndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_copy_through_refolds_hash() {
        let mut src = FlatStore::new(0, 25, limits(), 5, true);
        src.place(10, 1, 2, 1).unwrap();
        src.place(12, 2, 3, 1).unwrap();
        src.set_playable(11, true).unwrap();

        let mut dst = src.reallocate(49);
        src.copy_through(&mut dst, |p| Some(p + 12)).unwrap();

        let mut fresh = src.reallocate(49);
        fresh.place(22, 1, 2, 1).unwrap();
        fresh.place(24, 2, 3, 1).unwrap();
        fresh.set_playable(23, true).unwrap();

        assert_eq!(dst.pieces_hash(), fresh.pieces_hash());
        assert_eq!(dst.hash(), fresh.hash());
        assert_eq!(dst.what(22).unwrap(), 2);
        assert!(dst.is_empty_cell(10).unwrap());
        assert!(dst.is_playable(23).unwrap());
    }

    #[test]
    fn test_copy_through_rejects_collisions() {
        let mut src = FlatStore::new(0, 9, limits(), 5, true);
        src.place(1, 1, 2, 1).unwrap();
        src.place(2, 1, 2, 1).unwrap();
        let mut dst = src.reallocate(9);
        let result = src.copy_through(&mut dst, |_| Some(0));
        assert_eq!(result, Err(StoreError::NonInjectiveMap { cell: 0 }));
    }

    #[test]
    fn test_copy_through_drops_unmapped() {
        let mut src = FlatStore::new(0, 9, limits(), 5, true);
        src.place(1, 1, 2, 1).unwrap();
        src.place(8, 2, 3, 1).unwrap();
        let mut dst = src.reallocate(9);
        src.copy_through(&mut dst, |p| (p < 5).then_some(p)).unwrap();
        let cells: Vec<usize> = dst.non_zero_cells(Slice::What).collect();
        assert_eq!(cells, vec![1]);
    }

    #[test]
    fn test_reset_keeps_basis() {
        let mut store = FlatStore::new(0, 9, limits(), 5, true);
        store.place(4, 1, 2, 1).unwrap();
        let before = store.pieces_hash();
        store.reset();
        assert_eq!(store.pieces_hash(), 0);
        assert_eq!(store.empty_cells().count(), 9);
        store.place(4, 1, 2, 1).unwrap();
        assert_eq!(store.pieces_hash(), before);
    }

    #[test]
    fn test_stacked_state_is_not_flat() {
        let mut stack = StackStore::new(3);
        stack.push(1, 1, 2).unwrap();
        assert_eq!(stack.height(1), 1);
        let state = ContainerState::Stacked(stack);
        assert!(state.as_flat().is_none());
        assert_eq!(state.len(), 3);
    }
}
