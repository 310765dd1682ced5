//! Zobrist hashing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random keys for one packed slice, laid out as `cell * stride + value`.
///
/// The table is a pure function of `(seed, cells, stride)`, so a store that is
/// reallocated with the same seed hashes every `(cell, value)` pair the same
/// way a freshly built store of that size would.
#[derive(Debug, Clone)]
pub struct Zobrist {
    seed: u64,
    stride: usize,
    table: Vec<u64>,
}

impl Zobrist {
    pub fn new(seed: u64, cells: usize, stride: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut table = vec![0u64; cells * stride];
        for key in table.iter_mut() {
            *key = rng.random::<u64>();
        }

        Self {
            seed,
            stride,
            table,
        }
    }

    /// Key for `value` at `cell`. Zero never contributes to a hash.
    #[inline]
    pub fn key(&self, cell: usize, value: u32) -> u64 {
        if value == 0 {
            return 0;
        }
        self.table[cell * self.stride + value as usize]
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Same seed and stride, sized for `cells`.
    pub fn resized(&self, cells: usize) -> Self {
        Self::new(self.seed, cells, self.stride)
    }
}

/// Derives a per-slice seed so that no two slices (or containers) share keys.
pub fn derive_seed(base: u64, container: usize, slice: usize) -> u64 {
    // splitmix64 finaliser
    let mut z = base
        .wrapping_add((container as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add((slice as u64 + 1).wrapping_mul(0xD1B5_4A32_D192_ED03));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
