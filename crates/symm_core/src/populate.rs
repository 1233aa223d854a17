//! Deterministic random population of operand matrices.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::{
    element::Element,
    problem::{Order, Uplo},
};

/// Storage order and optional triangular restriction for one populated region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationFlags {
    pub order: Order,
    pub half: Option<Uplo>,
}

impl CreationFlags {
    pub fn rectangular(order: Order) -> Self {
        Self { order, half: None }
    }

    pub fn symmetric(order: Order, uplo: Uplo) -> Self {
        Self {
            order,
            half: Some(uplo),
        }
    }

    fn keeps(&self, row: usize, col: usize) -> bool {
        match self.half {
            None => true,
            Some(Uplo::Upper) => row <= col,
            Some(Uplo::Lower) => row >= col,
        }
    }
}

pub struct Populator {
    rng: ChaCha20Rng,
    seed: u64,
}

impl Populator {
    pub const DEFAULT_SEED: u64 = 0x5EED5EED5EED5EED;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fills the logical `rows x cols` region of `buf` (already offset) with random values.
    ///
    /// With a triangular restriction the opposite triangle is written as zero.
    /// Padding between `rows`/`cols` and `ld` is left untouched.
    pub fn populate<T: Element>(
        &mut self,
        buf: &mut [T],
        rows: usize,
        cols: usize,
        ld: usize,
        flags: CreationFlags,
    ) {
        for row in 0..rows {
            for col in 0..cols {
                let idx = flags.order.index(row, col, ld);
                buf[idx] = if flags.keeps(row, col) {
                    T::sample(&mut self.rng)
                } else {
                    T::zero()
                };
            }
        }
    }
}

impl Default for Populator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}
