//! Mini-batch sampling over a subset.
use rand::{seq::SliceRandom, Rng};

/// Splits positions `0..n` into mini-batches.
///
/// With shuffling enabled, a fresh permutation is drawn on every call to
/// [`BatchSampler::batches`], i.e., once per epoch. The last batch is shorter
/// when `n` is not a multiple of the batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSampler {
    batch_size: usize,
    shuffle: bool,
}

impl BatchSampler {
    /// Creates a sampler.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn new(batch_size: usize, shuffle: bool) -> Self {
        assert!(batch_size > 0, "batch_size must be positive");
        Self {
            batch_size,
            shuffle,
        }
    }

    /// The maximum number of positions in a batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The number of batches for `n` positions.
    pub fn n_batches(&self, n: usize) -> usize {
        (n + self.batch_size - 1) / self.batch_size
    }

    /// Returns the batches of one pass over `0..n`.
    ///
    /// `rng` is only used when shuffling is enabled.
    pub fn batches<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Vec<usize>> {
        let mut positions: Vec<usize> = (0..n).collect();
        if self.shuffle {
            positions.shuffle(rng);
        }
        positions
            .chunks(self.batch_size)
            .map(|c| c.to_vec())
            .collect()
    }
}
