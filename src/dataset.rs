// File: src/dataset.rs
use crate::core::types::{Features, SymbolId};
use crate::error::{EvalError, EvalResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// One test utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub sample_id: String,
    pub input: Features,
    pub token_target: Vec<SymbolId>,
    pub word_target: Vec<SymbolId>,
}

/// A finite, restartable sequence of samples. Already sharded by the caller.
pub trait Dataset {
    fn size(&self) -> usize;
    /// Deterministically permutes the iteration order.
    fn shuffle(&mut self, seed: u64);
    fn get(&self, idx: usize) -> EvalResult<Sample>;
}

/// Samples held in memory, iterated through a (possibly shuffled) permutation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset {
    samples: Vec<Sample>,
    order: Vec<usize>,
}

impl InMemoryDataset {
    pub fn new(samples: Vec<Sample>) -> Self {
        let order = (0..samples.len()).collect();
        Self { samples, order }
    }
}

impl Dataset for InMemoryDataset {
    fn size(&self) -> usize {
        self.samples.len()
    }

    fn shuffle(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.order = (0..self.samples.len()).collect();
        self.order.shuffle(&mut rng);
    }

    fn get(&self, idx: usize) -> EvalResult<Sample> {
        self.order
            .get(idx)
            .and_then(|&i| self.samples.get(i))
            .cloned()
            .ok_or_else(|| {
                EvalError::Model(format!("sample {idx} out of range for {} samples", self.size()))
            })
    }
}
