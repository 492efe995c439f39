use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::dataset::{DatasetSplit, IndexSet};
use crate::error::{DataError, Result};

/// Seed of the train/val/test partition
pub const SPLIT_SEED: u64 = 42;

/// Guards `floor` against `0.7 * 10 = 6.999...` style float error
const RATIO_EPSILON: f64 = 1e-9;

/// Target ratios for train/val/test split distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64, // 0.70 for 70%
    pub val: f64,   // 0.15 for 15%
    pub test: f64,  // 0.15 for 15%
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.70,
            val: 0.15,
            test: 0.15,
        }
    }
}

impl SplitRatios {
    pub fn get(&self, split: DatasetSplit) -> f64 {
        match split {
            DatasetSplit::Train => self.train,
            DatasetSplit::Val => self.val,
            DatasetSplit::Test => self.test,
        }
    }

    /// Ratios must be non-negative and sum to 1
    pub fn validate(&self) -> Result<()> {
        let all = [self.train, self.val, self.test];
        if all.iter().any(|r| !(0.0..=1.0).contains(r)) {
            return Err(DataError::Config(format!(
                "Split ratios must be between 0 and 1, got {:?}",
                self
            )));
        }
        if (all.iter().sum::<f64>() - 1.0).abs() > 1e-6 {
            return Err(DataError::Config(format!(
                "Split ratios must sum to 1, got {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// Number of samples going to each split
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSizes {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

impl SplitSizes {
    /// `train = floor(train_ratio * n)`, then the remainder is shared between
    /// val and test in proportion to their ratios. Rounding goes to test.
    pub fn for_len(n: usize, ratios: &SplitRatios) -> Self {
        let train = ((ratios.train * n as f64) + RATIO_EPSILON).floor() as usize;
        let train = train.min(n);
        let rest = n - train;

        let held_out = ratios.val + ratios.test;
        let val_share = if held_out > 0.0 { ratios.val / held_out } else { 0.0 };
        let val = ((val_share * rest as f64) + RATIO_EPSILON).floor() as usize;
        let val = val.min(rest);

        Self {
            train,
            val,
            test: rest - val,
        }
    }
}

/// Three disjoint index sets
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetSplits {
    pub train: IndexSet,
    pub val: IndexSet,
    pub test: IndexSet,
}

impl DatasetSplits {
    pub fn get(&self, split: DatasetSplit) -> &IndexSet {
        match split {
            DatasetSplit::Train => &self.train,
            DatasetSplit::Val => &self.val,
            DatasetSplit::Test => &self.test,
        }
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }
}

/// Seeded shuffle of `indices`, cut into train, val and test blocks
pub fn split_indices(indices: &[usize], ratios: &SplitRatios, seed: u64) -> DatasetSplits {
    let sizes = SplitSizes::for_len(indices.len(), ratios);

    let mut shuffled = indices.to_vec();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let test = shuffled.split_off(sizes.train + sizes.val);
    let val = shuffled.split_off(sizes.train);
    let train = shuffled;

    info!("Len Train Data {}", train.len());
    info!("Len Val Data {}", val.len());
    info!("Len Test Data {}", test.len());

    DatasetSplits { train, val, test }
}
