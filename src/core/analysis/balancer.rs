//! Class balancing for the fail/success grasp dataset.
//!
//! Two strategies pick the indices that make up the balanced sample:
//!
//! - **Weighted**: every sample is weighted by the inverse frequency of its
//!   class and a seeded weighted permutation is drawn without replacement,
//!   then truncated. Minority-class samples are drawn earlier, so a truncated
//!   draw leans towards parity. Balancing is approximate, not exact.
//! - **Per class**: the first `m` samples of each class (in dataset order)
//!   are taken, with `m` bounded by the requested count and both class sizes,
//!   then shuffled together. The result has exactly `2m` indices.

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::dataset::{GraspOutcome, IndexSet};
use crate::error::{DataError, Result};

/// Seed shared by the balancing draw and the per-class shuffle
pub const BALANCE_SEED: u64 = 42;

/// Number of samples in each class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClassCounts {
    pub fail: usize,
    pub success: usize,
}

impl ClassCounts {
    /// Count labels, rejecting anything other than 0 and 1
    pub fn from_labels(labels: &[usize]) -> Result<Self> {
        let mut counts = Self::default();
        let mut invalid = false;

        for &label in labels {
            match GraspOutcome::from_label(label) {
                Some(GraspOutcome::Fail) => counts.fail += 1,
                Some(GraspOutcome::Success) => counts.success += 1,
                None => invalid = true,
            }
        }

        if invalid {
            let distinct: BTreeSet<usize> = labels.iter().copied().collect();
            return Err(DataError::InvalidLabelSet {
                labels: distinct.into_iter().collect(),
            });
        }

        Ok(counts)
    }

    pub fn get(&self, outcome: GraspOutcome) -> usize {
        match outcome {
            GraspOutcome::Fail => self.fail,
            GraspOutcome::Success => self.success,
        }
    }

    pub fn total(&self) -> usize {
        self.fail + self.success
    }

    /// Size of the smaller class
    pub fn minority(&self) -> usize {
        self.fail.min(self.success)
    }

    /// Fail with `EmptyDataset` if either class has no samples
    pub fn ensure_both_present(&self) -> Result<()> {
        for outcome in GraspOutcome::ALL {
            if self.get(outcome) == 0 {
                return Err(DataError::EmptyDataset { outcome });
            }
        }
        Ok(())
    }

    /// Inverse-frequency weight of each class
    pub fn weights(&self) -> Result<ClassWeights> {
        self.ensure_both_present()?;
        Ok(ClassWeights {
            fail: 1.0 / self.fail as f64,
            success: 1.0 / self.success as f64,
        })
    }
}

/// `1 / count` per class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassWeights {
    pub fail: f64,
    pub success: f64,
}

impl ClassWeights {
    pub fn for_label(&self, label: usize) -> f64 {
        match GraspOutcome::from_label(label) {
            Some(GraspOutcome::Fail) => self.fail,
            Some(GraspOutcome::Success) => self.success,
            None => 0.0,
        }
    }
}

/// Weight of every sample, parallel to `labels`
pub fn sample_weights(labels: &[usize], weights: &ClassWeights) -> Vec<f64> {
    labels.iter().map(|&label| weights.for_label(label)).collect()
}

/// How the balanced sample is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceStrategy {
    /// Inverse-frequency weighted draw. Without a limit the draw is cut at
    /// twice the minority class count.
    Weighted { limit: Option<usize> },
    /// `count` samples from each class
    PerClass { count: usize },
}

impl Default for BalanceStrategy {
    fn default() -> Self {
        BalanceStrategy::Weighted { limit: None }
    }
}

/// Seeded weighted permutation without replacement, truncated to `limit`.
///
/// Uses exponential keys (`ln(u) / w`, highest first), which orders items the
/// same way as drawing them one at a time with probability proportional to
/// their weight among the items not yet drawn.
pub fn weighted_sample(labels: &[usize], limit: usize, seed: u64) -> Result<IndexSet> {
    let counts = ClassCounts::from_labels(labels)?;
    let weights = counts.weights()?;
    let sample_weights = sample_weights(labels, &weights);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut keyed: Vec<(usize, f64)> = sample_weights
        .iter()
        .enumerate()
        .map(|(index, &weight)| {
            let u: f64 = rng.gen();
            (index, u.ln() / weight)
        })
        .collect();
    keyed.sort_by(|a, b| b.1.total_cmp(&a.1));

    let size = labels.len().min(limit);
    debug!("Weighted draw of {} out of {} samples", size, labels.len());
    Ok(keyed.into_iter().take(size).map(|(index, _)| index).collect())
}

/// `min(count, fail, success)` indices from each class, shuffled together
pub fn per_class_sample(labels: &[usize], count: usize, seed: u64) -> Result<IndexSet> {
    let counts = ClassCounts::from_labels(labels)?;
    counts.ensure_both_present()?;

    let per_class = count.min(counts.minority());
    let mut fail_indices = Vec::with_capacity(per_class);
    let mut success_indices = Vec::with_capacity(per_class);
    for (index, &label) in labels.iter().enumerate() {
        let bucket = if label == GraspOutcome::Fail.label() {
            &mut fail_indices
        } else {
            &mut success_indices
        };
        if bucket.len() < per_class {
            bucket.push(index);
        }
    }

    let mut samples = fail_indices;
    samples.append(&mut success_indices);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    debug!("Per-class draw of {} samples per class", per_class);
    Ok(samples)
}

/// Select the balanced sample according to `strategy`
pub fn balance(labels: &[usize], strategy: BalanceStrategy, seed: u64) -> Result<IndexSet> {
    let counts = ClassCounts::from_labels(labels)?;
    info!("Class fail: {}", counts.fail);
    info!("Class success: {}", counts.success);

    let samples = match strategy {
        BalanceStrategy::Weighted { limit } => {
            let limit = limit.unwrap_or(2 * counts.minority());
            weighted_sample(labels, limit, seed)?
        }
        BalanceStrategy::PerClass { count } => per_class_sample(labels, count, seed)?,
    };

    info!("Balanced sample: {} of {} images", samples.len(), counts.total());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100 fail followed by 50 success
    fn skewed_labels() -> Vec<usize> {
        let mut labels = vec![0; 100];
        labels.extend(vec![1; 50]);
        labels
    }

    fn count_success(labels: &[usize], indices: &[usize]) -> usize {
        indices.iter().filter(|&&i| labels[i] == 1).count()
    }

    #[test]
    fn test_class_counts_and_weights() {
        let counts = ClassCounts::from_labels(&skewed_labels()).unwrap();
        assert_eq!(counts, ClassCounts { fail: 100, success: 50 });

        let weights = counts.weights().unwrap();
        assert_eq!(weights.fail, 0.01);
        assert_eq!(weights.success, 0.02);
        assert_eq!(sample_weights(&[1, 0], &weights), vec![0.02, 0.01]);
    }

    #[test]
    fn test_invalid_label_set() {
        let result = ClassCounts::from_labels(&[0, 1, 2, 1]);
        match result {
            Err(DataError::InvalidLabelSet { labels }) => assert_eq!(labels, vec![0, 1, 2]),
            other => panic!("expected InvalidLabelSet, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_class_is_empty_dataset() {
        let labels = vec![0; 10];
        assert!(matches!(
            balance(&labels, BalanceStrategy::default(), BALANCE_SEED),
            Err(DataError::EmptyDataset {
                outcome: GraspOutcome::Success
            })
        ));
        assert!(matches!(
            per_class_sample(&labels, 3, BALANCE_SEED),
            Err(DataError::EmptyDataset { .. })
        ));
        assert!(matches!(
            balance(&[], BalanceStrategy::default(), BALANCE_SEED),
            Err(DataError::EmptyDataset { .. })
        ));
    }

    #[test]
    fn test_weighted_default_limit() {
        let labels = skewed_labels();
        let samples = balance(&labels, BalanceStrategy::Weighted { limit: None }, BALANCE_SEED).unwrap();
        assert_eq!(samples.len(), 100);

        let unique: BTreeSet<usize> = samples.iter().copied().collect();
        assert_eq!(unique.len(), samples.len());
        // Minority class is over-represented compared to its 1/3 share
        assert!(count_success(&labels, &samples) > 33);
    }

    #[test]
    fn test_weighted_limit_is_capped_by_dataset_size() {
        let labels = skewed_labels();
        let all = weighted_sample(&labels, 1000, BALANCE_SEED).unwrap();
        assert_eq!(all.len(), 150);
        let few = weighted_sample(&labels, 10, BALANCE_SEED).unwrap();
        assert_eq!(few.len(), 10);
    }

    #[test]
    fn test_weighted_is_seeded() {
        let labels = skewed_labels();
        let a = weighted_sample(&labels, 60, 7).unwrap();
        let b = weighted_sample(&labels, 60, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_per_class_exact_counts() {
        let labels = skewed_labels();
        let samples = balance(&labels, BalanceStrategy::PerClass { count: 30 }, BALANCE_SEED).unwrap();
        assert_eq!(samples.len(), 60);
        assert_eq!(count_success(&labels, &samples), 30);

        let capped = per_class_sample(&labels, 500, BALANCE_SEED).unwrap();
        assert_eq!(capped.len(), 100);
    }

    #[test]
    fn test_per_class_does_not_need_sorted_labels() {
        let labels = vec![1, 0, 1, 0, 0, 1, 0, 0];
        let mut samples = per_class_sample(&labels, 2, BALANCE_SEED).unwrap();
        samples.sort();
        assert_eq!(samples, vec![0, 1, 2, 3]);
    }
}
