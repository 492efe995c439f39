mod balancer;
mod splitter;

pub use balancer::{
    balance, per_class_sample, sample_weights, weighted_sample, BalanceStrategy, ClassCounts,
    ClassWeights, BALANCE_SEED,
};
pub use splitter::{split_indices, DatasetSplits, SplitRatios, SplitSizes, SPLIT_SEED};
