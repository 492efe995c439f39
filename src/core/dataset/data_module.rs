use tracing::info;

use crate::config::DataConfig;
use crate::core::analysis::{balance, split_indices, DatasetSplits};
use crate::error::Result;

use super::loader::DataLoader;
use super::sample::{DatasetSplit, LabeledDataset};
use super::subset::{Fetch, FromSubset};

/// Balanced, split dataset ready to be served in batches.
///
/// Balancing and splitting run once in `new`; the three index sets never
/// change afterwards. Split views borrow the dataset, their index set and the
/// transform from the module:
///
/// ```ignore
/// let module = ImageDataModule::new(folder, transform_image(), &config)?;
/// let loader: DataLoader<Subset<_, _>> = module.train_loader(None)?;
/// for batch in loader.batches() { /* ... */ }
/// ```
pub struct ImageDataModule<D, T> {
    dataset: D,
    transform: T,
    splits: DatasetSplits,
    batch_size: usize,
    num_workers: usize,
}

impl<D: LabeledDataset, T> ImageDataModule<D, T> {
    pub fn new(dataset: D, transform: T, config: &DataConfig) -> Result<Self> {
        config.validate()?;

        let samples = balance(dataset.labels(), config.balance_strategy(), config.seed)?;
        let splits = split_indices(&samples, &config.split_ratios, config.seed);
        info!(
            "Data module ready: {} train, {} val, {} test",
            splits.train.len(),
            splits.val.len(),
            splits.test.len()
        );

        Ok(Self {
            dataset,
            transform,
            splits,
            batch_size: config.batch_size,
            num_workers: config.num_workers,
        })
    }

    /// View over one split, as a [`Subset`](super::Subset) or
    /// [`RgbDepthSubset`](super::RgbDepthSubset)
    pub fn subset<'a, S>(&'a self, split: DatasetSplit) -> S
    where
        S: FromSubset<'a, D, T>,
    {
        S::from_subset(&self.dataset, self.splits.get(split), &self.transform)
    }

    pub fn train<'a, S: FromSubset<'a, D, T>>(&'a self) -> S {
        self.subset(DatasetSplit::Train)
    }

    pub fn val<'a, S: FromSubset<'a, D, T>>(&'a self) -> S {
        self.subset(DatasetSplit::Val)
    }

    pub fn test<'a, S: FromSubset<'a, D, T>>(&'a self) -> S {
        self.subset(DatasetSplit::Test)
    }

    /// Batch loader over a split view, with the configured batch size.
    /// `num_workers` overrides the configured worker count.
    pub fn loader<F: Fetch>(&self, source: F, num_workers: Option<usize>) -> Result<DataLoader<F>> {
        DataLoader::new(
            source,
            self.batch_size,
            num_workers.unwrap_or(self.num_workers),
        )
    }

    pub fn split_loader<'a, S>(
        &'a self,
        split: DatasetSplit,
        num_workers: Option<usize>,
    ) -> Result<DataLoader<S>>
    where
        S: FromSubset<'a, D, T> + Fetch,
    {
        self.loader(self.subset(split), num_workers)
    }

    pub fn train_loader<'a, S>(&'a self, num_workers: Option<usize>) -> Result<DataLoader<S>>
    where
        S: FromSubset<'a, D, T> + Fetch,
    {
        self.split_loader(DatasetSplit::Train, num_workers)
    }

    pub fn val_loader<'a, S>(&'a self, num_workers: Option<usize>) -> Result<DataLoader<S>>
    where
        S: FromSubset<'a, D, T> + Fetch,
    {
        self.split_loader(DatasetSplit::Val, num_workers)
    }

    pub fn test_loader<'a, S>(&'a self, num_workers: Option<usize>) -> Result<DataLoader<S>>
    where
        S: FromSubset<'a, D, T> + Fetch,
    {
        self.split_loader(DatasetSplit::Test, num_workers)
    }

    pub fn splits(&self) -> &DatasetSplits {
        &self.splits
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::{InMemoryDataset, Subset};
    use crate::core::image::transform::from_fn;
    use crate::error::DataError;
    use std::collections::HashSet;

    /// 100 fail samples followed by 50 success samples, payload = position
    fn skewed() -> InMemoryDataset<usize> {
        (0..150).map(|i| (i, usize::from(i >= 100))).collect()
    }

    fn identity() -> crate::core::image::Identity {
        crate::core::image::Identity
    }

    #[test]
    fn test_per_class_module_sizes() {
        let config = DataConfig {
            dataset_size: Some(30),
            ..DataConfig::default()
        };
        let module = ImageDataModule::new(skewed(), identity(), &config).unwrap();
        let splits = module.splits();
        assert_eq!(splits.total(), 60);
        assert_eq!((splits.train.len(), splits.val.len(), splits.test.len()), (42, 9, 9));

        let train: Subset<_, _> = module.train();
        assert_eq!(train.len(), 42);
        let val: Subset<_, _> = module.val();
        let test: Subset<_, _> = module.test();
        assert_eq!(val.len() + test.len(), 18);
    }

    #[test]
    fn test_weighted_module_splits_are_disjoint() {
        let module = ImageDataModule::new(skewed(), identity(), &DataConfig::default()).unwrap();
        let splits = module.splits();
        assert!(splits.total() <= 100);

        let mut seen = HashSet::new();
        for split in DatasetSplit::ALL {
            for &index in splits.get(split) {
                assert!(seen.insert(index));
            }
        }
    }

    #[test]
    fn test_module_is_reproducible() {
        let config = DataConfig::default();
        let a = ImageDataModule::new(skewed(), identity(), &config).unwrap();
        let b = ImageDataModule::new(skewed(), identity(), &config).unwrap();
        assert_eq!(a.splits(), b.splits());
    }

    #[test]
    fn test_module_applies_transform_on_fetch() {
        let config = DataConfig {
            dataset_size: Some(5),
            ..DataConfig::default()
        };
        let add_thousand = from_fn(|x: usize| -> Result<usize> { Ok(x + 1000) });
        let module = ImageDataModule::new(skewed(), add_thousand, &config).unwrap();
        let train: Subset<_, _> = module.train();

        let sample = train.get(0).unwrap();
        let source = module.splits().train[0];
        assert_eq!(sample.payload, source + 1000);
        assert_eq!(sample.label, usize::from(source >= 100));
    }

    #[test]
    fn test_module_loader_covers_split() {
        let config = DataConfig {
            dataset_size: Some(20),
            batch_size: 4,
            ..DataConfig::default()
        };
        let module = ImageDataModule::new(skewed(), identity(), &config).unwrap();
        let loader: DataLoader<Subset<_, _>> = module.train_loader(Some(2)).unwrap();
        assert_eq!(loader.num_workers(), 2);
        assert_eq!(loader.batch_size(), 4);

        let fetched: usize = loader.batches().map(|b| b.unwrap().len()).sum();
        assert_eq!(fetched, module.splits().train.len());

        let test: DataLoader<Subset<_, _>> = module.test_loader(None).unwrap();
        assert_eq!(test.num_workers(), config.num_workers);
    }

    #[test]
    fn test_module_fails_without_successes() {
        let dataset: InMemoryDataset<usize> = (0..10).map(|i| (i, 0)).collect();
        let result = ImageDataModule::new(dataset, identity(), &DataConfig::default());
        assert!(matches!(result, Err(DataError::EmptyDataset { .. })));
    }
}
