use std::thread;

use tracing::debug;

use crate::core::image::{ImageTensor, TensorBatch};
use crate::error::{DataError, Result};

use super::sample::Sample;
use super::subset::Fetch;

/// Splits a fetchable source into consecutive batches.
///
/// Items within a batch are fetched on up to `num_workers` scoped threads;
/// batches come out in source order. The last batch may be short.
pub struct DataLoader<F> {
    source: F,
    batch_size: usize,
    num_workers: usize,
}

impl<F: Fetch> DataLoader<F> {
    pub fn new(source: F, batch_size: usize, num_workers: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(DataError::Config("Batch size must be at least 1".to_string()));
        }
        Ok(Self {
            source,
            batch_size,
            num_workers: num_workers.max(1),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    /// Number of batches per pass over the source
    pub fn len(&self) -> usize {
        self.source.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Fetch batch number `batch`
    pub fn batch(&self, batch: usize) -> Result<Vec<F::Item>> {
        let start = batch * self.batch_size;
        let end = (start + self.batch_size).min(self.source.len());
        if start >= end {
            return Err(DataError::IndexOutOfRange {
                index: batch,
                len: self.len(),
            });
        }

        debug!("Loading batch {} (items {}..{})", batch, start, end);
        let indices: Vec<usize> = (start..end).collect();
        if self.num_workers == 1 || indices.len() == 1 {
            return indices.into_iter().map(|i| self.source.fetch(i)).collect();
        }

        let chunk_size = indices.len().div_ceil(self.num_workers);
        let source = &self.source;
        let results: Vec<Result<Vec<F::Item>>> = thread::scope(|scope| {
            let handles: Vec<_> = indices
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|&i| source.fetch(i))
                            .collect::<Result<Vec<F::Item>>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let mut items = Vec::with_capacity(end - start);
        for chunk in results {
            items.extend(chunk?);
        }
        Ok(items)
    }

    /// Iterate over every batch in order
    pub fn batches(&self) -> Batches<'_, F> {
        Batches {
            loader: self,
            next: 0,
        }
    }
}

pub struct Batches<'l, F> {
    loader: &'l DataLoader<F>,
    next: usize,
}

impl<'l, F: Fetch> Iterator for Batches<'l, F> {
    type Item = Result<Vec<F::Item>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.loader.len() {
            return None;
        }
        let batch = self.loader.batch(self.next);
        self.next += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.loader.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

/// Stack a batch of tensor samples into `[n, c, h, w]` plus the labels
pub fn collate(batch: Vec<Sample<ImageTensor>>) -> Result<(TensorBatch, Vec<usize>)> {
    let (tensors, labels): (Vec<ImageTensor>, Vec<usize>) =
        batch.into_iter().map(|s| (s.payload, s.label)).unzip();
    Ok((TensorBatch::stack(&tensors)?, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::{InMemoryDataset, Subset};

    fn dataset(n: usize) -> InMemoryDataset<usize> {
        (0..n).map(|i| (i * 10, i % 2)).collect()
    }

    #[test]
    fn test_batches_in_order() {
        let dataset = dataset(7);
        let indices: Vec<usize> = (0..7).collect();
        let subset = Subset::new(&dataset, &indices);
        let loader = DataLoader::new(subset, 3, 4).unwrap();

        assert_eq!(loader.len(), 3);
        let batches: Vec<Vec<usize>> = loader
            .batches()
            .map(|b| b.unwrap().into_iter().map(|s| s.payload).collect())
            .collect();
        assert_eq!(batches, vec![vec![0, 10, 20], vec![30, 40, 50], vec![60]]);
    }

    #[test]
    fn test_single_worker_matches_many() {
        let dataset = dataset(20);
        let indices: Vec<usize> = (0..20).rev().collect();
        let subset = Subset::new(&dataset, &indices);
        let one = DataLoader::new(subset, 8, 1).unwrap();
        let many = DataLoader::new(subset, 8, 8).unwrap();
        for (a, b) in one.batches().zip(many.batches()) {
            assert_eq!(a.unwrap(), b.unwrap());
        }
    }

    #[test]
    fn test_empty_source_has_no_batches() {
        let dataset = dataset(3);
        let subset = Subset::new(&dataset, &[]);
        let loader = DataLoader::new(subset, 4, 2).unwrap();
        assert_eq!(loader.len(), 0);
        assert!(loader.batches().next().is_none());
        assert!(loader.batch(0).is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let dataset = dataset(3);
        let subset = Subset::new(&dataset, &[0]);
        assert!(DataLoader::new(subset, 0, 1).is_err());
    }

    #[test]
    fn test_collate() {
        let batch = vec![
            Sample::new(ImageTensor::new(1, 1, 2, vec![0.0, 1.0]).unwrap(), 1),
            Sample::new(ImageTensor::new(1, 1, 2, vec![0.5, 0.5]).unwrap(), 0),
        ];
        let (tensors, labels) = collate(batch).unwrap();
        assert_eq!(tensors.shape(), [2, 1, 1, 2]);
        assert_eq!(labels, vec![1, 0]);
    }
}
