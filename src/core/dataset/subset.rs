use tracing::debug;

use crate::core::image::{Identity, Transform};
use crate::error::{DataError, Result};

use super::sample::{LabeledDataset, RgbDepthSample, Sample};

/// Positional access to a finite collection of items
pub trait Fetch: Sync {
    type Item: Send;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fetch(&self, index: usize) -> Result<Self::Item>;
}

/// Builds a fetchable view over `indices` of `dataset`, applying `transform`
pub trait FromSubset<'a, D, T>: Sized {
    fn from_subset(dataset: &'a D, indices: &'a [usize], transform: &'a T) -> Self;
}

fn resolve(indices: &[usize], index: usize) -> Result<usize> {
    indices.get(index).copied().ok_or(DataError::IndexOutOfRange {
        index,
        len: indices.len(),
    })
}

/// View over part of a dataset that transforms each payload when fetched.
///
/// Borrows the dataset, the index set and the transform. Nothing is cached:
/// a randomized transform gives a new result on every fetch.
pub struct Subset<'a, D, T = Identity> {
    dataset: &'a D,
    indices: &'a [usize],
    transform: &'a T,
}

impl<D, T> Clone for Subset<'_, D, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D, T> Copy for Subset<'_, D, T> {}

impl<'a, D> Subset<'a, D, Identity> {
    /// Subset without a transform
    pub fn new(dataset: &'a D, indices: &'a [usize]) -> Self {
        Self {
            dataset,
            indices,
            transform: &Identity,
        }
    }
}

impl<'a, D, T> Subset<'a, D, T> {
    pub fn with_transform(dataset: &'a D, indices: &'a [usize], transform: &'a T) -> Self {
        Self {
            dataset,
            indices,
            transform,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        self.indices
    }

    /// Label of item `index` without loading its payload
    pub fn label(&self, index: usize) -> Result<usize>
    where
        D: LabeledDataset,
    {
        let source = resolve(self.indices, index)?;
        let labels = self.dataset.labels();
        labels.get(source).copied().ok_or(DataError::IndexOutOfRange {
            index: source,
            len: labels.len(),
        })
    }
}

impl<'a, D, T, P> Subset<'a, D, T>
where
    D: LabeledDataset<Item = Sample<P>>,
    T: Transform<P>,
{
    pub fn get(&self, index: usize) -> Result<Sample<T::Output>> {
        let source = resolve(self.indices, index)?;
        debug!("Fetching subset item {} (dataset index {})", index, source);
        let sample = self.dataset.get(source)?;
        Ok(Sample::new(self.transform.apply(sample.payload)?, sample.label))
    }
}

impl<'a, D, T, P> Fetch for Subset<'a, D, T>
where
    D: LabeledDataset<Item = Sample<P>>,
    T: Transform<P>,
    T::Output: Send,
{
    type Item = Sample<T::Output>;

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn fetch(&self, index: usize) -> Result<Self::Item> {
        self.get(index)
    }
}

impl<'a, D, T> FromSubset<'a, D, T> for Subset<'a, D, T> {
    fn from_subset(dataset: &'a D, indices: &'a [usize], transform: &'a T) -> Self {
        Self::with_transform(dataset, indices, transform)
    }
}

/// Like [`Subset`] for RGB + depth samples: the transform is applied to the
/// RGB and depth payloads independently; label and file list pass through.
pub struct RgbDepthSubset<'a, D, T = Identity> {
    dataset: &'a D,
    indices: &'a [usize],
    transform: &'a T,
}

impl<D, T> Clone for RgbDepthSubset<'_, D, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D, T> Copy for RgbDepthSubset<'_, D, T> {}

impl<'a, D, T> RgbDepthSubset<'a, D, T> {
    pub fn with_transform(dataset: &'a D, indices: &'a [usize], transform: &'a T) -> Self {
        Self {
            dataset,
            indices,
            transform,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl<'a, D> RgbDepthSubset<'a, D, Identity> {
    pub fn new(dataset: &'a D, indices: &'a [usize]) -> Self {
        Self::with_transform(dataset, indices, &Identity)
    }
}

impl<'a, D, T, P> RgbDepthSubset<'a, D, T>
where
    D: LabeledDataset<Item = RgbDepthSample<P>>,
    T: Transform<P>,
{
    pub fn get(&self, index: usize) -> Result<RgbDepthSample<T::Output>> {
        let source = resolve(self.indices, index)?;
        let sample = self.dataset.get(source)?;
        Ok(RgbDepthSample {
            rgb: self.transform.apply(sample.rgb)?,
            depth: self.transform.apply(sample.depth)?,
            label: sample.label,
            files: sample.files,
        })
    }
}

impl<'a, D, T, P> Fetch for RgbDepthSubset<'a, D, T>
where
    D: LabeledDataset<Item = RgbDepthSample<P>>,
    T: Transform<P>,
    T::Output: Send,
{
    type Item = RgbDepthSample<T::Output>;

    fn len(&self) -> usize {
        self.indices.len()
    }

    fn fetch(&self, index: usize) -> Result<Self::Item> {
        self.get(index)
    }
}

impl<'a, D, T> FromSubset<'a, D, T> for RgbDepthSubset<'a, D, T> {
    fn from_subset(dataset: &'a D, indices: &'a [usize], transform: &'a T) -> Self {
        Self::with_transform(dataset, indices, transform)
    }
}
