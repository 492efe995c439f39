use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

/// Ordered positions into a dataset, referencing samples without copying them
pub type IndexSet = Vec<usize>;

/// Outcome of a grasp attempt, the two classes of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraspOutcome {
    /// Label 0
    Fail,
    /// Label 1
    Success,
}

impl GraspOutcome {
    pub const ALL: [GraspOutcome; 2] = [GraspOutcome::Fail, GraspOutcome::Success];

    pub fn as_str(&self) -> &str {
        match self {
            GraspOutcome::Fail => "fail",
            GraspOutcome::Success => "success",
        }
    }

    pub fn label(&self) -> usize {
        match self {
            GraspOutcome::Fail => 0,
            GraspOutcome::Success => 1,
        }
    }

    pub fn from_label(label: usize) -> Option<Self> {
        match label {
            0 => Some(GraspOutcome::Fail),
            1 => Some(GraspOutcome::Success),
            _ => None,
        }
    }
}

impl fmt::Display for GraspOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three partitions a balanced sample is split into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetSplit {
    Train,
    Val,
    Test,
}

impl DatasetSplit {
    pub const ALL: [DatasetSplit; 3] = [DatasetSplit::Train, DatasetSplit::Val, DatasetSplit::Test];

    pub fn as_str(&self) -> &str {
        match self {
            DatasetSplit::Train => "train",
            DatasetSplit::Val => "val",
            DatasetSplit::Test => "test",
        }
    }
}

/// A payload with its class label
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<P> {
    pub payload: P,
    pub label: usize,
}

impl<P> Sample<P> {
    pub fn new(payload: P, label: usize) -> Self {
        Self { payload, label }
    }

    pub fn outcome(&self) -> Option<GraspOutcome> {
        GraspOutcome::from_label(self.label)
    }
}

/// An RGB payload paired with its depth payload and the files they came from
#[derive(Debug, Clone, PartialEq)]
pub struct RgbDepthSample<P> {
    pub rgb: P,
    pub depth: P,
    pub label: usize,
    pub files: Vec<PathBuf>,
}

/// Indexable, labeled collection of samples.
///
/// `labels()` is parallel to the items: `labels()[i]` is the label of `get(i)`,
/// and must be available without decoding any payload.
pub trait LabeledDataset: Sync {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn labels(&self) -> &[usize];

    fn get(&self, index: usize) -> Result<Self::Item>;
}

/// Dataset of already-decoded payloads held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataset<P> {
    payloads: Vec<P>,
    labels: Vec<usize>,
}

impl<P> InMemoryDataset<P> {
    pub fn new() -> Self {
        Self {
            payloads: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn push(&mut self, payload: P, label: usize) {
        self.payloads.push(payload);
        self.labels.push(label);
    }
}

impl<P> FromIterator<(P, usize)> for InMemoryDataset<P> {
    fn from_iter<I: IntoIterator<Item = (P, usize)>>(iter: I) -> Self {
        let (payloads, labels) = iter.into_iter().unzip();
        Self { payloads, labels }
    }
}

impl<P: Clone + Sync> LabeledDataset for InMemoryDataset<P> {
    type Item = Sample<P>;

    fn len(&self) -> usize {
        self.payloads.len()
    }

    fn labels(&self) -> &[usize] {
        &self.labels
    }

    fn get(&self, index: usize) -> Result<Sample<P>> {
        let payload = self.payloads.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.payloads.len(),
        })?;
        Ok(Sample::new(payload.clone(), self.labels[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(GraspOutcome::Fail.label(), 0);
        assert_eq!(GraspOutcome::Success.label(), 1);
        assert_eq!(GraspOutcome::from_label(1), Some(GraspOutcome::Success));
        assert_eq!(GraspOutcome::from_label(2), None);
        assert_eq!(GraspOutcome::Fail.to_string(), "fail");
    }

    #[test]
    fn test_in_memory_dataset() {
        let dataset: InMemoryDataset<&str> = vec![("a", 0), ("b", 1)].into_iter().collect();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.labels(), &[0, 1]);
        assert_eq!(dataset.get(1).unwrap(), Sample::new("b", 1));
        assert!(matches!(
            dataset.get(2),
            Err(DataError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }
}
