mod data_module;
mod folder;
mod loader;
mod sample;
mod subset;

pub use data_module::ImageDataModule;
pub use folder::{ImageFolder, RgbDepthFolder};
pub use loader::{collate, Batches, DataLoader};
pub use sample::{
    DatasetSplit, GraspOutcome, InMemoryDataset, IndexSet, LabeledDataset, RgbDepthSample, Sample,
};
pub use subset::{Fetch, FromSubset, RgbDepthSubset, Subset};
