//! Balanced, reproducible train/val/test splits over a two-class grasp
//! outcome image dataset, served in batches.

pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod ui;

pub use app::BatchViewerApp;
pub use config::DataConfig;
pub use error::{DataError, Result};
