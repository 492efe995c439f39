use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::analysis::{BalanceStrategy, SplitRatios, SPLIT_SEED};
use crate::error::{DataError, Result};

/// Settings for building and serving the grasp dataset.
///
/// Stored as JSON; any field missing from the file takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Samples per batch
    pub batch_size: usize,

    /// Worker threads used to fetch a batch
    pub num_workers: usize,

    /// Take this many images from each class instead of the weighted draw
    pub dataset_size: Option<usize>,

    /// Size of the weighted draw; twice the minority class count when unset
    pub weighted_limit: Option<usize>,

    /// Seed for balancing and splitting
    pub seed: u64,

    pub split_ratios: SplitRatios,

    /// Directory for log files
    pub log_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            num_workers: 8,
            dataset_size: None,
            weighted_limit: None,
            seed: SPLIT_SEED,
            split_ratios: SplitRatios::default(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl DataConfig {
    /// Load a config file, or return defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading config from: {:?}", path);

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config file found. Using defaults.");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: DataConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        info!("Successfully loaded config");
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Config saved to: {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DataError::Config("batch_size must be at least 1".to_string()));
        }
        if self.num_workers == 0 {
            warn!("num_workers is 0, batches will be fetched on one thread");
        }
        self.split_ratios.validate()
    }

    /// Per-class draw when `dataset_size` is set, weighted draw otherwise
    pub fn balance_strategy(&self) -> BalanceStrategy {
        match self.dataset_size {
            Some(count) => BalanceStrategy::PerClass { count },
            None => BalanceStrategy::Weighted {
                limit: self.weighted_limit,
            },
        }
    }
}
