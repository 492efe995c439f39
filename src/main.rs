use anyhow::{anyhow, bail, Context};
use clap::Parser;
use eframe::egui;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use grasp_data::core::dataset::{
    collate, DataLoader, Fetch, FromSubset, ImageDataModule, ImageFolder, LabeledDataset,
    RgbDepthFolder, RgbDepthSubset, Subset,
};
use grasp_data::core::image::transform::{transform_image, TransformImage};
use grasp_data::logging::setup_logging;
use grasp_data::{BatchViewerApp, DataConfig};

/// Balance, split and batch a grasp outcome image dataset
#[derive(Parser, Debug)]
#[command(name = "grasp-data")]
#[command(version)]
#[command(about = "Balanced train/val/test batches over fail/success grasp images")]
struct Cli {
    /// Folder with one sub-folder per class (`fail`, `success`)
    images_folder: Option<PathBuf>,

    /// Take this many images from each class instead of the weighted draw
    #[arg(short, long)]
    dataset_size: Option<usize>,

    /// Time two epochs of the train loader for several worker counts
    #[arg(short, long)]
    test_num_workers: bool,

    /// JSON config file
    #[arg(short, long, default_value = "grasp_data.json")]
    config: PathBuf,

    /// Classes hold `rgb/` and `depth/` sub-folders with paired images
    #[arg(long)]
    depth: bool,

    /// Open the batch viewer
    #[arg(long)]
    view: bool,

    /// Trace-level logging for this crate
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = DataConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;
    if cli.dataset_size.is_some() {
        config.dataset_size = cli.dataset_size;
    }

    setup_logging(&config.log_dir, cli.verbose).context("Failed to set up logging")?;
    info!("Starting grasp-data");
    info!("{}", config_summary(&cli.config, &config));

    if cli.view {
        return run_viewer(config, cli.images_folder);
    }

    let Some(folder) = cli.images_folder else {
        bail!("An images folder is required unless --view is given");
    };

    if cli.depth {
        let dataset = RgbDepthFolder::open(&folder)?;
        let module = ImageDataModule::new(dataset, transform_image(), &config)?;
        run::<_, RgbDepthSubset<RgbDepthFolder, TransformImage>, _>(
            &module,
            cli.test_num_workers,
            |batch| {
                let shapes: Vec<_> = batch.iter().map(|s| s.rgb.shape()).collect();
                info!(
                    "First val batch: {} rgb + depth pairs, rgb shapes {:?}",
                    batch.len(),
                    shapes
                );
                Ok(())
            },
        )
    } else {
        let dataset = ImageFolder::open(&folder)?;
        let module = ImageDataModule::new(dataset, transform_image(), &config)?;
        run::<_, Subset<ImageFolder, TransformImage>, _>(
            &module,
            cli.test_num_workers,
            |batch| {
                let (tensors, labels) = collate(batch)?;
                info!("First val batch: shape {:?}, labels {:?}", tensors.shape(), labels);
                Ok(())
            },
        )
    }
}

/// Log the split sizes, then either show the first val batch or time the loader
fn run<'a, D, S, F>(
    module: &'a ImageDataModule<D, TransformImage>,
    test_num_workers: bool,
    show_batch: F,
) -> anyhow::Result<()>
where
    D: LabeledDataset,
    S: FromSubset<'a, D, TransformImage> + Fetch,
    F: FnOnce(Vec<S::Item>) -> grasp_data::Result<()>,
{
    let splits = module.splits();
    info!("Len Train Data {}", splits.train.len());
    info!("Len Val Data {}", splits.val.len());
    info!("Len Test Data {}", splits.test.len());

    if test_num_workers {
        return time_workers::<D, S>(module);
    }

    let val: DataLoader<S> = module.val_loader(None)?;
    if val.is_empty() {
        warn!("Validation split is empty, nothing to show");
        return Ok(());
    }
    show_batch(val.batch(0)?)?;
    Ok(())
}

/// Two epochs over the train split for 2, 4, ... workers below the CPU count
fn time_workers<'a, D, S>(module: &'a ImageDataModule<D, TransformImage>) -> anyhow::Result<()>
where
    D: LabeledDataset,
    S: FromSubset<'a, D, TransformImage> + Fetch,
{
    let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
    info!("Timing train loader with up to {} CPUs", cpus);

    for num_workers in (2..cpus).step_by(2) {
        let loader: DataLoader<S> = module.train_loader(Some(num_workers))?;
        let start = Instant::now();
        for _epoch in 0..2 {
            for batch in loader.batches() {
                batch?;
            }
        }
        info!("{}", timing_line(start.elapsed(), num_workers));
    }
    Ok(())
}

fn run_viewer(config: DataConfig, folder: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(folder) = &folder {
        ensure_dir(folder)?;
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Grasp Dataset Viewer"),
        ..Default::default()
    };

    info!("Launching viewer window");
    eframe::run_native(
        "Grasp Dataset Viewer",
        options,
        Box::new(|cc| {
            let mut fonts = egui::FontDefinitions::default();
            egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
            cc.egui_ctx.set_fonts(fonts);
            Ok(Box::new(BatchViewerApp::new(config, folder)))
        }),
    )
    .map_err(|e| anyhow!("Viewer failed: {}", e))
}

fn timing_line(elapsed: Duration, num_workers: usize) -> String {
    format!(
        "Finish with:{:.2} second, num_workers={}",
        elapsed.as_secs_f64(),
        num_workers
    )
}

/// Where the config came from and the settings that shape the splits.
/// Logged once logging is up, since the config decides the log directory.
fn config_summary(path: &Path, config: &DataConfig) -> String {
    let source = if path.is_file() {
        format!("Loaded config from {:?}", path)
    } else {
        format!("No config file at {:?}, using defaults", path)
    };
    format!(
        "{}: batch_size={}, num_workers={}, strategy={:?}, seed={}",
        source,
        config.batch_size,
        config.num_workers,
        config.balance_strategy(),
        config.seed
    )
}

fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    if !path.is_dir() {
        bail!("Not a directory: {:?}", path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grasp_data::core::analysis::BalanceStrategy;

    #[test]
    fn test_timing_line_in_seconds() {
        assert_eq!(
            timing_line(Duration::from_millis(1234), 4),
            "Finish with:1.23 second, num_workers=4"
        );
    }

    #[test]
    fn test_config_summary_reports_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grasp_data.json");
        let config = DataConfig {
            dataset_size: Some(30),
            ..DataConfig::default()
        };

        let missing = config_summary(&path, &config);
        assert!(missing.starts_with("No config file at"));
        assert!(missing.contains(&format!("{:?}", BalanceStrategy::PerClass { count: 30 })));

        config.save(&path).unwrap();
        let loaded = config_summary(&path, &config);
        assert!(loaded.starts_with("Loaded config from"));
        assert!(loaded.contains("batch_size=8"));
    }
}
