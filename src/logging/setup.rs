use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::formatter::BracketedFormatter;
use crate::error::Result;

/// Default filter: this crate at `debug`, everything else at `info`, and the
/// chatty windowing crates at `warn`
fn default_filter(verbose: bool) -> EnvFilter {
    let own_level = if verbose { "trace" } else { "debug" };
    let mut filter = EnvFilter::new(format!("info,grasp_data={}", own_level));
    for directive in ["winit=warn", "egui=warn", "eframe=warn", "wgpu=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Log to stdout and to a timestamped file in `log_dir`.
///
/// `RUST_LOG` overrides the default filter. Returns the log file path.
pub fn setup_logging(log_dir: &Path, verbose: bool) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("grasp_data_{}.log", timestamp));

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)?;

    let file_layer = fmt::layer()
        .event_format(BracketedFormatter)
        .with_writer(Mutex::new(file))
        .with_ansi(false);

    let stdout_layer = fmt::layer()
        .event_format(BracketedFormatter)
        .with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose)))
        .with(file_layer)
        .with(stdout_layer)
        .init();

    info!("Log file created at: {:?}", log_path);
    Ok(log_path)
}
