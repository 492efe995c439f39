//! Logging setup for the grasp dataset tools
//!
//! - Bracketed event formatting
//! - Dual logging (file + stdout)
//! - Timestamped log files

mod formatter;
mod setup;

pub use formatter::BracketedFormatter;
pub use setup::setup_logging;
