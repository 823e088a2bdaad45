//! CLI command handlers, one per file.

mod config;
mod convert;
mod scan;

pub use config::run_config;
pub use convert::{run_convert, ConvertArgs};
pub use scan::run_scan;
