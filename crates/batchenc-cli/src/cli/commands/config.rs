//! `batchenc config`: show config location and effective values.

use anyhow::Result;
use batchenc_core::config::{self, BatchencConfig};

pub fn run_config(cfg: &BatchencConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", cfg.to_toml_string()?);
    println!(
        "# effective parallelism: {} (detected CPUs: {})",
        cfg.effective_parallelism(),
        config::detected_parallelism()
    );
    Ok(())
}
