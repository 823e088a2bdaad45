//! `batchenc scan`: list eligible files in a directory.

use anyhow::Result;
use batchenc_core::config::BatchencConfig;
use batchenc_core::scanner;
use std::path::Path;

pub fn run_scan(cfg: &BatchencConfig, dir: &Path) -> Result<()> {
    let files = scanner::scan_dir(dir, &cfg.input_extension)?;
    if files.is_empty() {
        println!("No .{} files in {}.", cfg.input_extension, dir.display());
        return Ok(());
    }
    println!("{:<4} {}", "#", "FILE");
    for (i, f) in files.iter().enumerate() {
        let name = f
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("{:<4} {}", format!("{:02}", i + 1), name);
    }
    Ok(())
}
