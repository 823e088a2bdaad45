//! CLI for batchenc.

mod commands;

use anyhow::Result;
use batchenc_core::config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_config, run_convert, run_scan, ConvertArgs};

/// Top-level CLI for batchenc.
#[derive(Debug, Parser)]
#[command(name = "batchenc")]
#[command(about = "batchenc: convert a directory of lossless audio files in parallel", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Convert every eligible file in SOURCE_DIR into DEST_DIR.
    Convert {
        /// Directory holding the source files (not searched recursively).
        source_dir: PathBuf,

        /// Directory for the encoded files (created if missing).
        dest_dir: PathBuf,

        /// Quality value passed to the encoder as-is (default from config).
        #[arg(long, short)]
        quality: Option<String>,

        /// Prefix outputs with their position in the directory listing ("01 - name").
        #[arg(long)]
        sequential: bool,

        /// Run at most N encoders at once (default: number of CPUs).
        #[arg(long, short, value_name = "N")]
        jobs: Option<usize>,

        /// Kill an encoder that runs longer than SECS.
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// List the files `convert` would process, with their ordinals.
    Scan {
        /// Directory to list.
        dir: PathBuf,
    },

    /// Show the config file location and effective settings.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Convert {
                source_dir,
                dest_dir,
                quality,
                sequential,
                jobs,
                timeout,
            } => {
                let args = ConvertArgs {
                    source_dir,
                    dest_dir,
                    quality,
                    sequential,
                    jobs,
                    timeout,
                };
                run_convert(&cfg, args).await?;
            }
            CliCommand::Scan { dir } => run_scan(&cfg, &dir)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
