//! `batchenc convert`: run one batch and print progress and a summary.

use anyhow::{Context, Result};
use batchenc_core::config::BatchencConfig;
use batchenc_core::encoder::FfmpegEncoder;
use batchenc_core::scheduler::{self, BatchProgress, BatchRequest};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Arguments of `batchenc convert`, as parsed.
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub quality: Option<String>,
    pub sequential: bool,
    pub jobs: Option<usize>,
    pub timeout: Option<u64>,
}

/// Config for this run: command-line values override the file.
pub(crate) fn effective_config(cfg: &BatchencConfig, args: &ConvertArgs) -> BatchencConfig {
    let mut cfg = cfg.clone();
    if let Some(jobs) = args.jobs {
        cfg.max_parallel = Some(jobs);
    }
    if let Some(secs) = args.timeout {
        cfg.encode_timeout_secs = Some(secs);
    }
    if args.sequential {
        cfg.sequential_naming = true;
    }
    cfg
}

pub(crate) fn batch_request(cfg: &BatchencConfig, args: &ConvertArgs) -> BatchRequest {
    BatchRequest {
        source_dir: args.source_dir.clone(),
        dest_dir: args.dest_dir.clone(),
        quality: args
            .quality
            .clone()
            .unwrap_or_else(|| cfg.default_quality.clone()),
        sequential: cfg.sequential_naming,
    }
}

fn print_progress(p: &BatchProgress) {
    let name = p
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let eta = p
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    match (&p.output, &p.error) {
        (Some(out), _) => println!(
            "[{}/{}] ok    {} -> {}  (ETA {})",
            p.completed,
            p.total,
            name,
            out.display(),
            eta
        ),
        (None, Some(err)) => println!(
            "[{}/{}] FAIL  {}: {}  (ETA {})",
            p.completed, p.total, name, err, eta
        ),
        (None, None) => println!("[{}/{}] {}", p.completed, p.total, name),
    }
}

pub async fn run_convert(cfg: &BatchencConfig, args: ConvertArgs) -> Result<()> {
    let cfg = effective_config(cfg, &args);
    let request = batch_request(&cfg, &args);
    let encoder = Arc::new(FfmpegEncoder::from_config(&cfg));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ninterrupted: stopping encoders...");
                tracing::warn!("ctrl-c received, cancelling batch");
                cancel.cancel();
            }
        });
    }

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<BatchProgress>(16);
    let progress_handle = tokio::spawn(async move {
        while let Some(p) = progress_rx.recv().await {
            print_progress(&p);
        }
    });

    println!(
        "Converting .{} files from {} to {} (.{}, {} parallel)",
        cfg.input_extension,
        request.source_dir.display(),
        request.dest_dir.display(),
        cfg.output_extension,
        cfg.effective_parallelism()
    );

    let result = scheduler::run_batch(&request, &cfg, encoder, Some(progress_tx), cancel)
        .await
        .with_context(|| format!("batch from {}", request.source_dir.display()))?;
    let _ = progress_handle.await;

    if result.total == 0 {
        println!("No .{} files found.", cfg.input_extension);
        return Ok(());
    }

    println!(
        "Done in {:.1}s: {} converted, {} failed (of {}).",
        result.elapsed.as_secs_f64(),
        result.succeeded(),
        result.failed(),
        result.total
    );
    if result.cancelled() > 0 {
        println!("{} file(s) were cancelled.", result.cancelled());
    }
    for f in result.failures.iter().filter(|f| !f.error.is_cancelled()) {
        println!("  failed: {}: {}", f.source.display(), f.error);
    }
    Ok(())
}
