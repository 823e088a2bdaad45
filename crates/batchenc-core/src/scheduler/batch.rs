//! Batch coordination: scan, dispatch, join, and tally.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::BatchencConfig;
use crate::encoder::Encoder;
use crate::scanner::{self, ScanError, SourceFile};

use super::dispatch::BoundedDispatcher;
use super::job::{ConversionJob, JobState};
use super::permits::PermitPool;
use super::progress::BatchProgress;
use super::task::{TaskError, TaskOutcome};

/// What to convert and how to name it.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    /// Forwarded verbatim to the encoder.
    pub quality: String,
    /// Prefix outputs with their two-digit scan ordinal.
    pub sequential: bool,
}

/// Errors that stop a batch before any file is dispatched.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("cannot create destination directory {}: {source}", path.display())]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file that converted successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    pub ordinal: usize,
    pub source: PathBuf,
    pub output: PathBuf,
}

/// A file that did not convert.
#[derive(Debug)]
pub struct FailedFile {
    pub ordinal: usize,
    pub source: PathBuf,
    pub error: TaskError,
}

/// Aggregate outcome of one batch. Failures are data, not errors.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// Eligible files found by the scan.
    pub total: usize,
    pub converted: Vec<ConvertedFile>,
    pub failures: Vec<FailedFile>,
    pub elapsed: Duration,
    /// Most encoder tasks observed running at once.
    pub peak_parallelism: usize,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.converted.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Files reported as cancelled rather than failed on their own.
    pub fn cancelled(&self) -> usize {
        self.failures.iter().filter(|f| f.error.is_cancelled()).count()
    }

    fn record(&mut self, outcome: TaskOutcome) {
        match outcome.result {
            Ok(output) => self.converted.push(ConvertedFile {
                ordinal: outcome.ordinal,
                source: outcome.source,
                output,
            }),
            Err(error) => self.failures.push(FailedFile {
                ordinal: outcome.ordinal,
                source: outcome.source,
                error,
            }),
        }
    }

    fn progress(&self, started: Instant, finished: &TaskOutcome) -> BatchProgress {
        let (output, error) = match &finished.result {
            Ok(path) => (Some(path.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        BatchProgress {
            completed: self.succeeded() + self.failed() + 1,
            total: self.total,
            succeeded: self.succeeded() + usize::from(finished.is_success()),
            failed: self.failed() + usize::from(!finished.is_success()),
            elapsed_secs: started.elapsed().as_secs_f64(),
            source: finished.source.clone(),
            output,
            error,
        }
    }
}

/// Assigns 1-based ordinals in scan order.
pub fn plan_jobs(
    files: Vec<SourceFile>,
    request: &BatchRequest,
    output_extension: &str,
) -> Vec<ConversionJob> {
    files
        .into_iter()
        .enumerate()
        .map(|(i, source)| {
            tracing::debug!(ordinal = i + 1, state = %JobState::Queued, source = %source.path.display(), "planned");
            ConversionJob {
                ordinal: i + 1,
                source,
                dest_dir: request.dest_dir.clone(),
                quality: request.quality.clone(),
                sequential: request.sequential,
                output_extension: output_extension.trim_start_matches('.').to_string(),
            }
        })
        .collect()
}

async fn ensure_dest_dir(path: &Path) -> Result<(), BatchError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| BatchError::Destination {
            path: path.to_path_buf(),
            source,
        })
}

/// Converts every eligible file in `request.source_dir`.
///
/// Returns `Err` only if the source directory cannot be read or the
/// destination cannot be created; in both cases no encoder is started.
/// Otherwise every eligible file is accounted for in the result as either
/// converted or failed. If `progress_tx` is `Some`, a snapshot is sent after
/// each file finishes.
pub async fn run_batch<E: Encoder>(
    request: &BatchRequest,
    cfg: &BatchencConfig,
    encoder: Arc<E>,
    progress_tx: Option<mpsc::Sender<BatchProgress>>,
    cancel: CancellationToken,
) -> Result<BatchResult, BatchError> {
    let started = Instant::now();

    let files = scanner::scan_dir(&request.source_dir, &cfg.input_extension)?;
    ensure_dest_dir(&request.dest_dir).await?;

    let jobs = plan_jobs(files, request, &cfg.output_extension);
    let pool = PermitPool::new(cfg.effective_parallelism());
    tracing::info!(
        source_dir = %request.source_dir.display(),
        dest_dir = %request.dest_dir.display(),
        files = jobs.len(),
        parallelism = pool.capacity(),
        "starting batch"
    );

    let mut result = BatchResult {
        total: jobs.len(),
        ..BatchResult::default()
    };

    let dispatcher = BoundedDispatcher::new(pool.clone(), encoder, cfg.encode_timeout(), cancel);
    let mut dispatch = dispatcher.dispatch(jobs);

    while let Some(outcome) = dispatch.outcomes.recv().await {
        if let Some(tx) = progress_tx.as_ref() {
            let _ = tx.send(result.progress(started, &outcome)).await;
        }
        result.record(outcome);
    }
    if let Err(e) = dispatch.driver.await {
        tracing::error!(error = %e, "dispatcher join");
    }

    result.converted.sort_by_key(|c| c.ordinal);
    result.failures.sort_by_key(|f| f.ordinal);
    result.elapsed = started.elapsed();
    result.peak_parallelism = pool.peak();

    tracing::info!(
        total = result.total,
        succeeded = result.succeeded(),
        failed = result.failed(),
        elapsed_secs = result.elapsed.as_secs_f64(),
        "batch finished in {:.1}s: {} converted, {} failed",
        result.elapsed.as_secs_f64(),
        result.succeeded(),
        result.failed()
    );

    Ok(result)
}
