//! One conversion: claim an output name, run the encoder, report the outcome.

use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::encoder::{EncodeError, EncodeRequest, Encoder};
use crate::naming::{self, PathProbeError};

use super::job::{ConversionJob, JobState};

/// Why one file failed. Never fatal to the batch.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    PathProbe(#[from] PathProbeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// The task itself panicked; its permit was still released.
    #[error("conversion task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Encode(EncodeError::Cancelled))
    }
}

/// Result of one job, sent back to the coordinator.
#[derive(Debug)]
pub struct TaskOutcome {
    pub ordinal: usize,
    pub source: PathBuf,
    /// The claimed output path on success.
    pub result: Result<PathBuf, TaskError>,
}

impl TaskOutcome {
    pub fn failed(ordinal: usize, source: PathBuf, error: impl Into<TaskError>) -> Self {
        Self {
            ordinal,
            source,
            result: Err(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs the encoder for `request`, honouring the optional timeout and the
/// batch cancellation token. Both stop the encoder by dropping its future.
async fn encode_bounded<E: Encoder>(
    encoder: &E,
    request: &EncodeRequest,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<(), EncodeError> {
    let work = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, encoder.encode(request))
                .await
                .unwrap_or(Err(EncodeError::TimedOut(limit))),
            None => encoder.encode(request).await,
        }
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EncodeError::Cancelled),
        res = work => res,
    }
}

/// An output path this task claimed. Dropped without [`ClaimedOutput::keep`]
/// (error, cancellation, unwinding) it removes the file.
struct ClaimedOutput {
    path: PathBuf,
    armed: bool,
}

impl ClaimedOutput {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ClaimedOutput {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(output = %self.path.display(), error = %e, "could not remove failed output");
            }
        }
    }
}

/// Converts one file. The source is never modified.
pub async fn run_conversion<E: Encoder>(
    job: ConversionJob,
    encoder: &E,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> TaskOutcome {
    let ordinal = job.ordinal;
    let source = job.source.path.clone();

    if cancel.is_cancelled() {
        tracing::info!(ordinal, source = %source.display(), "skipped: batch cancelled");
        return TaskOutcome::failed(ordinal, source, EncodeError::Cancelled);
    }

    let stem = naming::output_stem(ordinal, &job.source.stem, job.sequential);
    let claimed = match naming::claim_output_path(&job.dest_dir, &stem, &job.output_extension).await
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(ordinal, source = %source.display(), error = %e, "failed: output path unavailable");
            return TaskOutcome::failed(ordinal, source, e);
        }
    };

    let claimed = ClaimedOutput::new(claimed.path);

    let request = EncodeRequest {
        source: source.clone(),
        output: claimed.path.clone(),
        quality: job.quality.clone(),
    };
    tracing::debug!(
        ordinal,
        state = %JobState::Running,
        source = %source.display(),
        output = %claimed.path.display(),
        "encoding"
    );

    let started = std::time::Instant::now();
    match encode_bounded(encoder, &request, timeout, cancel).await {
        Ok(()) => {
            tracing::info!(
                ordinal,
                state = %JobState::Succeeded,
                source = %source.display(),
                output = %claimed.path.display(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "converted"
            );
            TaskOutcome {
                ordinal,
                source,
                result: Ok(claimed.keep()),
            }
        }
        Err(e) => {
            drop(claimed);
            tracing::error!(
                ordinal,
                state = %JobState::Failed,
                source = %source.display(),
                error = %e,
                "conversion failed"
            );
            TaskOutcome::failed(ordinal, source, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::SourceFile;
    use std::future::Future;
    use std::path::Path;

    /// Copies the source to the output; fails for sources named "bad*"; can stall.
    struct CopyEncoder {
        stall: Option<Duration>,
    }

    impl Encoder for CopyEncoder {
        fn encode(
            &self,
            request: &EncodeRequest,
        ) -> impl Future<Output = Result<(), EncodeError>> + Send {
            let request = request.clone();
            let stall = self.stall;
            async move {
                if let Some(d) = stall {
                    tokio::time::sleep(d).await;
                }
                let name = request.source.file_name().unwrap().to_string_lossy().into_owned();
                if name.starts_with("bad") {
                    return Err(EncodeError::Exit {
                        code: Some(1),
                        stderr: "corrupt input".into(),
                    });
                }
                tokio::fs::copy(&request.source, &request.output)
                    .await
                    .map(|_| ())
                    .map_err(EncodeError::Wait)
            }
        }
    }

    struct PanickingEncoder;

    impl Encoder for PanickingEncoder {
        fn encode(
            &self,
            request: &EncodeRequest,
        ) -> impl Future<Output = Result<(), EncodeError>> + Send {
            let source = request.source.clone();
            async move {
                if source.exists() {
                    panic!("encoder blew up on {}", source.display());
                }
                Ok(())
            }
        }
    }

    fn job(src_dir: &Path, dest: &Path, name: &str, ordinal: usize, sequential: bool) -> ConversionJob {
        let path = src_dir.join(name);
        std::fs::write(&path, name.as_bytes()).unwrap();
        ConversionJob {
            ordinal,
            source: SourceFile {
                stem: path.file_stem().unwrap().to_os_string(),
                extension: "flac".into(),
                path,
            },
            dest_dir: dest.to_path_buf(),
            quality: "256k".into(),
            sequential,
            output_extension: "m4a".into(),
        }
    }

    #[tokio::test]
    async fn success_writes_named_output() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let enc = CopyEncoder { stall: None };

        let out = run_conversion(job(src.path(), dest.path(), "song.flac", 3, true), &enc, None, &cancel).await;
        let path = out.result.unwrap();
        assert_eq!(path, dest.path().join("03 - song.m4a"));
        assert_eq!(std::fs::read(&path).unwrap(), b"song.flac");
        assert!(src.path().join("song.flac").exists());
    }

    #[tokio::test]
    async fn failure_leaves_source_and_frees_name() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let enc = CopyEncoder { stall: None };

        let out = run_conversion(job(src.path(), dest.path(), "bad.flac", 1, false), &enc, None, &cancel).await;
        assert!(matches!(out.result, Err(TaskError::Encode(EncodeError::Exit { .. }))));
        assert!(src.path().join("bad.flac").exists());
        assert!(!dest.path().join("bad.m4a").exists());
    }

    #[tokio::test]
    async fn timeout_fails_the_task() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let enc = CopyEncoder {
            stall: Some(Duration::from_secs(30)),
        };

        let out = run_conversion(
            job(src.path(), dest.path(), "slow.flac", 1, false),
            &enc,
            Some(Duration::from_millis(50)),
            &cancel,
        )
        .await;
        assert!(matches!(out.result, Err(TaskError::Encode(EncodeError::TimedOut(_)))));
        assert!(!dest.path().join("slow.m4a").exists());
    }

    #[tokio::test]
    async fn cancellation_interrupts_running_encode() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let enc = CopyEncoder {
            stall: Some(Duration::from_secs(30)),
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.cancel();
        });
        let out = run_conversion(job(src.path(), dest.path(), "long.flac", 1, false), &enc, None, &cancel).await;
        let err = out.result.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn unwritable_destination_is_a_probe_failure() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let missing = dest.path().join("gone");
        let cancel = CancellationToken::new();
        let enc = CopyEncoder { stall: None };

        let out = run_conversion(job(src.path(), &missing, "song.flac", 1, false), &enc, None, &cancel).await;
        assert!(matches!(out.result, Err(TaskError::PathProbe(_))));
    }

    #[tokio::test]
    async fn panic_after_claim_removes_the_placeholder() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let job = job(src.path(), dest.path(), "song.flac", 1, false);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(async move { run_conversion(job, &PanickingEncoder, None, &cancel).await });
        assert!(handle.await.unwrap_err().is_panic());
        assert!(!dest.path().join("song.m4a").exists());
        assert_eq!(std::fs::read_dir(dest.path()).unwrap().count(), 0);
    }
}
