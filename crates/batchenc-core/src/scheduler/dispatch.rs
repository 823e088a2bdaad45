//! Bounded dispatch of conversion tasks.
//!
//! Jobs are launched in scan order, each only after a permit is acquired, so at
//! most `capacity` tasks run at once. Outcomes are sent on a channel in
//! completion order; the channel closes once every launched task has joined.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::encoder::{EncodeError, Encoder};

use super::job::{ConversionJob, JobState};
use super::permits::{Permit, PermitPool};
use super::task::{self, TaskError, TaskOutcome};

/// Launches one conversion task per job under a shared permit pool.
pub struct BoundedDispatcher<E> {
    pool: PermitPool,
    encoder: Arc<E>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

/// A running dispatch: outcomes arrive on `outcomes`; awaiting `driver` is the
/// join barrier for every launched task.
pub struct Dispatch {
    pub outcomes: mpsc::Receiver<TaskOutcome>,
    pub driver: JoinHandle<()>,
}

impl<E: Encoder> BoundedDispatcher<E> {
    pub fn new(
        pool: PermitPool,
        encoder: Arc<E>,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pool,
            encoder,
            timeout,
            cancel,
        }
    }

    /// Starts dispatching `jobs` (already in scan order) on a background task.
    pub fn dispatch(self, jobs: Vec<ConversionJob>) -> Dispatch {
        let (tx, rx) = mpsc::channel(jobs.len().max(1));
        let driver = tokio::spawn(self.drive(jobs, tx));
        Dispatch {
            outcomes: rx,
            driver,
        }
    }

    fn launch(&self, set: &mut JoinSet<TaskOutcome>, job: ConversionJob, permit: Permit) {
        let encoder = Arc::clone(&self.encoder);
        let cancel = self.cancel.clone();
        let timeout = self.timeout;
        let ordinal = job.ordinal;
        let source = job.source.path.clone();
        tracing::debug!(ordinal, state = %JobState::Dispatched, source = %source.display(), "launching");

        set.spawn(async move {
            // The permit lives in this outer task, so it is freed even if the
            // conversion below panics.
            let _permit = permit;
            let work = tokio::spawn(async move {
                task::run_conversion(job, encoder.as_ref(), timeout, &cancel).await
            });
            let outcome = match work.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(ordinal, source = %source.display(), error = %e, "conversion task aborted");
                    TaskOutcome::failed(ordinal, source, TaskError::Panicked(e.to_string()))
                }
            };
            tracing::debug!(ordinal, state = %JobState::Released, "permit released");
            outcome
        });
    }

    async fn drive(self, jobs: Vec<ConversionJob>, tx: mpsc::Sender<TaskOutcome>) {
        let mut pending = jobs.into_iter();
        let mut set: JoinSet<TaskOutcome> = JoinSet::new();
        let mut next = pending.next();

        while let Some(job) = next.take() {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    // Nothing more is launched; the rest are reported as cancelled.
                    for job in std::iter::once(job).chain(pending.by_ref()) {
                        tracing::info!(ordinal = job.ordinal, source = %job.source.path.display(), "not started: batch cancelled");
                        let outcome = TaskOutcome::failed(job.ordinal, job.source.path, EncodeError::Cancelled);
                        let _ = tx.send(outcome).await;
                    }
                    break;
                }
                Some(joined) = set.join_next(), if !set.is_empty() => {
                    forward(joined, &tx).await;
                    next = Some(job);
                }
                permit = self.pool.acquire() => {
                    self.launch(&mut set, job, permit);
                    next = pending.next();
                }
            }
        }

        while let Some(joined) = set.join_next().await {
            forward(joined, &tx).await;
        }
    }
}

async fn forward(
    joined: Result<TaskOutcome, tokio::task::JoinError>,
    tx: &mpsc::Sender<TaskOutcome>,
) {
    match joined {
        Ok(outcome) => {
            if tx.send(outcome).await.is_err() {
                tracing::debug!("outcome receiver dropped");
            }
        }
        Err(e) => tracing::error!(error = %e, "dispatch wrapper task failed"),
    }
}
