//! Batch scheduler.
//!
//! Coordinates one batch run: scan -> plan jobs (ordinals) -> bounded dispatch
//! under a permit pool -> per-file conversion task -> aggregated result.

mod batch;
mod dispatch;
mod job;
mod permits;
mod progress;
mod task;

pub use batch::{plan_jobs, run_batch, BatchError, BatchRequest, BatchResult, ConvertedFile, FailedFile};
pub use dispatch::{BoundedDispatcher, Dispatch};
pub use job::{ConversionJob, JobState};
pub use permits::{Permit, PermitPool};
pub use progress::BatchProgress;
pub use task::{run_conversion, TaskError, TaskOutcome};
