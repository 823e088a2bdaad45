//! Per-file conversion job and its lifecycle states.

use std::path::PathBuf;

use crate::scanner::SourceFile;

/// One source file scheduled for conversion. Created at dispatch time.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// 1-based position in scan order.
    pub ordinal: usize,
    pub source: SourceFile,
    pub dest_dir: PathBuf,
    /// Forwarded verbatim to the encoder.
    pub quality: String,
    /// Prefix the output with the two-digit ordinal.
    pub sequential: bool,
    /// Output container extension (without dot).
    pub output_extension: String,
}

/// Lifecycle of a job: `Queued -> Dispatched -> Running -> Succeeded|Failed -> Released`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    /// Permit acquired, task launched.
    Dispatched,
    /// Encoder process active.
    Running,
    Succeeded,
    Failed,
    /// Permit returned to the pool.
    Released,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Dispatched => "dispatched",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Released => "released",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
