//! Batch progress reporting (files done, rate, ETA).
//!
//! Sent by the coordinator after each task completes so the CLI can print a
//! running tally.

use std::path::PathBuf;

/// Snapshot of batch progress, taken right after one file finished.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    /// Files finished so far (success or failure).
    pub completed: usize,
    /// Eligible files in the batch.
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Elapsed time since the batch started (seconds).
    pub elapsed_secs: f64,
    /// The file that just finished.
    pub source: PathBuf,
    /// Its output path, if it succeeded.
    pub output: Option<PathBuf>,
    /// Its error message, if it failed.
    pub error: Option<String>,
}

impl BatchProgress {
    /// Files finished per second (0 if elapsed is 0).
    pub fn files_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.completed as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if no rate yet).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total.saturating_sub(self.completed);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.files_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(completed: usize, total: usize, elapsed_secs: f64) -> BatchProgress {
        BatchProgress {
            completed,
            total,
            succeeded: completed,
            failed: 0,
            elapsed_secs,
            source: PathBuf::from("a.flac"),
            output: Some(PathBuf::from("a.m4a")),
            error: None,
        }
    }

    #[test]
    fn rate_and_eta() {
        let p = snapshot(4, 10, 2.0);
        assert!((p.files_per_sec() - 2.0).abs() < 1e-9);
        assert!((p.eta_secs().unwrap() - 3.0).abs() < 1e-9);
        assert!((p.fraction() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn no_rate_without_elapsed_time() {
        let p = snapshot(1, 10, 0.0);
        assert_eq!(p.files_per_sec(), 0.0);
        assert!(p.eta_secs().is_none());
    }

    #[test]
    fn finished_batch() {
        let p = snapshot(10, 10, 5.0);
        assert_eq!(p.eta_secs(), Some(0.0));
        assert_eq!(p.fraction(), 1.0);
        assert_eq!(snapshot(0, 0, 0.0).fraction(), 1.0);
    }
}
