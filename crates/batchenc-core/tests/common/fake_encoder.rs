//! In-process encoder for scheduler tests.
//!
//! Writes `encoded:<source bytes>` to the output and records how many encodes
//! ran at the same time. Sources whose file name contains "bad" fail; names
//! containing "panic" make the encode panic.

use std::collections::HashMap;
use std::ffi::OsString;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use batchenc_core::encoder::{EncodeError, EncodeRequest, Encoder};

#[derive(Debug, Default)]
pub struct Stats {
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

pub struct FakeEncoder {
    pub stats: Arc<Stats>,
    delay: Duration,
    /// Per-source-file-name overrides of `delay`.
    delays: HashMap<OsString, Duration>,
}

impl FakeEncoder {
    pub fn new(delay: Duration) -> Self {
        Self {
            stats: Arc::new(Stats::default()),
            delay,
            delays: HashMap::new(),
        }
    }

    /// Encodes of the source named `file_name` take `delay` instead.
    pub fn with_delay_for(mut self, file_name: impl Into<OsString>, delay: Duration) -> Self {
        self.delays.insert(file_name.into(), delay);
        self
    }

    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn calls(&self) -> usize {
        self.stats.calls.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight counter even when the encode future is dropped.
struct InFlight(Arc<Stats>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Encoder for FakeEncoder {
    fn encode(
        &self,
        request: &EncodeRequest,
    ) -> impl Future<Output = Result<(), EncodeError>> + Send {
        let stats = Arc::clone(&self.stats);
        let delay = request
            .source
            .file_name()
            .and_then(|n| self.delays.get(n))
            .copied()
            .unwrap_or(self.delay);
        let request = request.clone();
        async move {
            stats.calls.fetch_add(1, Ordering::SeqCst);
            let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            stats.peak.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(Arc::clone(&stats));

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let name = request
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if name.contains("panic") {
                panic!("fake encoder panicked on {}", name);
            }
            if name.contains("bad") {
                return Err(EncodeError::Exit {
                    code: Some(1),
                    stderr: "Invalid data found when processing input".to_string(),
                });
            }

            let mut body = b"encoded:".to_vec();
            body.extend(tokio::fs::read(&request.source).await.map_err(EncodeError::Wait)?);
            tokio::fs::write(&request.output, body)
                .await
                .map_err(EncodeError::Wait)
        }
    }
}
