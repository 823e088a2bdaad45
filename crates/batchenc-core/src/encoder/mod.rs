//! External encoder invocation.
//!
//! The scheduler only sees the [`Encoder`] trait: given a source file, a
//! claimed output path, and a quality value, produce the output or fail with
//! an [`EncodeError`]. [`FfmpegEncoder`] is the production implementation.

mod error;
mod ffmpeg;

use std::future::Future;
use std::path::PathBuf;

pub use error::EncodeError;
pub use ffmpeg::FfmpegEncoder;

/// One encoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    pub source: PathBuf,
    /// Already claimed by the caller; the encoder overwrites the empty placeholder.
    pub output: PathBuf,
    /// Forwarded verbatim.
    pub quality: String,
}

/// Something that turns a source file into an encoded output file.
///
/// Dropping the returned future must stop the work (the ffmpeg implementation
/// kills its child process), since timeouts and cancellation are applied by
/// dropping it.
pub trait Encoder: Send + Sync + 'static {
    fn encode(
        &self,
        request: &EncodeRequest,
    ) -> impl Future<Output = Result<(), EncodeError>> + Send;
}
