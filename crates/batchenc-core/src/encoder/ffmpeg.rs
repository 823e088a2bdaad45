//! ffmpeg-backed encoder.

use std::ffi::OsString;
use std::future::Future;
use std::process::Stdio;

use crate::config::BatchencConfig;

use super::{EncodeError, EncodeRequest, Encoder};

/// Keep at most this many trailing stderr lines in an [`EncodeError::Exit`].
const STDERR_TAIL_LINES: usize = 8;

/// Runs the configured encoder program with a fixed ffmpeg argument set.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: String,
    audio_codec: String,
    quality_flag: String,
}

impl FfmpegEncoder {
    pub fn new(
        program: impl Into<String>,
        audio_codec: impl Into<String>,
        quality_flag: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            audio_codec: audio_codec.into(),
            quality_flag: quality_flag.into(),
        }
    }

    pub fn from_config(cfg: &BatchencConfig) -> Self {
        Self::new(&cfg.encoder_program, &cfg.audio_codec, &cfg.quality_flag)
    }

    /// Argument list for one invocation.
    ///
    /// Every input stream and all metadata are mapped, attached images are
    /// copied and flagged as cover art, and negative timestamps are shifted to
    /// zero. `-y` is required because the output path was claimed by creating
    /// an empty file there.
    pub fn build_args(&self, request: &EncodeRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-y",
            "-i",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(request.source.clone().into_os_string());
        for a in [
            "-map",
            "0",
            "-map_metadata",
            "0",
            "-c:a",
            self.audio_codec.as_str(),
            self.quality_flag.as_str(),
            request.quality.as_str(),
            "-c:v",
            "copy",
            "-disposition:v",
            "attached_pic",
            "-avoid_negative_ts",
            "make_zero",
        ] {
            args.push(OsString::from(a));
        }
        args.push(request.output.clone().into_os_string());
        args
    }
}

fn stderr_tail(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("; ")
}

impl Encoder for FfmpegEncoder {
    fn encode(
        &self,
        request: &EncodeRequest,
    ) -> impl Future<Output = Result<(), EncodeError>> + Send {
        let args = self.build_args(request);
        let program = self.program.clone();
        async move {
            let child = tokio::process::Command::new(&program)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| EncodeError::Spawn {
                    program: program.clone(),
                    source,
                })?;

            let output = child.wait_with_output().await.map_err(EncodeError::Wait)?;
            if output.status.success() {
                Ok(())
            } else {
                Err(EncodeError::Exit {
                    code: output.status.code(),
                    stderr: stderr_tail(&output.stderr),
                })
            }
        }
    }
}
