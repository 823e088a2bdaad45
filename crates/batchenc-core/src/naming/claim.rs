//! Claiming a collision-free destination path.
//!
//! Each candidate is created with `create_new`, so the existence check and the
//! claim are one atomic step: two tasks with the same stem can never both win
//! the same name, and an existing file is never opened for writing.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use super::stem::candidate_file_name;

/// Gives up after this many `(Copy n)` variants.
const MAX_COPIES: u32 = 9_999;

/// A destination path this task now owns (an empty file exists there).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath {
    pub path: PathBuf,
    /// 0 for the bare name, n for `(Copy n)`.
    pub counter: u32,
}

/// Probing or creating a candidate failed for a reason other than "already
/// exists" (e.g. permission denied). The path must not be treated as free.
#[derive(Debug, thiserror::Error)]
#[error("cannot claim output path {}: {source}", path.display())]
pub struct PathProbeError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Claims the lowest-numbered free name for `stem` + `extension` in `dest_dir`.
pub async fn claim_output_path(
    dest_dir: &Path,
    stem: &OsStr,
    extension: &str,
) -> Result<OutputPath, PathProbeError> {
    let mut counter = 0u32;
    loop {
        let path = dest_dir.join(candidate_file_name(stem, counter, extension));
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(_) => {
                if counter > 0 {
                    tracing::debug!(path = %path.display(), counter, "resolved name collision");
                }
                return Ok(OutputPath { path, counter });
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if counter >= MAX_COPIES {
                    return Err(PathProbeError {
                        path,
                        source: io::Error::new(
                            io::ErrorKind::AlreadyExists,
                            format!("more than {} copies already exist", MAX_COPIES),
                        ),
                    });
                }
                counter += 1;
            }
            Err(source) => return Err(PathProbeError { path, source }),
        }
    }
}
