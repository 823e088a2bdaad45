//! Encoder error type.

use std::fmt;
use std::time::Duration;

/// Why a single encode did not produce an output file.
#[derive(Debug)]
pub enum EncodeError {
    /// The encoder process could not be started (missing binary, permissions).
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// Waiting on the running process failed.
    Wait(std::io::Error),
    /// The encoder exited unsuccessfully. `code` is None when killed by a signal.
    Exit {
        code: Option<i32>,
        /// Last lines of the encoder's stderr, for diagnostics.
        stderr: String,
    },
    /// The per-file timeout elapsed; the process was killed.
    TimedOut(Duration),
    /// The batch was cancelled before or while this file was encoding.
    Cancelled,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Spawn { program, source } => {
                write!(f, "failed to start encoder '{}': {}", program, source)
            }
            EncodeError::Wait(e) => write!(f, "waiting for encoder: {}", e),
            EncodeError::Exit { code, stderr } => {
                match code {
                    Some(c) => write!(f, "encoder exited with status {}", c)?,
                    None => write!(f, "encoder terminated by signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            EncodeError::TimedOut(d) => write!(f, "encoder timed out after {}s", d.as_secs()),
            EncodeError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Spawn { source, .. } => Some(source),
            EncodeError::Wait(e) => Some(e),
            EncodeError::Exit { .. } | EncodeError::TimedOut(_) | EncodeError::Cancelled => None,
        }
    }
}
