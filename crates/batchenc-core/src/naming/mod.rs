//! Output naming and collision resolution.
//!
//! Derives the output stem for a job (plain or ordinal-prefixed) and claims a
//! destination path that no other file in the directory occupies, appending
//! `" (Copy n)"` until a free name is found.

mod claim;
mod stem;

pub use claim::{claim_output_path, OutputPath, PathProbeError};
pub use stem::{candidate_file_name, output_stem};
