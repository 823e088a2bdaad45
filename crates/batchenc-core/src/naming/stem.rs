//! Output stem and candidate file names.
//!
//! Stems stay `OsStr` end to end so names that are not valid UTF-8 reach the
//! destination byte for byte.

use std::ffi::{OsStr, OsString};

/// Stem for a job's output: `"{ordinal:02} - {stem}"` in sequential mode,
/// otherwise the source stem unchanged.
pub fn output_stem(ordinal: usize, source_stem: &OsStr, sequential: bool) -> OsString {
    if !sequential {
        return source_stem.to_os_string();
    }
    let mut out = OsString::from(format!("{:02} - ", ordinal));
    out.push(source_stem);
    out
}

/// File name for the `counter`-th attempt: counter 0 is the bare name,
/// counter n > 0 is `"{stem} (Copy n).{ext}"`.
pub fn candidate_file_name(stem: &OsStr, counter: u32, extension: &str) -> OsString {
    let ext = extension.trim_start_matches('.');
    let mut name = stem.to_os_string();
    if counter > 0 {
        name.push(format!(" (Copy {})", counter));
    }
    if !ext.is_empty() {
        name.push(".");
        name.push(ext);
    }
    name
}
