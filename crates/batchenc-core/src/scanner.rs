//! Source directory scanning.
//!
//! Lists the files of one directory (non-recursive) whose extension matches the
//! configured input format. Order is whatever the filesystem enumerates; it
//! fixes the ordinals used for sequential naming and nothing else.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory could not be listed. Fatal to the batch.
#[derive(Debug, thiserror::Error)]
#[error("cannot read source directory {}: {source}", path.display())]
pub struct ScanError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl ScanError {
    /// Underlying I/O kind (`NotFound`, `PermissionDenied`, ...).
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

/// One eligible source file, discovered once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File name without the extension, as stored on disk.
    pub stem: OsString,
    /// Extension as found on disk (original case).
    pub extension: String,
}

impl SourceFile {
    fn from_path(path: PathBuf) -> Option<Self> {
        let stem = path.file_stem()?.to_os_string();
        let extension = path.extension()?.to_string_lossy().into_owned();
        Some(Self {
            path,
            stem,
            extension,
        })
    }
}

/// Returns true if `path` has `extension` (compared ASCII case-insensitively,
/// with or without a leading dot in `extension`).
pub fn has_extension(path: &Path, extension: &str) -> bool {
    let wanted = extension.trim_start_matches('.');
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(wanted))
}

/// Lists eligible files in `dir`. Subdirectories are never descended into or
/// returned. Entries whose metadata cannot be read are skipped with a warning.
pub fn scan_dir(dir: &Path, input_extension: &str) -> Result<Vec<SourceFile>, ScanError> {
    let entries = fs::read_dir(dir).map_err(|source| ScanError {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if !has_extension(&path, input_extension) {
            continue;
        }
        // fs::metadata follows symlinks so a link to a file counts as a file.
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping entry with unreadable metadata");
                continue;
            }
        }
        if let Some(file) = SourceFile::from_path(path) {
            files.push(file);
        }
    }

    tracing::debug!(dir = %dir.display(), count = files.len(), "scanned source directory");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_extension(Path::new("a.flac"), "flac"));
        assert!(has_extension(Path::new("a.FLAC"), "flac"));
        assert!(has_extension(Path::new("a.Flac"), ".flac"));
        assert!(!has_extension(Path::new("a.flac.txt"), "flac"));
        assert!(!has_extension(Path::new("flac"), "flac"));
    }

    #[test]
    fn lists_only_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "one.flac");
        touch(dir.path(), "two.FLAC");
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("disc2.flac")).unwrap();
        touch(&dir.path().join("disc2.flac"), "nested.flac");

        let mut found: Vec<String> = scan_dir(dir.path(), "flac")
            .unwrap()
            .into_iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        found.sort();
        assert_eq!(found, vec!["one.flac", "two.FLAC"]);
    }

    #[test]
    fn source_file_fields() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "My Song.FLAC");
        let files = scan_dir(dir.path(), "flac").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].stem, "My Song");
        assert_eq!(files[0].extension, "FLAC");
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_dir(dir.path(), "flac").unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_dir(&dir.path().join("missing"), "flac").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn file_instead_of_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "plain.flac");
        assert!(scan_dir(&dir.path().join("plain.flac"), "flac").is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_stem_is_preserved() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"caf\xe9.flac")), b"x").unwrap();
        let files = scan_dir(dir.path(), "flac").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].stem.as_bytes(), b"caf\xe9");
    }
}
