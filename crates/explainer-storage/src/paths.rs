//! Repository-relative path handling
//!
//! All repository paths are relative and `/`-separated. Anything that could
//! climb out of the repository root is rejected outright.

use crate::traits::{StorageError, StorageResult};

/// Normalize a repository-relative path.
///
/// Empty and `.` segments are dropped (`./src//lib.rs` becomes `src/lib.rs`).
/// Absolute paths, `..` segments, backslashes, NUL bytes and drive prefixes are
/// rejected with `PathRejected`.
pub fn normalize_relative_path(raw: &str) -> StorageResult<String> {
    if raw.is_empty() {
        return Err(StorageError::PathRejected("empty path".to_string()));
    }
    if raw.starts_with('/') {
        return Err(StorageError::PathRejected(format!(
            "absolute path not allowed: {}",
            raw
        )));
    }
    if raw.contains('\\') || raw.contains('\0') {
        return Err(StorageError::PathRejected(format!(
            "path contains forbidden characters: {}",
            raw.escape_debug()
        )));
    }

    let mut segments = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StorageError::PathRejected(format!(
                    "parent directory segment not allowed: {}",
                    raw
                )))
            }
            s if is_drive_prefix(s) && segments.is_empty() => {
                return Err(StorageError::PathRejected(format!(
                    "drive prefix not allowed: {}",
                    raw
                )))
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(StorageError::PathRejected(format!(
            "path names the repository root: {}",
            raw
        )));
    }

    Ok(segments.join("/"))
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
