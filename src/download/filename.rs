//! Filename sanitization and unique path resolution for saved downloads.

use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_FILENAME;

/// Characters replaced by `_`: path separators and names reserved on common filesystems.
const RESERVED: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Name a blob is saved under, always a single plain path segment.
///
/// Names left with nothing but dots and underscores (`.`, `..`, an empty
/// suggestion) fall back to the default filename.
fn save_name(suggested: &str) -> String {
    let name: String = suggested
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    if name.chars().all(|c| c == '.' || c == '_') {
        DEFAULT_FILENAME.to_string()
    } else {
        name
    }
}

/// Picks a path under `dir` for `suggested` that does not exist yet.
///
/// `file.pdf`, then `file_1.pdf`, `file_2.pdf`, ...
pub(crate) fn resolve_unique_path(dir: &Path, suggested: &str) -> PathBuf {
    let name = save_name(suggested);
    let first = dir.join(&name);
    if !first.exists() {
        return first;
    }

    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name.as_str(), ""),
    };
    (1..)
        .map(|n| dir.join(format!("{stem}_{n}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}
