use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::ssh::expand_user_path;

/// Turn what the user typed into a file path; a directory gets the
/// remote file's name appended.
pub(crate) fn resolve_destination(input: &str, file_name: &str) -> PathBuf {
    let dest = expand_user_path(input.trim());
    if dest.is_dir() {
        dest.join(file_name)
    } else {
        dest
    }
}

pub(crate) fn absolute_parent(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).context("resolve absolute path")?;
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(absolute))
}

/// First of `name-1.ext`, `name-2.ext`, ... that does not exist yet.
pub(crate) fn auto_rename(dest: &Path) -> PathBuf {
    let stem = dest
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = dest
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let mut candidate = dest.to_path_buf();
    let mut counter = 0u64;
    while candidate.exists() {
        counter += 1;
        candidate = dest.with_file_name(format!("{stem}-{counter}{ext}"));
    }
    candidate
}
