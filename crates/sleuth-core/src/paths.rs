//! Path resolution for repositories and image attachments.

use crate::error::{Result, SleuthError};
use std::path::{Path, PathBuf};

/// Resolve repository paths to validated absolute directories,
/// deduplicated preserving order.
pub fn resolve_repo_dirs<S: AsRef<str>>(urls: &[S], base: &Path) -> Result<Vec<PathBuf>> {
    let mut resolved = Vec::with_capacity(urls.len());
    for url in urls {
        let path = resolve_one(url.as_ref(), base)?;
        if !path.is_dir() {
            return Err(SleuthError::NotADirectory(path));
        }
        if !resolved.contains(&path) {
            resolved.push(path);
        }
    }
    Ok(resolved)
}

/// Resolve image paths to validated absolute files,
/// deduplicated preserving order.
pub fn resolve_image_files<S: AsRef<str>>(paths: &[S], base: &Path) -> Result<Vec<PathBuf>> {
    let mut resolved = Vec::with_capacity(paths.len());
    for raw in paths {
        let path = resolve_one(raw.as_ref(), base)?;
        if !path.is_file() {
            return Err(SleuthError::NotAFile(path));
        }
        if !resolved.contains(&path) {
            resolved.push(path);
        }
    }
    Ok(resolved)
}

fn resolve_one(raw: &str, base: &Path) -> Result<PathBuf> {
    let path = Path::new(raw);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    // Only a genuinely absent path is a "not found"; permission and
    // filesystem errors keep their own identity.
    absolute.canonicalize().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SleuthError::PathNotFound(absolute),
        _ => SleuthError::Io(e),
    })
}

/// Longest shared path-segment prefix across all paths. A single path is its
/// own ancestor. Used as the session working directory so relative references
/// in tool use resolve across multiple repos.
///
/// Returns `None` for an empty slice.
pub fn common_ancestor(paths: &[PathBuf]) -> Option<PathBuf> {
    let (first, rest) = paths.split_first()?;
    let mut ancestor = first.clone();
    for path in rest {
        while !path.starts_with(&ancestor) {
            if !ancestor.pop() {
                break;
            }
        }
    }
    Some(ancestor)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
