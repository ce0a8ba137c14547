//! SHA-256 checksum utilities
//!
//! Checksums use a single canonical format (`sha256:<hex>`). The tree
//! checksum covers every file below a working tree root except the git
//! directory, which lets callers prove that an operation left a checkout
//! untouched.

use sha2::{Digest, Sha256};
use std::path::Path;
use walkdir::WalkDir;

use crate::{Error, GitMarker, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute a checksum over the working tree rooted at `root`.
///
/// Files are visited in sorted order; each contributes its relative path and
/// content. The `.git` entry is skipped.
pub fn compute_tree_checksum(root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != GitMarker::GitDir.as_str());

    for entry in walker {
        let entry = entry.map_err(|e| Error::Walk {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let content = std::fs::read(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update(&content);
        hasher.update([0u8]);
    }

    Ok(format!("{}{:x}", PREFIX, hasher.finalize()))
}
