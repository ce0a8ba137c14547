//! Git marker files and directories.

use std::path::Path;

/// Well-known entries inside a working tree or its git directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitMarker {
    /// `.git` at the working tree root (directory or pointer file)
    GitDir,
    /// `MERGE_HEAD` written while a merge is stopped
    MergeHead,
    /// `rebase-merge/` used by the merge rebase backend
    RebaseMerge,
    /// `rebase-apply/` used by the apply rebase backend and `git am`
    RebaseApply,
    /// `CHERRY_PICK_HEAD` written while a cherry-pick is stopped
    CherryPickHead,
}

impl GitMarker {
    /// Get the string representation of the marker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitDir => ".git",
            Self::MergeHead => "MERGE_HEAD",
            Self::RebaseMerge => "rebase-merge",
            Self::RebaseApply => "rebase-apply",
            Self::CherryPickHead => "CHERRY_PICK_HEAD",
        }
    }

    /// Whether this marker exists under `dir`.
    pub fn present_in(&self, dir: &Path) -> bool {
        dir.join(self.as_str()).exists()
    }
}

impl AsRef<Path> for GitMarker {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl std::fmt::Display for GitMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape of the `.git` entry at a working tree root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// `.git` is a directory: an independently owned repository.
    Directory,
    /// `.git` is a `gitdir:` pointer file: a submodule or linked worktree.
    Pointer,
}

/// Inspect `dir/.git` without following into it.
///
/// Returns `None` when `dir` is not a working tree root.
pub fn repository_marker(dir: &Path) -> Option<MarkerKind> {
    let marker = dir.join(GitMarker::GitDir.as_str());
    let meta = std::fs::symlink_metadata(&marker).ok()?;
    if meta.is_dir() {
        Some(MarkerKind::Directory)
    } else if meta.is_file() {
        Some(MarkerKind::Pointer)
    } else if meta.file_type().is_symlink() {
        // A symlinked .git resolves like a regular entry.
        let target = std::fs::metadata(&marker).ok()?;
        if target.is_dir() {
            Some(MarkerKind::Directory)
        } else {
            Some(MarkerKind::Pointer)
        }
    } else {
        None
    }
}
