//! Working tree state inspection
//!
//! State is read directly through `git2` and recomputed on every call; a
//! repository can change between two commands of the same session, so
//! nothing here is cached.

use std::path::Path;

use fleet_fs::GitMarker;
use git2::{BranchType, ErrorCode, Repository, Status, StatusOptions};
use serde::Serialize;

use crate::{Error, Result};

/// An interrupted multi-step operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InProgressOperation {
    None,
    Merge,
    Rebase,
    CherryPick,
}

impl InProgressOperation {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl std::fmt::Display for InProgressOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Merge => "merge",
            Self::Rebase => "rebase",
            Self::CherryPick => "cherry-pick",
        };
        f.write_str(label)
    }
}

/// Snapshot of one repository's working tree and branch position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryState {
    /// Checked-out branch; `None` when HEAD is detached outside a rebase.
    pub current_branch: Option<String>,
    /// Upstream of the current branch, e.g. `origin/main`.
    pub upstream: Option<String>,
    pub is_clean: bool,
    pub staged_files: Vec<String>,
    pub modified_files: Vec<String>,
    pub untracked_files: Vec<String>,
    pub ahead: usize,
    pub behind: usize,
    pub in_progress: InProgressOperation,
    pub has_unresolved_conflicts: bool,
    pub conflicted_paths: Vec<String>,
}

impl RepositoryState {
    /// Whether ahead/behind counts are meaningful.
    pub fn has_upstream(&self) -> bool {
        self.upstream.is_some()
    }

    /// Anything `is_clean` rules out, untracked files included.
    pub fn is_dirty(&self) -> bool {
        !self.is_clean
    }
}

/// Inspect the repository whose working tree is at `path`.
pub fn inspect(path: &Path) -> Result<RepositoryState> {
    let repo = Repository::open(path).map_err(|e| match e.code() {
        ErrorCode::NotFound => Error::NotARepository {
            path: path.to_path_buf(),
        },
        _ => Error::Git(e),
    })?;

    let in_progress = detect_in_progress(repo.path());

    let mut options = StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .exclude_submodules(true);
    let statuses = repo.statuses(Some(&mut options))?;

    let mut staged_files = Vec::new();
    let mut modified_files = Vec::new();
    let mut untracked_files = Vec::new();
    let mut conflicted_paths = Vec::new();

    for entry in statuses.iter() {
        let Some(file) = entry.path().map(str::to_string) else {
            continue;
        };
        let status = entry.status();
        if status.contains(Status::CONFLICTED) {
            conflicted_paths.push(file);
            continue;
        }
        if status.intersects(
            Status::INDEX_NEW
                | Status::INDEX_MODIFIED
                | Status::INDEX_DELETED
                | Status::INDEX_RENAMED
                | Status::INDEX_TYPECHANGE,
        ) {
            staged_files.push(file.clone());
        }
        if status.intersects(
            Status::WT_MODIFIED | Status::WT_DELETED | Status::WT_RENAMED | Status::WT_TYPECHANGE,
        ) {
            modified_files.push(file.clone());
        }
        if status.contains(Status::WT_NEW) {
            untracked_files.push(file);
        }
    }

    let current_branch = current_branch(&repo, in_progress)?;
    let (upstream, ahead, behind) = match current_branch.as_deref() {
        Some(branch) if in_progress.is_none() => upstream_divergence(&repo, branch)?,
        _ => (None, 0, 0),
    };

    let is_clean = staged_files.is_empty()
        && modified_files.is_empty()
        && untracked_files.is_empty()
        && conflicted_paths.is_empty();

    Ok(RepositoryState {
        current_branch,
        upstream,
        is_clean,
        staged_files,
        modified_files,
        untracked_files,
        ahead,
        behind,
        in_progress,
        has_unresolved_conflicts: !conflicted_paths.is_empty(),
        conflicted_paths,
    })
}

/// Check the git directory for operation markers. Merge wins if several
/// are present.
fn detect_in_progress(git_dir: &Path) -> InProgressOperation {
    if GitMarker::MergeHead.present_in(git_dir) {
        InProgressOperation::Merge
    } else if GitMarker::RebaseMerge.present_in(git_dir) || GitMarker::RebaseApply.present_in(git_dir)
    {
        InProgressOperation::Rebase
    } else if GitMarker::CherryPickHead.present_in(git_dir) {
        InProgressOperation::CherryPick
    } else {
        InProgressOperation::None
    }
}

fn current_branch(repo: &Repository, in_progress: InProgressOperation) -> Result<Option<String>> {
    if in_progress == InProgressOperation::Rebase
        && let Some(branch) = rebasing_branch(repo.path())
    {
        return Ok(Some(branch));
    }

    match repo.head() {
        Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
        Ok(_) => Ok(None),
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            // No commits yet: HEAD still names the branch symbolically.
            let head = repo.find_reference("HEAD")?;
            Ok(head
                .symbolic_target()
                .map(|target| target.trim_start_matches("refs/heads/").to_string()))
        }
        Err(e) => Err(Error::Git(e)),
    }
}

/// Branch being rebased, read from the rebase state directory.
fn rebasing_branch(git_dir: &Path) -> Option<String> {
    [GitMarker::RebaseMerge, GitMarker::RebaseApply]
        .iter()
        .find_map(|marker| std::fs::read_to_string(git_dir.join(marker.as_str()).join("head-name")).ok())
        .map(|name| name.trim().trim_start_matches("refs/heads/").to_string())
        .filter(|name| !name.is_empty() && name != "detached HEAD")
}

fn upstream_divergence(repo: &Repository, branch: &str) -> Result<(Option<String>, usize, usize)> {
    let local = match repo.find_branch(branch, BranchType::Local) {
        Ok(local) => local,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok((None, 0, 0)),
        Err(e) => return Err(Error::Git(e)),
    };
    let upstream = match local.upstream() {
        Ok(upstream) => upstream,
        Err(e) if e.code() == ErrorCode::NotFound => return Ok((None, 0, 0)),
        Err(e) => return Err(Error::Git(e)),
    };

    let upstream_name = upstream.name()?.map(str::to_string);
    let (Some(local_oid), Some(upstream_oid)) = (local.get().target(), upstream.get().target())
    else {
        return Ok((upstream_name, 0, 0));
    };
    let (ahead, behind) = repo.graph_ahead_behind(local_oid, upstream_oid)?;
    Ok((upstream_name, ahead, behind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn merge_marker_wins_over_rebase() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("MERGE_HEAD"), "abc\n").unwrap();
        std::fs::create_dir(temp.path().join("rebase-merge")).unwrap();
        assert_eq!(detect_in_progress(temp.path()), InProgressOperation::Merge);
    }

    #[test]
    fn cherry_pick_marker_detected() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("CHERRY_PICK_HEAD"), "abc\n").unwrap();
        assert_eq!(detect_in_progress(temp.path()), InProgressOperation::CherryPick);
    }

    #[test]
    fn no_markers_means_none() {
        let temp = TempDir::new().unwrap();
        assert_eq!(detect_in_progress(temp.path()), InProgressOperation::None);
    }

    #[test]
    fn rebasing_branch_reads_head_name() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("rebase-merge");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("head-name"), "refs/heads/feature/login\n").unwrap();
        assert_eq!(rebasing_branch(temp.path()).as_deref(), Some("feature/login"));
    }

    #[test]
    fn unborn_repository_reports_symbolic_branch() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        repo.set_head("refs/heads/trunk").unwrap();

        let state = inspect(temp.path()).unwrap();
        assert_eq!(state.current_branch.as_deref(), Some("trunk"));
        assert!(state.is_clean);
        assert_eq!(state.upstream, None);
    }
}
