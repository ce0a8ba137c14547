//! In-memory three-way merge analysis
//!
//! Uses `Repository::merge_commits`, which produces a detached index in
//! memory. Neither the repository index nor the working tree is touched.

use std::path::Path;

use git2::{IndexEntry, MergeOptions, Oid, Repository};

use crate::{Error, Result, validate};

/// How two sides of a merge disagree about one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeConflictKind {
    /// Both sides changed overlapping lines of a text file.
    Content,
    /// One side deleted the path, the other changed it.
    Delete,
    /// The sides disagree about where the path moved.
    Rename,
    /// Non-text content; no line-level merge is possible.
    Binary,
}

/// One conflicting path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConflict {
    pub path: String,
    pub kind: MergeConflictKind,
}

/// Raw result of merging `source` into `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeAnalysis {
    pub source_oid: Oid,
    pub target_oid: Oid,
    /// Conflicts sorted by path.
    pub conflicts: Vec<MergeConflict>,
    /// `target` is an ancestor of (or equal to) `source`.
    pub fast_forward: bool,
}

/// Merge `source` into `target` in memory and report conflicting paths.
pub fn analyze(repo_path: &Path, source: &str, target: &str) -> Result<MergeAnalysis> {
    validate::validate_revision(source)?;
    validate::validate_revision(target)?;

    let repo = Repository::open(repo_path)?;
    let source_commit = resolve_commit(&repo, source)?;
    let target_commit = resolve_commit(&repo, target)?;

    let fast_forward = source_commit.id() == target_commit.id()
        || repo.graph_descendant_of(source_commit.id(), target_commit.id())?;

    let mut options = MergeOptions::new();
    options.find_renames(true);
    let index = repo.merge_commits(&target_commit, &source_commit, Some(&options))?;

    let mut conflicts = Vec::new();
    if index.has_conflicts() {
        for conflict in index.conflicts()? {
            let conflict = conflict?;
            if let Some(entry) = classify(
                &repo,
                conflict.ancestor.as_ref(),
                conflict.our.as_ref(),
                conflict.their.as_ref(),
            ) {
                conflicts.push(entry);
            }
        }
    }
    conflicts.sort_by(|a, b| a.path.cmp(&b.path));
    conflicts.dedup_by(|a, b| a.path == b.path);

    tracing::debug!(
        repo = %repo_path.display(),
        source,
        target,
        conflicts = conflicts.len(),
        fast_forward,
        "Analyzed merge"
    );

    Ok(MergeAnalysis {
        source_oid: source_commit.id(),
        target_oid: target_commit.id(),
        conflicts,
        fast_forward,
    })
}

fn resolve_commit<'r>(repo: &'r Repository, revision: &str) -> Result<git2::Commit<'r>> {
    repo.revparse_single(revision)
        .and_then(|object| object.peel_to_commit())
        .map_err(|_| Error::RefNotFound {
            name: revision.to_string(),
        })
}

fn entry_path(entry: &IndexEntry) -> String {
    String::from_utf8_lossy(&entry.path).into_owned()
}

fn is_binary(repo: &Repository, entry: &IndexEntry) -> bool {
    repo.find_blob(entry.id)
        .map(|blob| blob.is_binary())
        .unwrap_or(false)
}

fn classify(
    repo: &Repository,
    ancestor: Option<&IndexEntry>,
    ours: Option<&IndexEntry>,
    theirs: Option<&IndexEntry>,
) -> Option<MergeConflict> {
    let ancestor_path = ancestor.map(entry_path);
    match (ours, theirs) {
        (Some(ours), Some(theirs)) => {
            let our_path = entry_path(ours);
            let their_path = entry_path(theirs);
            let moved = our_path != their_path
                || ancestor_path.as_deref().is_some_and(|a| a != our_path);
            let kind = if moved {
                MergeConflictKind::Rename
            } else if is_binary(repo, ours) || is_binary(repo, theirs) {
                MergeConflictKind::Binary
            } else {
                MergeConflictKind::Content
            };
            Some(MergeConflict {
                path: our_path,
                kind,
            })
        }
        (Some(side), None) | (None, Some(side)) => {
            let path = entry_path(side);
            let kind = if ancestor_path.as_deref().is_some_and(|a| a != path) {
                MergeConflictKind::Rename
            } else {
                MergeConflictKind::Delete
            };
            Some(MergeConflict { path, kind })
        }
        (None, None) => ancestor_path.map(|path| MergeConflict {
            path,
            kind: MergeConflictKind::Delete,
        }),
    }
}
