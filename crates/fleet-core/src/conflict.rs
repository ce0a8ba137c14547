//! Read-only merge conflict detection
//!
//! Previews what merging one ref into another would conflict on, and how
//! hard resolving it is likely to be. The merge happens in memory; the
//! index and working tree are never touched.

use std::path::Path;

use fleet_git::{MergeConflict, MergeConflictKind, merge};
use serde::Serialize;

use crate::{Error, Result};

/// Kind of conflict on one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Content,
    Delete,
    Rename,
    Binary,
}

impl ConflictKind {
    /// Relative resolution effort.
    pub fn weight(&self) -> u32 {
        match self {
            Self::Content => 1,
            Self::Rename => 2,
            Self::Delete | Self::Binary => 3,
        }
    }
}

impl From<MergeConflictKind> for ConflictKind {
    fn from(kind: MergeConflictKind) -> Self {
        match kind {
            MergeConflictKind::Content => Self::Content,
            MergeConflictKind::Delete => Self::Delete,
            MergeConflictKind::Rename => Self::Rename,
            MergeConflictKind::Binary => Self::Binary,
        }
    }
}

/// Overall effort estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Trivial,
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// 0 is trivial, 1-2 easy, 3-6 medium, anything above hard.
    pub fn from_total_weight(total: u32) -> Self {
        match total {
            0 => Self::Trivial,
            1..=2 => Self::Easy,
            3..=6 => Self::Medium,
            _ => Self::Hard,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Trivial => "trivial",
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictEntry {
    pub path: String,
    pub kind: ConflictKind,
    pub difficulty_weight: u32,
}

impl From<MergeConflict> for ConflictEntry {
    fn from(conflict: MergeConflict) -> Self {
        let kind = ConflictKind::from(conflict.kind);
        Self {
            path: conflict.path,
            kind,
            difficulty_weight: kind.weight(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub source_ref: String,
    pub target_ref: String,
    pub entries: Vec<ConflictEntry>,
    pub overall_difficulty: Difficulty,
}

impl ConflictReport {
    pub fn new(source_ref: &str, target_ref: &str, entries: Vec<ConflictEntry>) -> Self {
        let total = entries.iter().map(|e| e.difficulty_weight).sum();
        Self {
            source_ref: source_ref.to_string(),
            target_ref: target_ref.to_string(),
            overall_difficulty: Difficulty::from_total_weight(total),
            entries,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> u32 {
        self.entries.iter().map(|e| e.difficulty_weight).sum()
    }
}

/// A conflict report plus whether the merge would be a fast-forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergePreview {
    pub report: ConflictReport,
    pub fast_forward: bool,
}

/// Preview merging `source` into `target` in the repository at `repo`.
pub fn detect(repo: &Path, source: &str, target: &str) -> Result<MergePreview> {
    let analysis = merge::analyze(repo, source, target)?;
    let entries = analysis.conflicts.into_iter().map(ConflictEntry::from).collect();
    let report = ConflictReport::new(source, target, entries);
    tracing::debug!(
        repo = %repo.display(),
        source,
        target,
        conflicts = report.entries.len(),
        difficulty = %report.overall_difficulty,
        "Conflict detection complete"
    );
    Ok(MergePreview {
        report,
        fast_forward: analysis.fast_forward,
    })
}

/// Like [`detect`], but a non-empty report is a `ConflictDetected` error.
pub fn detect_strict(repo: &Path, source: &str, target: &str) -> Result<MergePreview> {
    let preview = detect(repo, source, target)?;
    ensure_clean(&preview)?;
    Ok(preview)
}

/// Fail with `ConflictDetected` when `preview` found any conflict.
pub fn ensure_clean(preview: &MergePreview) -> Result<()> {
    let report = &preview.report;
    if report.is_clean() {
        return Ok(());
    }
    let count = report.entries.len();
    Err(Error::conflict_detected(format!(
        "merging {} into {} conflicts on {count} {} ({})",
        report.source_ref,
        report.target_ref,
        if count == 1 { "file" } else { "files" },
        report.overall_difficulty
    )))
}

/// [`detect`] on the blocking pool.
pub async fn detect_async(repo: &Path, source: &str, target: &str) -> Result<MergePreview> {
    let (repo, source, target) = (repo.to_path_buf(), source.to_string(), target.to_string());
    tokio::task::spawn_blocking(move || detect(&repo, &source, &target))
        .await
        .map_err(|e| Error::process(format!("conflict detection task failed: {e}")))?
}
