//! Sync planning
//!
//! Pure reconciliation of a listing against scanned repositories. Planning
//! reads nothing but the filesystem layout it is given and mutates nothing.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Serialize;

use fleet_fs::{MarkerKind, repository_marker};

use super::manifest::{SyncManifestEntry, validate_entries};
use crate::Result;
use crate::scanner::RepositoryHandle;

/// What a sync does to one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncActionKind {
    /// Listed but absent locally.
    Clone,
    /// Listed and present locally.
    Update,
    /// Present and already at the remote-tracking commit.
    UpToDate,
    /// Present locally but not listed. Reported, never deleted.
    Orphan,
}

impl std::fmt::Display for SyncActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Clone => "clone",
            Self::Update => "update",
            Self::UpToDate => "up-to-date",
            Self::Orphan => "orphan",
        };
        f.write_str(label)
    }
}

/// One planned step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncAction {
    pub repository: String,
    /// Relative to the fleet root.
    pub local_path: String,
    pub kind: SyncActionKind,
    pub reason: String,
    /// The listing entry; `None` for orphans.
    pub entry: Option<SyncManifestEntry>,
}

/// Reconcile `entries` against the repositories found under `root`.
///
/// Entries come first, sorted by local path, followed by orphans sorted by
/// path. Duplicate or escaping local paths fail before anything is planned.
pub fn plan(
    entries: &[SyncManifestEntry],
    local: &[RepositoryHandle],
    root: &Path,
) -> Result<Vec<SyncAction>> {
    validate_entries(entries)?;

    let present: HashMap<&str, &RepositoryHandle> = local
        .iter()
        .map(|handle| (handle.relative_path.as_str(), handle))
        .collect();
    let listed: HashSet<&str> = entries.iter().map(|e| e.local_path.as_str()).collect();

    let mut sorted: Vec<&SyncManifestEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.local_path.cmp(&b.local_path));

    let mut actions: Vec<SyncAction> = sorted
        .into_iter()
        .map(|entry| {
            let target = root.join(&entry.local_path);
            let (kind, reason) = if present.contains_key(entry.local_path.as_str()) {
                (SyncActionKind::Update, "present locally".to_string())
            } else if repository_marker(&target) == Some(MarkerKind::Directory) {
                // Below the scan depth, or filtered out of the scan.
                (SyncActionKind::Update, "present locally".to_string())
            } else if target.exists() {
                (
                    SyncActionKind::Clone,
                    "path exists but is not a repository".to_string(),
                )
            } else {
                (SyncActionKind::Clone, "missing locally".to_string())
            };
            SyncAction {
                repository: entry.name.clone(),
                local_path: entry.local_path.clone(),
                kind,
                reason,
                entry: Some(entry.clone()),
            }
        })
        .collect();

    let mut orphans: Vec<&RepositoryHandle> = local
        .iter()
        .filter(|handle| {
            handle.relative_path != "."
                && !handle.is_submodule
                && !listed.contains(handle.relative_path.as_str())
        })
        .collect();
    orphans.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    actions.extend(orphans.into_iter().map(|handle| SyncAction {
        repository: handle.name(),
        local_path: handle.relative_path.clone(),
        kind: SyncActionKind::Orphan,
        reason: "not in the listing; left in place".to_string(),
        entry: None,
    }));

    tracing::debug!(
        listed = entries.len(),
        local = local.len(),
        planned = actions.len(),
        "Sync plan computed"
    );
    Ok(actions)
}
