//! Repository discovery
//!
//! Walks a directory tree to a bounded depth and returns one handle per
//! working tree root found. A `.git` directory marks an independent
//! repository; scanning continues below it so nested repositories are found
//! too. A `.git` pointer file marks a submodule or linked worktree, which is
//! only reported (and descended into) when submodule recursion is requested.

use std::path::{Path, PathBuf};

use fleet_fs::{GitMarker, MarkerKind, NormalizedPath, repository_marker};
use regex::Regex;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result};

/// A repository found by a scan.
///
/// Created fresh on every scan and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryHandle {
    pub absolute_path: PathBuf,
    /// `/`-separated path relative to the scan root; the root itself is `.`.
    pub relative_path: String,
    pub is_repository_root: bool,
    pub is_submodule: bool,
}

impl RepositoryHandle {
    /// Last path segment, or the root directory's name for `.`.
    pub fn name(&self) -> String {
        match self.relative_path.rsplit('/').next() {
            Some(name) if name != "." => name.to_string(),
            _ => self
                .absolute_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| ".".to_string()),
        }
    }
}

/// Include/exclude patterns matched against relative paths.
///
/// Exclusion wins over inclusion. An empty include list includes everything.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl ScanFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn allows(&self, relative_path: &str) -> bool {
        if self.exclude.iter().any(|re| re.is_match(relative_path)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|re| re.is_match(relative_path))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| {
                Error::with_source(
                    crate::ErrorKind::InvalidOptions,
                    format!("invalid pattern {pattern:?}"),
                    e,
                )
            })
        })
        .collect()
}

/// Validated scan options.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// 0 examines only the root.
    pub max_depth: usize,
    pub filter: ScanFilter,
    pub recursive_submodules: bool,
}

/// Find repositories under `root`, sorted by relative path.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<Vec<RepositoryHandle>> {
    if !root.is_dir() {
        return Err(Error::scan(format!(
            "scan root {} is not a directory",
            root.display()
        )));
    }
    let root = NormalizedPath::canonicalize(root)
        .map_err(|e| Error::from(e).retag(crate::ErrorKind::Scan))?;
    let recursive_submodules = options.recursive_submodules;

    let walker = WalkDir::new(root.to_native())
        .max_depth(options.max_depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| should_visit(entry, recursive_submodules));

    let mut handles = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                tracing::warn!(path = %path, error = %e, "Skipping unreadable directory");
                continue;
            }
        };

        let Some(marker) = repository_marker(entry.path()) else {
            continue;
        };
        let absolute = NormalizedPath::new(entry.path());
        let Some(relative_path) = absolute.relative_to(&root) else {
            continue;
        };
        if !options.filter.allows(&relative_path) {
            tracing::debug!(path = %relative_path, "Excluded by filter");
            continue;
        }

        handles.push(RepositoryHandle {
            absolute_path: absolute.to_native(),
            relative_path,
            is_repository_root: marker == MarkerKind::Directory,
            is_submodule: marker == MarkerKind::Pointer,
        });
    }

    handles.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracing::debug!(
        root = %root,
        depth = options.max_depth,
        found = handles.len(),
        "Scan complete"
    );
    Ok(handles)
}

/// Prune `.git` directories, files, and (unless requested) submodules.
fn should_visit(entry: &DirEntry, recursive_submodules: bool) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    if entry.depth() > 0 && entry.file_name() == GitMarker::GitDir.as_str() {
        return false;
    }
    if !recursive_submodules && repository_marker(entry.path()) == Some(MarkerKind::Pointer) {
        tracing::debug!(path = %entry.path().display(), "Skipping submodule");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("services/api", true)]
    #[case("services/legacy-api", false)]
    #[case("tools/lint", false)]
    fn exclude_wins_over_include(#[case] path: &str, #[case] allowed: bool) {
        let filter = ScanFilter::new(&["^services/".into()], &["legacy".into()]).unwrap();
        assert_eq!(filter.allows(path), allowed);
    }

    #[test]
    fn empty_filter_allows_everything() {
        assert!(ScanFilter::default().allows("."));
        assert!(ScanFilter::default().allows("deep/nested/repo"));
    }

    #[test]
    fn handle_name_uses_last_segment() {
        let handle = RepositoryHandle {
            absolute_path: PathBuf::from("/fleet/team/api"),
            relative_path: "team/api".into(),
            is_repository_root: true,
            is_submodule: false,
        };
        assert_eq!(handle.name(), "api");
    }

    #[test]
    fn missing_root_is_a_scan_error() {
        let err = scan(Path::new("/definitely/not/here"), &ScanOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Scan);
    }
}
