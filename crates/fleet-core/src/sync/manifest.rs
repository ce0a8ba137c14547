//! Sync manifests

use std::collections::HashSet;
use std::path::Path;

use fleet_fs::path::relative_depth;
use fleet_fs::{ConfigStore, NormalizedPath};
use fleet_git::validate;
use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result};

/// One repository the fleet should contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncManifestEntry {
    pub name: String,
    pub source_url: String,
    /// Path relative to the fleet root, `/`-separated.
    pub local_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_branch: Option<String>,
}

/// A full listing, as stored on disk.
///
/// ```toml
/// [[repository]]
/// name = "api"
/// source_url = "git@github.com:acme/api.git"
/// local_path = "services/api"
/// target_branch = "main"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncManifest {
    #[serde(default, rename = "repository")]
    pub repositories: Vec<SyncManifestEntry>,
}

impl SyncManifest {
    pub fn new(repositories: Vec<SyncManifestEntry>) -> Self {
        Self { repositories }
    }

    /// Load and validate a manifest. Any problem is a `Manifest` error.
    pub fn load(path: &Path) -> Result<Self> {
        let manifest: Self = ConfigStore::new()
            .load(&NormalizedPath::new(path))
            .map_err(|e| Error::from(e).retag(ErrorKind::Manifest))?;
        manifest.validate()?;
        tracing::debug!(
            path = %path.display(),
            repositories = manifest.repositories.len(),
            "Loaded sync manifest"
        );
        Ok(manifest)
    }

    /// Write atomically; the format follows the extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        ConfigStore::new().save(&NormalizedPath::new(path), self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        validate_entries(&self.repositories)
    }
}

/// The scan depth needed to see every listed checkout.
pub fn listing_depth(entries: &[SyncManifestEntry]) -> usize {
    entries
        .iter()
        .map(|entry| relative_depth(&entry.local_path))
        .max()
        .unwrap_or(0)
}

/// Check entries for unsafe values and duplicate local paths.
pub fn validate_entries(entries: &[SyncManifestEntry]) -> Result<()> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.name.trim().is_empty() {
            return Err(Error::manifest(format!(
                "entry for {:?} has an empty name",
                entry.local_path
            )));
        }
        validate::validate_relative_path(&entry.local_path).map_err(|_| {
            Error::manifest(format!(
                "{}: local path {:?} must stay inside the fleet root",
                entry.name, entry.local_path
            ))
        })?;
        validate::validate_url(&entry.source_url).map_err(|_| {
            Error::manifest(format!("{}: invalid source url {:?}", entry.name, entry.source_url))
        })?;
        if let Some(branch) = &entry.target_branch {
            validate::validate_ref_name(branch).map_err(|_| {
                Error::manifest(format!("{}: invalid target branch {branch:?}", entry.name))
            })?;
        }
        if !seen.insert(entry.local_path.as_str()) {
            return Err(Error::manifest(format!(
                "duplicate local path {:?}",
                entry.local_path
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(name: &str, path: &str) -> SyncManifestEntry {
        SyncManifestEntry {
            name: name.into(),
            source_url: format!("https://example.com/acme/{name}.git"),
            local_path: path.into(),
            target_branch: None,
        }
    }

    #[test]
    fn listing_depth_follows_deepest_entry() {
        assert_eq!(listing_depth(&[]), 0);
        assert_eq!(
            listing_depth(&[entry("a", "api"), entry("b", "platform/infra/terraform")]),
            3
        );
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let err = validate_entries(&[entry("a", "x"), entry("b", "x")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Manifest);
        assert!(err.message().contains("duplicate"));
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let err = validate_entries(&[entry("a", "../outside")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Manifest);
    }

    #[test]
    fn option_like_branch_is_rejected() {
        let mut e = entry("a", "a");
        e.target_branch = Some("--force".into());
        assert_eq!(validate_entries(&[e]).unwrap_err().kind(), ErrorKind::Manifest);
    }

    #[test]
    fn toml_roundtrip_through_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("fleet.toml");
        let manifest = SyncManifest::new(vec![entry("api", "services/api")]);
        manifest.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[[repository]]"));
        assert_eq!(SyncManifest::load(&path).unwrap(), manifest);
    }

    #[test]
    fn malformed_file_is_a_manifest_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("fleet.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(SyncManifest::load(&path).unwrap_err().kind(), ErrorKind::Manifest);
    }
}
