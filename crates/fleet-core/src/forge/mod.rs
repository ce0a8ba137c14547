//! Forge listings
//!
//! A [`ForgeProvider`] enumerates the repositories of an organization. The
//! sync planner never sees providers; listings are turned into manifest
//! entries with [`listing_to_entries`] first.

mod gitea;
mod github;
mod gitlab;
mod http;
mod static_provider;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use gitea::GiteaProvider;
pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;
pub use static_provider::StaticProvider;

use crate::sync::SyncManifestEntry;
use crate::{Error, ErrorKind, Result};

/// One repository as a forge reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeRepository {
    pub name: String,
    /// Full namespace path, e.g. `acme/platform/api`.
    pub full_path: String,
    pub https_url: String,
    pub ssh_url: String,
    pub default_branch: Option<String>,
    pub is_private: bool,
    pub is_archived: bool,
    pub is_fork: bool,
}

/// Which listed repositories to keep.
#[derive(Debug, Clone, Default)]
pub struct RepoFilter {
    pub include_archived: bool,
    pub include_forks: bool,
    name_pattern: Option<Regex>,
}

impl RepoFilter {
    pub fn new(include_archived: bool, include_forks: bool, name_pattern: Option<&str>) -> Result<Self> {
        let name_pattern = name_pattern
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::with_source(
                        ErrorKind::InvalidOptions,
                        format!("invalid repository name pattern {pattern:?}"),
                        e,
                    )
                })
            })
            .transpose()?;
        Ok(Self {
            include_archived,
            include_forks,
            name_pattern,
        })
    }

    pub fn accepts(&self, repo: &ForgeRepository) -> bool {
        (self.include_archived || !repo.is_archived)
            && (self.include_forks || !repo.is_fork)
            && self
                .name_pattern
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(&repo.name))
    }
}

/// Clone URL flavor written into manifest entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneProtocol {
    #[default]
    Https,
    Ssh,
}

/// Lists the repositories of a forge organization or group.
#[async_trait]
pub trait ForgeProvider: Send + Sync {
    /// Short forge name for logs, e.g. `github`.
    fn name(&self) -> &str;

    /// All repositories of `org` accepted by `filter`.
    async fn list_organization_repositories(
        &self,
        org: &str,
        filter: &RepoFilter,
    ) -> Result<Vec<ForgeRepository>>;
}

/// Convert a listing into manifest entries.
///
/// Local paths mirror the namespace below `org`, so nested subgroups become
/// nested directories: `acme/platform/api` under `acme` lands in
/// `platform/api`.
pub fn listing_to_entries(
    org: &str,
    repos: &[ForgeRepository],
    protocol: CloneProtocol,
) -> Vec<SyncManifestEntry> {
    let prefix = format!("{}/", org.trim_matches('/'));
    let mut entries: Vec<SyncManifestEntry> = repos
        .iter()
        .map(|repo| {
            let local_path = repo
                .full_path
                .strip_prefix(&prefix)
                .unwrap_or(&repo.name)
                .to_string();
            let source_url = match protocol {
                CloneProtocol::Https => repo.https_url.clone(),
                CloneProtocol::Ssh => repo.ssh_url.clone(),
            };
            SyncManifestEntry {
                name: repo.name.clone(),
                source_url,
                local_path,
                target_branch: repo.default_branch.clone(),
            }
        })
        .collect();
    entries.sort_by(|a, b| a.local_path.cmp(&b.local_path));
    entries
}
