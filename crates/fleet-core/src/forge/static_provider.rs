//! In-memory listings

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{ForgeProvider, ForgeRepository, RepoFilter};
use crate::{Error, Result};

/// A provider backed by a fixed listing per organization.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    listings: BTreeMap<String, Vec<ForgeRepository>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(mut self, org: impl Into<String>, repos: Vec<ForgeRepository>) -> Self {
        self.listings.insert(org.into(), repos);
        self
    }
}

#[async_trait]
impl ForgeProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn list_organization_repositories(
        &self,
        org: &str,
        filter: &RepoFilter,
    ) -> Result<Vec<ForgeRepository>> {
        let repos = self
            .listings
            .get(org)
            .ok_or_else(|| Error::invalid_options(format!("organization {org:?} not found")))?;
        Ok(repos.iter().filter(|repo| filter.accepts(repo)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str, archived: bool) -> ForgeRepository {
        ForgeRepository {
            name: name.into(),
            full_path: format!("acme/{name}"),
            https_url: format!("https://example.com/acme/{name}.git"),
            ssh_url: format!("git@example.com:acme/{name}.git"),
            default_branch: Some("main".into()),
            is_private: false,
            is_archived: archived,
            is_fork: false,
        }
    }

    #[tokio::test]
    async fn applies_filter() {
        let provider =
            StaticProvider::new().with_organization("acme", vec![repo("api", false), repo("old", true)]);
        let repos = provider
            .list_organization_repositories("acme", &RepoFilter::default())
            .await
            .unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "api");
    }

    #[tokio::test]
    async fn unknown_organization_fails() {
        let err = StaticProvider::new()
            .list_organization_repositories("nobody", &RepoFilter::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidOptions);
    }
}
