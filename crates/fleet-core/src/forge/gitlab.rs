//! GitLab group listing, subgroups included

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{self, MAX_PAGES};
use super::{ForgeProvider, ForgeRepository, RepoFilter};
use crate::{Error, Result};

const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct RawProject {
    path: String,
    path_with_namespace: String,
    http_url_to_repo: String,
    ssh_url_to_repo: String,
    default_branch: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    forked_from_project: Option<serde_json::Value>,
}

impl From<RawProject> for ForgeRepository {
    fn from(raw: RawProject) -> Self {
        Self {
            name: raw.path,
            full_path: raw.path_with_namespace,
            https_url: raw.http_url_to_repo,
            ssh_url: raw.ssh_url_to_repo,
            default_branch: raw.default_branch,
            is_private: raw.visibility.as_deref() != Some("public"),
            is_archived: raw.archived,
            is_fork: raw.forked_from_project.is_some_and(|v| !v.is_null()),
        }
    }
}

/// Lists the projects of a GitLab group and all of its subgroups.
#[derive(Debug, Clone)]
pub struct GitLabProvider {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitLabProvider {
    pub const TOKEN_VAR: &'static str = "GITLAB_TOKEN";

    pub fn new(token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_url: "https://gitlab.com/api/v4".to_string(),
            token,
        })
    }

    /// Token from `GITLAB_TOKEN`, if set.
    pub fn from_env() -> Result<Self> {
        Self::new(http::token_from_env(Self::TOKEN_VAR))
    }

    /// Point at a self-managed instance, e.g. `https://gitlab.example.com/api/v4`.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Group ids in URLs are the full path with `/` escaped.
fn encode_group(group: &str) -> String {
    group.trim_matches('/').replace('/', "%2F")
}

#[async_trait]
impl ForgeProvider for GitLabProvider {
    fn name(&self) -> &str {
        "gitlab"
    }

    async fn list_organization_repositories(
        &self,
        org: &str,
        filter: &RepoFilter,
    ) -> Result<Vec<ForgeRepository>> {
        let url = format!("{}/groups/{}/projects", self.api_url, encode_group(org));
        let mut raw = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut request = self.client.get(&url).query(&[
                ("include_subgroups", "true".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            if let Some(token) = &self.token {
                request = request.header("PRIVATE-TOKEN", token);
            }
            let batch = http::get_json::<Vec<RawProject>>("gitlab", request)
                .await?
                .ok_or_else(|| Error::invalid_options(format!("GitLab group {org:?} not found")))?;
            let last = batch.len() < PER_PAGE;
            raw.extend(batch);
            if last {
                break;
            }
        }

        let repos: Vec<ForgeRepository> = raw
            .into_iter()
            .map(ForgeRepository::from)
            .filter(|repo| filter.accepts(repo))
            .collect();
        tracing::info!(forge = "gitlab", org, repositories = repos.len(), "Listed repositories");
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_group_is_escaped() {
        assert_eq!(encode_group("acme/platform/"), "acme%2Fplatform");
    }

    #[test]
    fn decodes_project_with_fork_parent() {
        let json = r#"[{
            "path": "terraform",
            "path_with_namespace": "acme/platform/terraform",
            "http_url_to_repo": "https://gitlab.com/acme/platform/terraform.git",
            "ssh_url_to_repo": "git@gitlab.com:acme/platform/terraform.git",
            "default_branch": null,
            "visibility": "internal",
            "archived": true,
            "forked_from_project": {"id": 7}
        }]"#;
        let raw: Vec<RawProject> = serde_json::from_str(json).unwrap();
        let repo = ForgeRepository::from(raw.into_iter().next().unwrap());
        assert_eq!(repo.name, "terraform");
        assert_eq!(repo.full_path, "acme/platform/terraform");
        assert!(repo.is_private);
        assert!(repo.is_archived);
        assert!(repo.is_fork);
        assert_eq!(repo.default_branch, None);
    }
}
