//! GitHub organization listing

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{self, MAX_PAGES};
use super::{ForgeProvider, ForgeRepository, RepoFilter};
use crate::{Error, Result};

const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: String,
    full_name: String,
    clone_url: String,
    ssh_url: String,
    default_branch: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    fork: bool,
}

impl From<RawRepository> for ForgeRepository {
    fn from(raw: RawRepository) -> Self {
        Self {
            name: raw.name,
            full_path: raw.full_name,
            https_url: raw.clone_url,
            ssh_url: raw.ssh_url,
            default_branch: raw.default_branch,
            is_private: raw.private,
            is_archived: raw.archived,
            is_fork: raw.fork,
        }
    }
}

/// Lists repositories through the GitHub REST API.
///
/// Falls back to the user endpoint when `org` is a user account.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubProvider {
    pub const TOKEN_VAR: &'static str = "GITHUB_TOKEN";

    pub fn new(token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_url: "https://api.github.com".to_string(),
            token,
        })
    }

    /// Token from `GITHUB_TOKEN`, if set.
    pub fn from_env() -> Result<Self> {
        Self::new(http::token_from_env(Self::TOKEN_VAR))
    }

    /// Point at a GitHub Enterprise API root, e.g. `https://ghe.example.com/api/v3`.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn list(&self, owner_kind: &str, owner: &str) -> Result<Option<Vec<RawRepository>>> {
        let mut all = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!("{}/{owner_kind}/{owner}/repos", self.api_url);
            let mut request = self
                .client
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .query(&[("per_page", PER_PAGE.to_string()), ("page", page.to_string())]);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }
            let Some(batch) = http::get_json::<Vec<RawRepository>>("github", request).await? else {
                return Ok(if page == 1 { None } else { Some(all) });
            };
            let last = batch.len() < PER_PAGE;
            all.extend(batch);
            if last {
                break;
            }
        }
        Ok(Some(all))
    }
}

#[async_trait]
impl ForgeProvider for GitHubProvider {
    fn name(&self) -> &str {
        "github"
    }

    async fn list_organization_repositories(
        &self,
        org: &str,
        filter: &RepoFilter,
    ) -> Result<Vec<ForgeRepository>> {
        let raw = match self.list("orgs", org).await? {
            Some(raw) => raw,
            None => self
                .list("users", org)
                .await?
                .ok_or_else(|| Error::invalid_options(format!("GitHub owner {org:?} not found")))?,
        };
        let repos: Vec<ForgeRepository> = raw
            .into_iter()
            .map(ForgeRepository::from)
            .filter(|repo| filter.accepts(repo))
            .collect();
        tracing::info!(forge = "github", org, repositories = repos.len(), "Listed repositories");
        Ok(repos)
    }
}
