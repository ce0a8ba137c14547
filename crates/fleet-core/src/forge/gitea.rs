//! Gitea (and Forgejo) organization listing

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::http::{self, MAX_PAGES};
use super::{ForgeProvider, ForgeRepository, RepoFilter};
use crate::{Error, Result};

const PAGE_LIMIT: usize = 50;

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
            default_branch: raw.default_branch.filter(|b| !b.is_empty()),
            is_private: raw.private,
            is_archived: raw.archived,
            is_fork: raw.fork,
        }
    }
}

/// Lists repositories of a Gitea organization. There is no public
/// default host, so the instance URL is required.
#[derive(Debug, Clone)]
pub struct GiteaProvider {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GiteaProvider {
    pub const TOKEN_VAR: &'static str = "GITEA_TOKEN";

    /// `base_url` is the instance root, e.g. `https://git.example.com`.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: http::client()?,
            api_url: format!("{}/api/v1", base_url.trim_end_matches('/')),
            token,
        })
    }

    /// Token from `GITEA_TOKEN`, if set.
    pub fn from_env(base_url: &str) -> Result<Self> {
        Self::new(base_url, http::token_from_env(Self::TOKEN_VAR))
    }
}

#[async_trait]
impl ForgeProvider for GiteaProvider {
    fn name(&self) -> &str {
        "gitea"
    }

    async fn list_organization_repositories(
        &self,
        org: &str,
        filter: &RepoFilter,
    ) -> Result<Vec<ForgeRepository>> {
        let url = format!("{}/orgs/{org}/repos", self.api_url);
        let mut raw = Vec::new();
        for page in 1..=MAX_PAGES {
            let mut request = self
                .client
                .get(&url)
                .query(&[("limit", PAGE_LIMIT.to_string()), ("page", page.to_string())]);
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("token {token}"));
            }
            let batch = http::get_json::<Vec<RawRepository>>("gitea", request)
                .await?
                .ok_or_else(|| {
                    Error::invalid_options(format!("Gitea organization {org:?} not found"))
                })?;
            let last = batch.len() < PAGE_LIMIT;
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
        tracing::info!(forge = "gitea", org, repositories = repos.len(), "Listed repositories");
        Ok(repos)
    }
}
