//! Fleet health diagnostics
//!
//! Fetches each repository (unless asked not to), inspects it, and reports
//! its divergence from upstream with a recommendation. Every repository
//! gets exactly one record, even when it cannot be fetched or read.

use chrono::{DateTime, Utc};
use fleet_git::{Git, NetworkKind, RepositoryState};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::HealthOptions;
use crate::ops::inspect_state;
use crate::pool::{self, Abandoned};
use crate::retry::RetryPolicy;
use crate::scanner::RepositoryHandle;
use crate::{CancelSignal, Error, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    /// Fetch was not attempted.
    Skipped,
    Timeout,
    AuthFailed,
    Unreachable,
}

impl FetchStatus {
    fn from_error(err: &Error) -> Self {
        match err.kind() {
            ErrorKind::Network(NetworkKind::Timeout) => Self::Timeout,
            ErrorKind::Network(NetworkKind::AuthFailed) => Self::AuthFailed,
            _ => Self::Unreachable,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Timeout | Self::AuthFailed | Self::Unreachable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum Divergence {
    UpToDate,
    Ahead { commits: usize },
    Behind { commits: usize },
    Diverged { ahead: usize, behind: usize },
    /// Unresolved conflicts inside an interrupted merge, rebase or cherry-pick.
    Conflict,
    NoUpstream,
    /// The repository could not be inspected.
    Unknown,
}

impl Divergence {
    pub fn from_state(state: &RepositoryState) -> Self {
        if state.has_unresolved_conflicts && !state.in_progress.is_none() {
            return Self::Conflict;
        }
        if !state.has_upstream() {
            return Self::NoUpstream;
        }
        match (state.ahead, state.behind) {
            (0, 0) => Self::UpToDate,
            (ahead, 0) => Self::Ahead { commits: ahead },
            (0, behind) => Self::Behind { commits: behind },
            (ahead, behind) => Self::Diverged { ahead, behind },
        }
    }
}

impl std::fmt::Display for Divergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpToDate => f.write_str("up to date"),
            Self::Ahead { commits } => write!(f, "ahead {commits}"),
            Self::Behind { commits } => write!(f, "behind {commits}"),
            Self::Diverged { ahead, behind } => write!(f, "diverged (+{ahead}/-{behind})"),
            Self::Conflict => f.write_str("conflict"),
            Self::NoUpstream => f.write_str("no upstream"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthRecord {
    pub repository: String,
    pub branch: Option<String>,
    pub fetch_status: FetchStatus,
    pub divergence: Divergence,
    pub working_tree_dirty: bool,
    pub recommendation: String,
}

impl HealthRecord {
    fn new(
        repository: &RepositoryHandle,
        branch: Option<String>,
        fetch_status: FetchStatus,
        divergence: Divergence,
        working_tree_dirty: bool,
    ) -> Self {
        Self {
            repository: repository.relative_path.clone(),
            branch,
            fetch_status,
            divergence,
            working_tree_dirty,
            recommendation: recommend(fetch_status, divergence, working_tree_dirty).to_string(),
        }
    }

    /// Nothing for the operator to do.
    pub fn is_healthy(&self) -> bool {
        !self.fetch_status.is_failure()
            && self.divergence == Divergence::UpToDate
            && !self.working_tree_dirty
    }
}

/// Suggested next step, derived only from the three diagnostic fields.
pub fn recommend(fetch: FetchStatus, divergence: Divergence, dirty: bool) -> &'static str {
    match (fetch, divergence, dirty) {
        (FetchStatus::AuthFailed, _, _) => "check credentials for the remote",
        (FetchStatus::Unreachable, _, _) => "check network connectivity and the remote url",
        (FetchStatus::Timeout, _, _) => "fetch timed out; retry later",
        (_, Divergence::Unknown, _) => "inspect the repository manually",
        (_, Divergence::Conflict, _) => "resolve conflicts or run recovery",
        (_, Divergence::NoUpstream, _) => "set an upstream branch",
        (_, Divergence::Diverged { .. }, _) => "rebase or merge with upstream",
        (_, Divergence::Behind { .. }, true) => "commit or stash changes, then pull",
        (_, Divergence::Behind { .. }, false) => "pull",
        (_, Divergence::Ahead { .. }, true) => "commit remaining changes, then push",
        (_, Divergence::Ahead { .. }, false) => "push",
        (_, Divergence::UpToDate, true) => "commit or discard local changes",
        (_, Divergence::UpToDate, false) => "none",
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub behind: usize,
    pub ahead: usize,
    pub diverged: usize,
    pub conflicted: usize,
    pub no_upstream: usize,
    pub unknown: usize,
    pub fetch_failures: usize,
    pub dirty: usize,
}

impl HealthSummary {
    pub fn from_records(records: &[HealthRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            if record.is_healthy() {
                summary.healthy += 1;
            }
            match record.divergence {
                Divergence::UpToDate => {}
                Divergence::Ahead { .. } => summary.ahead += 1,
                Divergence::Behind { .. } => summary.behind += 1,
                Divergence::Diverged { .. } => summary.diverged += 1,
                Divergence::Conflict => summary.conflicted += 1,
                Divergence::NoUpstream => summary.no_upstream += 1,
                Divergence::Unknown => summary.unknown += 1,
            }
            if record.fetch_status.is_failure() {
                summary.fetch_failures += 1;
            }
            if record.working_tree_dirty {
                summary.dirty += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<HealthRecord>,
    pub summary: HealthSummary,
}

/// Runs diagnostics through a given git executor.
#[derive(Debug, Clone, Default)]
pub struct HealthChecker {
    git: Git,
}

impl HealthChecker {
    pub fn new(git: Git) -> Self {
        Self { git }
    }

    /// Diagnose `repos`. Records come back sorted by relative path.
    pub async fn diagnose(
        &self,
        repos: Vec<RepositoryHandle>,
        options: &HealthOptions,
        cancel: &CancelSignal,
    ) -> HealthReport {
        let span = tracing::info_span!(
            "health",
            run_id = %Uuid::new_v4(),
            repositories = repos.len(),
            skip_fetch = options.skip_fetch
        );
        let git = self.git.clone();
        let options = options.clone();
        let parallelism = options.parallelism;

        async move {
            let mut records = pool::run(
                repos,
                parallelism,
                cancel,
                move |repo: RepositoryHandle| {
                    let git = git.clone();
                    let options = options.clone();
                    async move { check_one(&git, &repo, &options).await }
                },
                |repo, reason| {
                    if let Abandoned::Panicked(message) = &reason {
                        tracing::warn!(repo = %repo.relative_path, error = %message, "Health check panicked");
                    }
                    HealthRecord::new(&repo, None, FetchStatus::Skipped, Divergence::Unknown, false)
                },
            )
            .await;
            records.sort_by(|a, b| a.repository.cmp(&b.repository));

            let summary = HealthSummary::from_records(&records);
            tracing::info!(
                healthy = summary.healthy,
                fetch_failures = summary.fetch_failures,
                "Health check finished"
            );
            HealthReport {
                generated_at: Utc::now(),
                records,
                summary,
            }
        }
        .instrument(span)
        .await
    }
}

/// Diagnose with the default `git` executor.
pub async fn diagnose(
    repos: Vec<RepositoryHandle>,
    options: &HealthOptions,
    cancel: &CancelSignal,
) -> HealthReport {
    HealthChecker::default().diagnose(repos, options, cancel).await
}

async fn check_one(git: &Git, repo: &RepositoryHandle, options: &HealthOptions) -> HealthRecord {
    let path = repo.absolute_path.as_path();

    let fetch_status = if options.skip_fetch {
        FetchStatus::Skipped
    } else {
        let (remote, timeout) = (options.remote.as_str(), options.timeout);
        let retried = RetryPolicy::new(options.retries, options.base_delay)
            .run("fetch", || async move {
                git.fetch(path, remote, timeout).await.map_err(Error::from)
            })
            .await;
        match retried.result {
            Ok(()) => FetchStatus::Ok,
            Err(e) => {
                tracing::warn!(repo = %repo.relative_path, error = %e, "Fetch failed");
                FetchStatus::from_error(&e)
            }
        }
    };

    match inspect_state(path).await {
        Ok(state) => HealthRecord::new(
            repo,
            state.current_branch.clone(),
            fetch_status,
            Divergence::from_state(&state),
            state.is_dirty(),
        ),
        Err(e) => {
            tracing::warn!(repo = %repo.relative_path, error = %e, "Inspection failed");
            HealthRecord::new(repo, None, fetch_status, Divergence::Unknown, false)
        }
    }
}
