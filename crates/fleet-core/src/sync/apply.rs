//! Sync execution
//!
//! Every planned action runs through the worker pool and the safety gate.
//! A dry run performs every read, including the gate, and no mutation:
//! no clone, no fetch, no reset or merge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fleet_fs::{MarkerKind, repository_marker};
use fleet_git::Git;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use super::manifest::SyncManifestEntry;
use super::plan::{SyncAction, SyncActionKind};
use crate::config::SyncSettings;
use crate::gate::{self, Decision, GateAction, GatePolicy};
use crate::ops::{inspect_state, settle};
use crate::pool::{self, Abandoned};
use crate::retry::RetryPolicy;
use crate::{CancelSignal, Error, ErrorKind, Result, conflict};

/// How an existing repository is brought in line with its remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// `reset --hard <remote>/<branch>`
    Reset,
    /// Merge `<remote>/<branch>` into the local branch.
    Pull,
    /// Fetch only; the working tree is left alone.
    FetchOnly,
}

impl SyncStrategy {
    fn gate_action(&self) -> GateAction {
        match self {
            Self::Reset => GateAction::Reset,
            Self::Pull => GateAction::Merge,
            Self::FetchOnly => GateAction::Fetch,
        }
    }
}

impl std::fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Reset => "reset",
            Self::Pull => "pull",
            Self::FetchOnly => "fetch-only",
        };
        f.write_str(label)
    }
}

/// What happened to one planned action.
#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub repository: String,
    pub local_path: String,
    pub action_applied: SyncActionKind,
    pub strategy_used: SyncStrategy,
    /// Never exceeds the `max_retries` the run was given.
    pub retry_count: u32,
    pub succeeded: bool,
    pub message: String,
    pub error: Option<Error>,
}

impl SyncOutcome {
    fn from_step(action: &SyncAction, strategy: SyncStrategy, step: Step) -> Self {
        let (succeeded, message, error) = match step.result {
            Ok(message) => (true, message, None),
            Err(e) => (false, e.message().to_string(), Some(e)),
        };
        Self {
            repository: action.repository.clone(),
            local_path: action.local_path.clone(),
            action_applied: step.applied,
            strategy_used: strategy,
            retry_count: step.retries,
            succeeded,
            message,
            error,
        }
    }
}

/// Result of one action before it becomes an outcome.
struct Step {
    applied: SyncActionKind,
    result: Result<String>,
    retries: u32,
}

impl Step {
    fn new(applied: SyncActionKind, result: Result<String>) -> Self {
        Self {
            applied,
            result,
            retries: 0,
        }
    }
}

/// Applies sync plans under a fleet root.
#[derive(Debug, Clone)]
pub struct SyncExecutor {
    inner: Arc<Inner>,
    cancel: CancelSignal,
}

#[derive(Debug)]
struct Inner {
    git: Git,
    root: PathBuf,
    settings: SyncSettings,
}

impl SyncExecutor {
    pub fn new(git: Git, root: impl Into<PathBuf>, settings: SyncSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                git,
                root: root.into(),
                settings,
            }),
            cancel: CancelSignal::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply `plan`, one outcome per action, in plan order.
    ///
    /// Transient network failures are retried up to `max_retries` times;
    /// authentication failures, process failures and gate refusals are not.
    pub async fn apply(
        &self,
        plan: &[SyncAction],
        strategy: SyncStrategy,
        dry_run: bool,
        max_retries: u32,
    ) -> Vec<SyncOutcome> {
        let span = tracing::info_span!(
            "sync",
            run_id = %Uuid::new_v4(),
            actions = plan.len(),
            %strategy,
            dry_run
        );
        let inner = Arc::clone(&self.inner);
        let retry = RetryPolicy::new(max_retries, inner.settings.base_delay);
        let parallelism = inner.settings.parallelism;

        async move {
            tracing::info!("Starting sync");
            let outcomes = pool::run(
                plan.to_vec(),
                parallelism,
                &self.cancel,
                move |action: SyncAction| {
                    let inner = Arc::clone(&inner);
                    async move {
                        let step = inner.apply_one(&action, strategy, dry_run, retry).await;
                        if let Err(e) = &step.result {
                            tracing::warn!(repo = %action.local_path, kind = %e.kind(), error = %e, "Sync action failed");
                        }
                        SyncOutcome::from_step(&action, strategy, step)
                    }
                },
                move |action, reason| {
                    let result = match reason {
                        Abandoned::Cancelled => Err(Error::process("cancelled before start")),
                        Abandoned::Panicked(message) => {
                            Err(Error::process(format!("sync panicked: {message}")))
                        }
                    };
                    SyncOutcome::from_step(&action, strategy, Step::new(action.kind, result))
                },
            )
            .await;

            let failed = outcomes.iter().filter(|o| !o.succeeded).count();
            tracing::info!(
                succeeded = outcomes.len() - failed,
                failed,
                "Sync finished"
            );
            outcomes
        }
        .instrument(span)
        .await
    }
}

impl Inner {
    async fn apply_one(
        &self,
        action: &SyncAction,
        strategy: SyncStrategy,
        dry_run: bool,
        retry: RetryPolicy,
    ) -> Step {
        match (action.kind, &action.entry) {
            (SyncActionKind::Orphan, _) => Step::new(SyncActionKind::Orphan, Ok(action.reason.clone())),
            (SyncActionKind::UpToDate, _) => {
                Step::new(SyncActionKind::UpToDate, Ok("already up to date".to_string()))
            }
            (SyncActionKind::Clone, Some(entry)) => self.clone_entry(entry, dry_run, retry).await,
            (SyncActionKind::Update, Some(entry)) => {
                self.update(entry, strategy, dry_run, retry).await
            }
            (kind, None) => Step::new(
                kind,
                Err(Error::manifest(format!(
                    "{kind} planned for {} without a listing entry",
                    action.local_path
                ))),
            ),
        }
    }

    async fn clone_entry(&self, entry: &SyncManifestEntry, dry_run: bool, retry: RetryPolicy) -> Step {
        let dest = self.root.join(&entry.local_path);
        if dry_run {
            return Step::new(
                SyncActionKind::Clone,
                Ok(format!("would clone {} into {}", entry.source_url, entry.local_path)),
            );
        }

        let parent = dest.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone());
        if let Err(e) = tokio::fs::create_dir_all(&parent).await {
            return Step::new(
                SyncActionKind::Clone,
                Err(Error::with_source(
                    ErrorKind::Process,
                    format!("cannot create {}", parent.display()),
                    e,
                )),
            );
        }

        let (git, url, dest_ref, parent_ref) = (&self.git, entry.source_url.as_str(), dest.as_path(), parent.as_path());
        let branch = entry.target_branch.as_deref();
        let timeout = self.settings.fetch_timeout;
        let retried = retry
            .run("clone", || async move {
                let late = settle(git.clone_repo(parent_ref, url, dest_ref, branch, timeout).await)?;
                if late && repository_marker(dest_ref) != Some(MarkerKind::Directory) {
                    return Err(Error::process(format!(
                        "clone of {url} exited after its deadline without a checkout"
                    )));
                }
                Ok(late)
            })
            .await;

        Step {
            applied: SyncActionKind::Clone,
            result: retried.result.map(|late| {
                let note = if late { " (after the deadline)" } else { "" };
                format!("cloned {} into {}{note}", entry.source_url, entry.local_path)
            }),
            retries: retried.retries,
        }
    }

    async fn update(
        &self,
        entry: &SyncManifestEntry,
        strategy: SyncStrategy,
        dry_run: bool,
        retry: RetryPolicy,
    ) -> Step {
        let path = self.root.join(&entry.local_path);
        let mut retries = 0;
        let result = self
            .update_inner(&path, entry, strategy, dry_run, retry, &mut retries)
            .await;
        let applied = match &result {
            Ok((kind, _)) => *kind,
            Err(_) => SyncActionKind::Update,
        };
        Step {
            applied,
            result: result.map(|(_, message)| message),
            retries,
        }
    }

    async fn update_inner(
        &self,
        path: &Path,
        entry: &SyncManifestEntry,
        strategy: SyncStrategy,
        dry_run: bool,
        retry: RetryPolicy,
        retries: &mut u32,
    ) -> Result<(SyncActionKind, String)> {
        let remote = self.settings.remote.as_str();
        let action = strategy.gate_action();
        let mut state = inspect_state(path).await?;
        let mut notes = Vec::new();

        match gate::authorize(&state, action, &self.settings.policy) {
            Decision::Skip(reason) => return Err(Error::safety_blocked(reason)),
            Decision::Recover(recovery) if dry_run => notes.push(format!("would {recovery}")),
            Decision::Recover(recovery) => {
                tracing::info!(repo = %path.display(), action = %recovery, "Recovering before sync");
                self.git.abort(path, recovery.operation()).await?;
                notes.push(format!("aborted {}", recovery.operation()));
                state = inspect_state(path).await?;
                if let Decision::Skip(reason) =
                    gate::authorize(&state, action, &GatePolicy::default())
                {
                    return Err(Error::safety_blocked(reason));
                }
            }
            Decision::Proceed => {}
        }

        let branch = entry
            .target_branch
            .clone()
            .or_else(|| state.current_branch.clone())
            .ok_or_else(|| Error::safety_blocked("detached HEAD and no target branch"))?;
        let tracking = format!("{remote}/{branch}");
        let on_target = state.current_branch.as_deref() == Some(branch.as_str());
        let with_notes = |message: String| {
            if notes.is_empty() {
                message
            } else {
                format!("{}; {message}", notes.join("; "))
            }
        };

        if dry_run {
            let head = self.git.rev_parse(path, "HEAD").await.ok();
            let remote_head = self.git.rev_parse(path, &tracking).await.ok();
            if on_target && head.is_some() && head == remote_head {
                return Ok((
                    SyncActionKind::UpToDate,
                    with_notes(format!("already at {tracking} as of the last fetch")),
                ));
            }
            return Ok((
                SyncActionKind::Update,
                with_notes(format!("would fetch {remote} and {strategy} {tracking}")),
            ));
        }

        let (git, timeout) = (&self.git, self.settings.fetch_timeout);
        let fetched = retry
            .run("fetch", || async move {
                settle(git.fetch(path, remote, timeout).await)
            })
            .await;
        *retries = fetched.retries;
        fetched.result?;

        let remote_head = self.git.rev_parse(path, &tracking).await?;
        let head = self.git.rev_parse(path, "HEAD").await.ok();
        if on_target && head.as_deref() == Some(remote_head.as_str()) {
            return Ok((
                SyncActionKind::UpToDate,
                with_notes(format!("already at {tracking}")),
            ));
        }

        if strategy == SyncStrategy::FetchOnly {
            return Ok((
                SyncActionKind::Update,
                with_notes(format!("fetched {remote}; HEAD differs from {tracking}")),
            ));
        }

        if !on_target {
            self.git.switch(path, &branch, false).await?;
            notes.push(format!("switched to {branch}"));
        }

        let message = match strategy {
            SyncStrategy::Reset => {
                self.git.reset_hard(path, &tracking).await?;
                format!("reset to {tracking}")
            }
            SyncStrategy::Pull => {
                let preview = conflict::detect_async(path, &tracking, "HEAD").await?;
                if !preview.report.is_clean() {
                    let count = preview.report.entries.len();
                    return Err(Error::conflict_detected(format!(
                        "merging {tracking} would conflict on {count} {}; resolve manually",
                        if count == 1 { "file" } else { "files" }
                    )));
                }
                self.git.merge_remote(path, remote, &branch).await?;
                format!("merged {tracking}")
            }
            SyncStrategy::FetchOnly => format!("fetched {remote}"),
        };

        let message = if notes.is_empty() {
            message
        } else {
            format!("{}; {message}", notes.join("; "))
        };
        Ok((SyncActionKind::Update, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_map_to_gate_actions() {
        assert_eq!(SyncStrategy::Reset.gate_action(), GateAction::Reset);
        assert_eq!(SyncStrategy::Pull.gate_action(), GateAction::Merge);
        assert_eq!(SyncStrategy::FetchOnly.gate_action(), GateAction::Fetch);
    }

    #[test]
    fn strategy_serializes_snake_case() {
        let json = serde_json::to_string(&SyncStrategy::FetchOnly).unwrap();
        assert_eq!(json, "\"fetch_only\"");
    }
}
