//! Bulk commands
//!
//! Each command inspects the repository, asks the safety gate, then runs
//! through the git executor. Dry runs stop after the gate and report what
//! would have happened.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_git::{Git, RepositoryState};
use serde::Serialize;

use crate::gate::{self, Decision, GateAction, GatePolicy, RecoveryAction};
use crate::scanner::RepositoryHandle;
use crate::{Error, Result};

/// Operation applied to every repository in a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkCommand {
    Status,
    Fetch,
    Pull,
    Push,
    Switch { branch: String, create: bool },
    Recover,
}

impl BulkCommand {
    pub fn gate_action(&self) -> GateAction {
        match self {
            Self::Status => GateAction::Status,
            Self::Fetch => GateAction::Fetch,
            Self::Pull => GateAction::Pull,
            Self::Push => GateAction::Push,
            Self::Switch { .. } => GateAction::Switch,
            Self::Recover => GateAction::Recover,
        }
    }
}

/// Inspect a repository on the blocking pool.
pub async fn inspect_state(path: &Path) -> Result<RepositoryState> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || fleet_git::inspect(&path))
        .await
        .map_err(|e| Error::process(format!("inspection task failed: {e}")))?
        .map_err(Error::from)
}

/// Settle a deadline-bounded git call.
///
/// The overrunning process has been awaited, so a clean late exit has
/// already landed on disk and counts as done. `Ok(true)` marks it late.
pub(crate) fn settle(result: fleet_git::Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(false),
        Err(e) if e.finished_late() => {
            tracing::warn!(error = %e, "git finished after its deadline");
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

fn late_note(late: bool) -> &'static str {
    if late { " (after the deadline)" } else { "" }
}

/// One-line description of a repository's state.
pub fn describe_state(state: &RepositoryState) -> String {
    let branch = state.current_branch.as_deref().unwrap_or("(detached)");
    let mut parts = Vec::new();
    if !state.in_progress.is_none() {
        parts.push(format!("{} in progress", state.in_progress));
    }
    if state.has_unresolved_conflicts {
        parts.push(format!("{} conflicted", state.conflicted_paths.len()));
    }
    if state.is_clean {
        parts.push("clean".to_string());
    } else {
        let changed = state.staged_files.len() + state.modified_files.len();
        if changed > 0 {
            parts.push(format!("{changed} changed"));
        }
        if !state.untracked_files.is_empty() {
            parts.push(format!("{} untracked", state.untracked_files.len()));
        }
    }
    match (&state.upstream, state.ahead, state.behind) {
        (None, _, _) => parts.push("no upstream".to_string()),
        (Some(_), 0, 0) => parts.push("up to date".to_string()),
        (Some(_), ahead, 0) => parts.push(format!("ahead {ahead}")),
        (Some(_), 0, behind) => parts.push(format!("behind {behind}")),
        (Some(_), ahead, behind) => parts.push(format!("ahead {ahead}, behind {behind}")),
    }
    format!("{branch}: {}", parts.join(", "))
}

/// Runs [`BulkCommand`]s against single repositories.
#[derive(Debug, Clone)]
pub struct Operator {
    git: Git,
    remote: String,
    timeout: Duration,
    policy: GatePolicy,
    dry_run: bool,
}

impl Operator {
    pub fn new(git: Git, remote: impl Into<String>, timeout: Duration) -> Self {
        Self {
            git,
            remote: remote.into(),
            timeout,
            policy: GatePolicy::default(),
            dry_run: false,
        }
    }

    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Execute `command` on one repository.
    ///
    /// Gate refusals come back as [`crate::ErrorKind::SafetyBlocked`].
    pub async fn execute(&self, repo: &RepositoryHandle, command: &BulkCommand) -> Result<String> {
        let path = repo.absolute_path.as_path();
        let state = inspect_state(path).await?;
        let action = command.gate_action();

        let (state, recovered) = match gate::authorize(&state, action, &self.policy) {
            Decision::Skip(reason) => return Err(Error::safety_blocked(reason)),
            Decision::Recover(recovery) if action == GateAction::Recover => {
                return self.recover(path, recovery).await;
            }
            Decision::Recover(recovery) => {
                if self.dry_run {
                    return Ok(format!(
                        "would {recovery}, then {}",
                        self.preview(&state, command)
                    ));
                }
                self.recover(path, recovery).await?;
                let state = inspect_state(path).await?;
                // A second gate pass without auto-recovery; never loop.
                if let Decision::Skip(reason) =
                    gate::authorize(&state, action, &GatePolicy::default())
                {
                    return Err(Error::safety_blocked(reason));
                }
                (state, Some(recovery))
            }
            Decision::Proceed => (state, None),
        };

        if self.dry_run && action.is_mutating() {
            return Ok(self.preview(&state, command));
        }

        let message = self.run(path, &state, command).await?;
        Ok(match recovered {
            Some(recovery) => format!("aborted {}; {message}", recovery.operation()),
            None => message,
        })
    }

    async fn recover(&self, path: &Path, recovery: RecoveryAction) -> Result<String> {
        if self.dry_run {
            return Ok(format!("would {recovery}"));
        }
        tracing::info!(repo = %path.display(), action = %recovery, "Recovering repository");
        self.git.abort(path, recovery.operation()).await?;
        Ok(format!("aborted {}", recovery.operation()))
    }

    fn preview(&self, state: &RepositoryState, command: &BulkCommand) -> String {
        let branch = state.current_branch.as_deref().unwrap_or("HEAD");
        match command {
            BulkCommand::Status => describe_state(state),
            BulkCommand::Fetch => format!("would fetch {}", self.remote),
            BulkCommand::Pull => format!("would pull {} into {branch}", self.remote),
            BulkCommand::Push => format!("would push {branch} to {}", self.remote),
            BulkCommand::Switch { branch, create } if *create => {
                format!("would create and switch to {branch}")
            }
            BulkCommand::Switch { branch, .. } => format!("would switch to {branch}"),
            BulkCommand::Recover => "nothing to recover".to_string(),
        }
    }

    async fn run(&self, path: &Path, state: &RepositoryState, command: &BulkCommand) -> Result<String> {
        match command {
            BulkCommand::Status => Ok(describe_state(state)),
            BulkCommand::Fetch => {
                if self.dry_run {
                    return Ok(self.preview(state, command));
                }
                let late = settle(self.git.fetch(path, &self.remote, self.timeout).await)?;
                Ok(format!("fetched {}{}", self.remote, late_note(late)))
            }
            BulkCommand::Pull => {
                let branch = require_branch(state)?;
                if !state.has_upstream() {
                    return Err(Error::safety_blocked(format!("{branch} has no upstream")));
                }
                let late = settle(self.git.pull_ff_only(path, &self.remote, self.timeout).await)?;
                Ok(format!("pulled {branch}{}", late_note(late)))
            }
            BulkCommand::Push => {
                let branch = require_branch(state)?;
                let late = settle(self.git.push(path, &self.remote, branch, self.timeout).await)?;
                Ok(format!("pushed {branch} to {}{}", self.remote, late_note(late)))
            }
            BulkCommand::Switch { branch, create } => {
                if state.current_branch.as_deref() == Some(branch.as_str()) && !create {
                    return Ok(format!("already on {branch}"));
                }
                self.git.switch(path, branch, *create).await?;
                Ok(format!("switched to {branch}"))
            }
            BulkCommand::Recover => Err(Error::safety_blocked("nothing to recover")),
        }
    }
}

fn require_branch(state: &RepositoryState) -> Result<&str> {
    state
        .current_branch
        .as_deref()
        .ok_or_else(|| Error::safety_blocked("detached HEAD; check out a branch first"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_git::InProgressOperation;
    use pretty_assertions::assert_eq;

    fn state() -> RepositoryState {
        RepositoryState {
            current_branch: Some("main".into()),
            upstream: Some("origin/main".into()),
            is_clean: true,
            staged_files: vec![],
            modified_files: vec![],
            untracked_files: vec![],
            ahead: 0,
            behind: 0,
            in_progress: InProgressOperation::None,
            has_unresolved_conflicts: false,
            conflicted_paths: vec![],
        }
    }

    #[test]
    fn describes_clean_repository() {
        assert_eq!(describe_state(&state()), "main: clean, up to date");
    }

    #[test]
    fn describes_rebase_with_divergence() {
        let s = RepositoryState {
            in_progress: InProgressOperation::Rebase,
            has_unresolved_conflicts: true,
            conflicted_paths: vec!["a".into()],
            is_clean: false,
            ahead: 2,
            behind: 1,
            ..state()
        };
        assert_eq!(
            describe_state(&s),
            "main: rebase in progress, 1 conflicted, ahead 2, behind 1"
        );
    }

    #[test]
    fn switch_maps_to_switch_gate_action() {
        let command = BulkCommand::Switch {
            branch: "develop".into(),
            create: false,
        };
        assert_eq!(command.gate_action(), GateAction::Switch);
    }

    fn timeout(exited_ok: bool) -> fleet_git::Error {
        fleet_git::Error::Timeout {
            command: "fetch --prune origin".into(),
            after: Duration::from_millis(100),
            exited_ok,
        }
    }

    #[test]
    fn late_clean_exit_settles_as_done() {
        assert!(settle(Err(timeout(true))).unwrap());
        assert!(!settle(Ok(())).unwrap());
    }

    #[test]
    fn late_failure_stays_a_timeout() {
        let err = settle(Err(timeout(false))).unwrap_err();
        assert_eq!(
            err.kind(),
            crate::ErrorKind::Network(fleet_git::NetworkKind::Timeout)
        );
    }
}
