//! Typed git invocations
//!
//! [`Git`] turns high-level operations into validated argument lists and
//! runs them through a [`ProcessExecutor`]. A non-zero exit becomes
//! [`Error::CommandFailed`] carrying git's stderr.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::exec::{GitCli, ProcessExecutor, ProcessOutput};
use crate::state::InProgressOperation;
use crate::{Error, Result, validate};

/// Git command runner over a shared executor.
#[derive(Clone)]
pub struct Git {
    exec: Arc<dyn ProcessExecutor>,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git").finish_non_exhaustive()
    }
}

impl Default for Git {
    fn default() -> Self {
        Self::new(Arc::new(GitCli::new()))
    }
}

impl Git {
    pub fn new(exec: Arc<dyn ProcessExecutor>) -> Self {
        Self { exec }
    }

    /// Run raw arguments and fail on non-zero exit.
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<ProcessOutput> {
        self.exec.execute(dir, args).await?.into_result(args)
    }

    /// Run raw arguments against a deadline.
    ///
    /// A process that overruns `timeout` is not abandoned: it is awaited
    /// until it exits, so nothing started afterwards can overlap it in the
    /// same directory. The overrun is still reported as [`Error::Timeout`],
    /// with `exited_ok` recording how the late process ended.
    async fn run_bounded(&self, dir: &Path, args: &[&str], timeout: Duration) -> Result<ProcessOutput> {
        let run = self.run(dir, args);
        tokio::pin!(run);
        match tokio::time::timeout(timeout, &mut run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    dir = %dir.display(),
                    args = ?args,
                    timeout_ms = timeout.as_millis() as u64,
                    "git overran its deadline; waiting for it to exit"
                );
                let late = run.await;
                Err(Error::Timeout {
                    command: args.join(" "),
                    after: timeout,
                    exited_ok: late.is_ok(),
                })
            }
        }
    }

    /// Fetch from `remote`, bounded by `timeout`.
    pub async fn fetch(&self, dir: &Path, remote: &str, timeout: Duration) -> Result<()> {
        validate::validate_remote_name(remote)?;
        let args = ["fetch", "--prune", remote];
        self.run_bounded(dir, &args, timeout).await.map(|_| ())
    }

    /// Merge `<remote>/<branch>` into the current branch.
    pub async fn merge_remote(&self, dir: &Path, remote: &str, branch: &str) -> Result<()> {
        validate::validate_remote_name(remote)?;
        validate::validate_ref_name(branch)?;
        let target = format!("{remote}/{branch}");
        self.run(dir, &["merge", "--no-edit", &target]).await?;
        Ok(())
    }

    /// `git pull` restricted to fast-forwards, bounded by `timeout`.
    pub async fn pull_ff_only(&self, dir: &Path, remote: &str, timeout: Duration) -> Result<()> {
        validate::validate_remote_name(remote)?;
        let args = ["pull", "--ff-only", remote];
        self.run_bounded(dir, &args, timeout).await.map(|_| ())
    }

    /// Push `branch` to `remote`, bounded by `timeout`.
    pub async fn push(
        &self,
        dir: &Path,
        remote: &str,
        branch: &str,
        timeout: Duration,
    ) -> Result<()> {
        validate::validate_remote_name(remote)?;
        validate::validate_ref_name(branch)?;
        let args = ["push", remote, branch];
        self.run_bounded(dir, &args, timeout).await.map(|_| ())
    }

    /// Switch to `branch`, optionally creating it.
    pub async fn switch(&self, dir: &Path, branch: &str, create: bool) -> Result<()> {
        validate::validate_ref_name(branch)?;
        if create {
            self.run(dir, &["checkout", "-b", branch]).await?;
        } else {
            self.run(dir, &["checkout", branch]).await?;
        }
        Ok(())
    }

    /// Clone `url` into `dest`, optionally checking out `branch`.
    ///
    /// `parent` is the directory git runs in; `dest` is created by git.
    pub async fn clone_repo(
        &self,
        parent: &Path,
        url: &str,
        dest: &Path,
        branch: Option<&str>,
        timeout: Duration,
    ) -> Result<()> {
        validate::validate_url(url)?;
        let dest = dest.to_string_lossy();
        let mut args = vec!["clone", "--quiet"];
        if let Some(branch) = branch {
            validate::validate_ref_name(branch)?;
            args.extend(["--branch", branch]);
        }
        // `--` keeps the url and destination out of option parsing.
        args.extend(["--", url, dest.as_ref()]);
        self.run_bounded(parent, &args, timeout).await.map(|_| ())
    }

    /// `git reset --hard <revision>`.
    pub async fn reset_hard(&self, dir: &Path, revision: &str) -> Result<()> {
        validate::validate_revision(revision)?;
        self.run(dir, &["reset", "--hard", revision]).await?;
        Ok(())
    }

    /// Abort an interrupted operation.
    pub async fn abort(&self, dir: &Path, operation: InProgressOperation) -> Result<()> {
        let subcommand = match operation {
            InProgressOperation::Merge => "merge",
            InProgressOperation::Rebase => "rebase",
            InProgressOperation::CherryPick => "cherry-pick",
            InProgressOperation::None => return Ok(()),
        };
        self.run(dir, &[subcommand, "--abort"]).await?;
        Ok(())
    }

    /// Resolve a revision to a full object id.
    pub async fn rev_parse(&self, dir: &Path, revision: &str) -> Result<String> {
        validate::validate_revision(revision)?;
        let output = self
            .run(dir, &["rev-parse", "--verify", "--quiet", revision])
            .await
            .map_err(|e| match e {
                Error::CommandFailed { .. } => Error::RefNotFound {
                    name: revision.to_string(),
                },
                other => other,
            })?;
        Ok(output.stdout.trim().to_string())
    }
}
