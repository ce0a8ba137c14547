//! Process executor seam
//!
//! Every git invocation that may mutate a repository or touch the network
//! goes through [`ProcessExecutor`]. Arguments are passed as a discrete
//! list; no shell is involved.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Captured result of one process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convert a non-zero exit into [`Error::CommandFailed`].
    pub fn into_result(self, args: &[&str]) -> Result<ProcessOutput> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: args.join(" "),
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs git with the given arguments inside a repository directory.
///
/// Implementations must not invoke a shell. `Err` is reserved for failures
/// to run the process at all; a non-zero exit is reported through
/// [`ProcessOutput::exit_code`].
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    async fn execute(&self, dir: &Path, args: &[&str]) -> Result<ProcessOutput>;
}

/// Executor backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    /// Use `git` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessExecutor for GitCli {
    async fn execute(&self, dir: &Path, args: &[&str]) -> Result<ProcessOutput> {
        tracing::debug!(dir = %dir.display(), args = ?args, "Running git");

        // Children are not killed when a caller stops waiting (for example
        // after a timeout); a git process is always allowed to finish writing.
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if !result.success() {
            tracing::debug!(
                dir = %dir.display(),
                code = result.exit_code,
                stderr = %result.stderr.trim(),
                "git exited with failure"
            );
        }
        Ok(result)
    }
}
