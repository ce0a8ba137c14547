//! Bulk execution across scanned repositories
//!
//! [`run_bulk`] turns an operation's `Result<String>` into exactly one
//! [`BulkOperationResult`] per repository, whatever happens: success,
//! a gate refusal, an error, a panic or cancellation.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::BulkOperationOptions;
use crate::pool::{self, Abandoned};
use crate::scanner::{self, RepositoryHandle};
use crate::{CancelSignal, Error, ErrorKind, Result};

/// Per-repository outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Skipped,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Succeeded => "ok",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Result of one operation on one repository.
#[derive(Debug, Serialize)]
pub struct BulkOperationResult {
    pub repository: RepositoryHandle,
    pub outcome: Outcome,
    pub message: String,
    pub duration_ms: u64,
    pub error: Option<Error>,
}

impl BulkOperationResult {
    fn from_result(repository: RepositoryHandle, result: Result<String>, duration_ms: u64) -> Self {
        match result {
            Ok(message) => Self {
                repository,
                outcome: Outcome::Succeeded,
                message,
                duration_ms,
                error: None,
            },
            Err(e) => {
                let outcome = if e.kind() == ErrorKind::SafetyBlocked {
                    Outcome::Skipped
                } else {
                    Outcome::Failed
                };
                Self {
                    repository,
                    outcome,
                    message: e.message().to_string(),
                    duration_ms,
                    error: Some(e),
                }
            }
        }
    }

    fn abandoned(repository: RepositoryHandle, reason: Abandoned) -> Self {
        match reason {
            Abandoned::Cancelled => Self {
                repository,
                outcome: Outcome::Skipped,
                message: "cancelled before start".to_string(),
                duration_ms: 0,
                error: None,
            },
            Abandoned::Panicked(message) => {
                let error = Error::process(format!("operation panicked: {message}"));
                Self {
                    repository,
                    outcome: Outcome::Failed,
                    message: error.message().to_string(),
                    duration_ms: 0,
                    error: Some(error),
                }
            }
        }
    }
}

/// Outcome counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BulkSummary {
    pub fn from_results(results: &[BulkOperationResult]) -> Self {
        results.iter().fold(
            Self {
                total: results.len(),
                ..Self::default()
            },
            |mut summary, result| {
                match result.outcome {
                    Outcome::Succeeded => summary.succeeded += 1,
                    Outcome::Skipped => summary.skipped += 1,
                    Outcome::Failed => summary.failed += 1,
                }
                summary
            },
        )
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for BulkSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} repositories: {} succeeded, {} skipped, {} failed",
            self.total, self.succeeded, self.skipped, self.failed
        )
    }
}

/// Run `operation` on every repository with bounded parallelism.
///
/// `Ok(message)` is a success, an error of kind
/// [`ErrorKind::SafetyBlocked`] is a skip, any other error is a failure.
/// Results are sorted by relative path.
pub async fn run_bulk<F, Fut>(
    repos: Vec<RepositoryHandle>,
    parallelism: usize,
    cancel: &CancelSignal,
    operation: F,
) -> Vec<BulkOperationResult>
where
    F: Fn(RepositoryHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    let span = tracing::info_span!(
        "bulk",
        run_id = %Uuid::new_v4(),
        repositories = repos.len(),
        parallelism
    );

    async move {
        tracing::info!("Starting bulk run");
        let operation = Arc::new(operation);
        let mut results = pool::run(
            repos,
            parallelism,
            cancel,
            move |repo: RepositoryHandle| {
                let operation = Arc::clone(&operation);
                async move {
                    let started = Instant::now();
                    let result = operation(repo.clone()).await;
                    let duration_ms = started.elapsed().as_millis() as u64;
                    if let Err(e) = &result {
                        tracing::debug!(repo = %repo.relative_path, kind = %e.kind(), error = %e, "Operation did not succeed");
                    }
                    BulkOperationResult::from_result(repo, result, duration_ms)
                }
            },
            BulkOperationResult::abandoned,
        )
        .await;

        results.sort_by(|a, b| a.repository.relative_path.cmp(&b.repository.relative_path));
        let summary = BulkSummary::from_results(&results);
        tracing::info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Bulk run finished"
        );
        results
    }
    .instrument(span)
    .await
}

/// Scan-then-run entry point.
#[derive(Debug, Clone, Default)]
pub struct BulkRunner {
    options: BulkOperationOptions,
    cancel: CancelSignal,
}

impl BulkRunner {
    pub fn new(options: BulkOperationOptions) -> Self {
        Self {
            options,
            cancel: CancelSignal::new(),
        }
    }

    /// Share a cancellation signal, typically wired to Ctrl-C.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &BulkOperationOptions {
        &self.options
    }

    /// Validate options, scan `root`, and run `operation` on every match.
    ///
    /// Fails only on invalid options or an invalid scan root.
    pub async fn run<F, Fut>(&self, root: &Path, operation: F) -> Result<Vec<BulkOperationResult>>
    where
        F: Fn(RepositoryHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let scan_options = self.options.validate()?;
        let repos = scanner::scan(root, &scan_options)?;
        Ok(run_bulk(repos, self.options.parallelism, &self.cancel, operation).await)
    }
}
