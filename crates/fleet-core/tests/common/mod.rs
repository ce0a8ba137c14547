//! Instrumented process executors for integration tests
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fleet_git::{Git, GitCli, ProcessExecutor, ProcessOutput, Result};

/// Delegates to real git, tracking how many calls are in flight at once.
/// Each call is held for `delay` first so overlaps are observable.
#[derive(Debug, Default)]
pub struct CountingExecutor {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl CountingExecutor {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessExecutor for CountingExecutor {
    async fn execute(&self, dir: &Path, args: &[&str]) -> Result<ProcessOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = GitCli::new().execute(dir, args).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Fails the first `failures` calls whose subcommand is `subcommand` with
/// `stderr`, then delegates to real git.
#[derive(Debug)]
pub struct FlakyExecutor {
    subcommand: &'static str,
    failures: usize,
    stderr: &'static str,
    seen: AtomicUsize,
}

impl FlakyExecutor {
    pub fn new(subcommand: &'static str, failures: usize, stderr: &'static str) -> Arc<Self> {
        Arc::new(Self {
            subcommand,
            failures,
            stderr,
            seen: AtomicUsize::new(0),
        })
    }

    /// Always fail `subcommand`.
    pub fn always(subcommand: &'static str, stderr: &'static str) -> Arc<Self> {
        Self::new(subcommand, usize::MAX, stderr)
    }

    /// Calls of `subcommand` observed so far.
    pub fn attempts(&self) -> usize {
        self.seen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessExecutor for FlakyExecutor {
    async fn execute(&self, dir: &Path, args: &[&str]) -> Result<ProcessOutput> {
        if args.first() == Some(&self.subcommand) {
            let attempt = self.seen.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Ok(ProcessOutput {
                    stdout: String::new(),
                    stderr: self.stderr.to_string(),
                    exit_code: 128,
                });
            }
        }
        GitCli::new().execute(dir, args).await
    }
}

/// Holds every `subcommand` call for `delay` before running real git, so a
/// shorter deadline expires while the call is still in flight.
#[derive(Debug)]
pub struct SlowExecutor {
    subcommand: &'static str,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowExecutor {
    pub fn new(subcommand: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            subcommand,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        })
    }

    /// Most `subcommand` calls ever running at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessExecutor for SlowExecutor {
    async fn execute(&self, dir: &Path, args: &[&str]) -> Result<ProcessOutput> {
        if args.first() != Some(&self.subcommand) {
            return GitCli::new().execute(dir, args).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = GitCli::new().execute(dir, args).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub const UNREACHABLE: &str =
    "fatal: unable to access 'https://git.example.com/acme/api.git/': Could not resolve host: git.example.com";

pub const AUTH_DENIED: &str =
    "git@git.example.com: Permission denied (publickey).\nfatal: Could not read from remote repository.";

pub fn git_with(exec: Arc<dyn ProcessExecutor>) -> Git {
    Git::new(exec)
}
