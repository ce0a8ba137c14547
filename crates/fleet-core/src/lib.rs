//! Bulk execution and synchronization across many git repositories
//!
//! This crate coordinates `fleet-fs` and `fleet-git` into fleet-wide
//! operations:
//!
//! - **Scanning**: find working trees under a root to a bounded depth
//! - **Safety gate**: refuse mutations on conflicted or interrupted repositories
//! - **Bulk runs**: one operation over every repository on a bounded worker pool
//! - **Sync**: plan and apply reconciliation against a forge or manifest listing
//! - **Health**: fetch, inspect and classify divergence fleet-wide
//! - **Conflicts**: preview merge conflicts without touching the working tree
//!
//! # Architecture
//!
//! ```text
//!                    fleet-cli
//!                        |
//!                   fleet-core
//!                        |
//!              +---------+---------+
//!              |                   |
//!          fleet-git  ------>  fleet-fs
//! ```

pub mod bulk;
pub mod cancel;
pub mod config;
pub mod conflict;
pub mod error;
pub mod forge;
pub mod gate;
pub mod health;
pub mod ops;
pub mod pool;
pub mod retry;
pub mod scanner;
pub mod sync;
pub mod watch;

pub use bulk::{BulkOperationResult, BulkRunner, BulkSummary, Outcome, run_bulk};
pub use cancel::CancelSignal;
pub use config::{BulkOperationOptions, FleetConfig, HealthOptions, SyncSettings};
pub use conflict::{ConflictKind, ConflictReport, Difficulty, MergePreview, detect, detect_strict};
pub use error::{Error, ErrorKind, Result};
pub use forge::{CloneProtocol, ForgeProvider, ForgeRepository, RepoFilter, listing_to_entries};
pub use gate::{Decision, GateAction, GatePolicy, RecoveryAction, authorize};
pub use health::{Divergence, FetchStatus, HealthChecker, HealthRecord, HealthReport, diagnose};
pub use ops::{BulkCommand, Operator};
pub use retry::RetryPolicy;
pub use scanner::{RepositoryHandle, ScanFilter, ScanOptions, scan};
pub use sync::{
    SyncAction, SyncActionKind, SyncExecutor, SyncManifest, SyncManifestEntry, SyncOutcome,
    SyncStrategy, listing_depth, plan,
};
pub use watch::Watcher;
