//! Git layer for fleet
//!
//! Everything that talks to git lives here:
//!
//! - [`exec`]: the process executor seam and the `git` CLI implementation
//! - [`commands`]: typed git invocations built on an executor
//! - [`validate`]: allow-list checks for values that end up in argv
//! - [`network`]: classification of remote failures from git's stderr
//! - [`state`]: working tree state inspection via `git2`
//! - [`merge`]: in-memory three-way merge analysis via `git2`

pub mod commands;
pub mod error;
pub mod exec;
pub mod merge;
pub mod network;
pub mod state;
pub mod validate;

pub use commands::Git;
pub use error::{Error, Result};
pub use exec::{GitCli, ProcessExecutor, ProcessOutput};
pub use merge::{MergeConflict, MergeConflictKind, MergeAnalysis};
pub use network::NetworkKind;
pub use state::{InProgressOperation, RepositoryState, inspect};
