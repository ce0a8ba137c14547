//! Synchronization against an authoritative listing
//!
//! - [`manifest`]: the listing of repositories a fleet should contain
//! - [`plan`]: reconcile the listing with what is on disk
//! - [`apply`]: execute a plan through the worker pool and safety gate

pub mod apply;
pub mod manifest;
pub mod plan;

pub use apply::{SyncExecutor, SyncOutcome, SyncStrategy};
pub use manifest::{SyncManifest, SyncManifestEntry, listing_depth};
pub use plan::{SyncAction, SyncActionKind, plan};
