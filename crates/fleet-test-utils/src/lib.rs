//! Shared test utilities for the fleet workspace.
//!
//! Dev-dependency only; never published.
//!
//! # Modules
//!
//! - [`git`]: git repository fixtures driven through the `git` CLI
//! - [`workspace`]: [`TestWorkspace`] builder for multi-repository trees

pub mod git;
pub mod workspace;

pub use workspace::TestWorkspace;
