//! Filesystem primitives for fleet
//!
//! Provides normalized path handling, git marker detection, tree checksums
//! and format-agnostic configuration loading.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod markers;
pub mod path;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use markers::{GitMarker, MarkerKind, repository_marker};
pub use path::NormalizedPath;
