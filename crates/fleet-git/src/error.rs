//! Error types for fleet-git

use std::path::PathBuf;
use std::time::Duration;

use crate::network::{self, NetworkKind};

/// Result type for fleet-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fleet-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] fleet_fs::Error),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`git {command}` failed (exit code {code}): {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The deadline passed. The process was still awaited to exit;
    /// `exited_ok` is whether it eventually succeeded.
    #[error("`git {command}` timed out after {after:?}")]
    Timeout {
        command: String,
        after: Duration,
        exited_ok: bool,
    },

    #[error("Invalid {kind}: {value:?}")]
    InvalidArgument { kind: &'static str, value: String },

    #[error("Reference '{name}' not found")]
    RefNotFound { name: String },

    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },
}

impl Error {
    /// Network classification of this failure, if it came from talking to a remote.
    pub fn network_kind(&self) -> Option<NetworkKind> {
        match self {
            Self::Timeout { .. } => Some(NetworkKind::Timeout),
            Self::CommandFailed { stderr, .. } => network::classify(stderr),
            _ => None,
        }
    }

    /// A deadline overrun whose process still exited successfully.
    pub fn finished_late(&self) -> bool {
        matches!(self, Self::Timeout { exited_ok: true, .. })
    }

    pub(crate) fn invalid(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidArgument {
            kind,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_timeout_keeps_its_unit() {
        let err = Error::Timeout {
            command: "fetch --prune origin".into(),
            after: Duration::from_millis(250),
            exited_ok: false,
        };
        assert_eq!(err.to_string(), "`git fetch --prune origin` timed out after 250ms");
        assert_eq!(err.network_kind(), Some(NetworkKind::Timeout));
        assert!(!err.finished_late());
    }
}
