//! Error types for fleet-core
//!
//! One error struct with a tagged [`ErrorKind`]. Callers branch on the kind,
//! never on message text; git stderr is classified into network kinds once,
//! at the process boundary in `fleet-git`.

use fleet_git::NetworkKind;
use serde::Serialize;
use serde::ser::SerializeStruct;

/// Result type for fleet-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Invalid scan root or filesystem walk failure.
    Scan,
    /// A git process failed, or the repository could not be read.
    Process,
    /// The safety gate refused a mutating action.
    SafetyBlocked,
    /// Talking to a remote failed.
    Network(NetworkKind),
    /// Malformed or inconsistent manifest.
    Manifest,
    /// Strict conflict detection found conflicts.
    ConflictDetected,
    /// Invalid invocation options.
    InvalidOptions,
}

impl ErrorKind {
    /// Only transient network failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(kind) if kind.is_transient())
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan => f.write_str("scan"),
            Self::Process => f.write_str("process"),
            Self::SafetyBlocked => f.write_str("safety blocked"),
            Self::Network(kind) => write!(f, "network ({kind})"),
            Self::Manifest => f.write_str("manifest"),
            Self::ConflictDetected => f.write_str("conflict detected"),
            Self::InvalidOptions => f.write_str("invalid options"),
        }
    }
}

/// Errors that can occur in fleet-core operations
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn scan(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Scan, message)
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Process, message)
    }

    pub fn safety_blocked(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::SafetyBlocked, reason)
    }

    pub fn network(kind: NetworkKind, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network(kind), message)
    }

    pub fn manifest(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Manifest, message)
    }

    pub fn conflict_detected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConflictDetected, message)
    }

    pub fn invalid_options(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOptions, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Re-tag a lower-layer error, keeping it as the source.
    pub(crate) fn retag(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl From<fleet_git::Error> for Error {
    fn from(err: fleet_git::Error) -> Self {
        let kind = match err.network_kind() {
            Some(network) => ErrorKind::Network(network),
            None => match &err {
                fleet_git::Error::InvalidArgument { .. } => ErrorKind::InvalidOptions,
                _ => ErrorKind::Process,
            },
        };
        Self::with_source(kind, err.to_string(), err)
    }
}

impl From<fleet_fs::Error> for Error {
    fn from(err: fleet_fs::Error) -> Self {
        let kind = match &err {
            fleet_fs::Error::ConfigParse { .. }
            | fleet_fs::Error::ConfigSerialize { .. }
            | fleet_fs::Error::UnsupportedFormat { .. } => ErrorKind::Manifest,
            fleet_fs::Error::Walk { .. } => ErrorKind::Scan,
            fleet_fs::Error::Io { .. } | fleet_fs::Error::LockFailed { .. } => ErrorKind::Process,
        };
        Self::with_source(kind, err.to_string(), err)
    }
}

impl Serialize for Error {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Error", 2)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn git_network_failures_keep_their_kind() {
        let git_err = fleet_git::Error::CommandFailed {
            command: "fetch --prune origin".into(),
            code: 128,
            stderr: "fatal: Authentication failed for 'https://example.com/o/r.git/'".into(),
        };
        let err = Error::from(git_err);
        assert_eq!(err.kind(), ErrorKind::Network(NetworkKind::AuthFailed));
        assert!(!err.is_retryable());
        assert!(err.source().is_some());
    }

    #[test]
    fn git_timeout_is_retryable() {
        let err = Error::from(fleet_git::Error::Timeout {
            command: "fetch --prune origin".into(),
            after: std::time::Duration::from_secs(1),
            exited_ok: false,
        });
        assert_eq!(err.kind(), ErrorKind::Network(NetworkKind::Timeout));
        assert!(err.is_retryable());
    }

    #[test]
    fn parse_failures_are_manifest_errors() {
        let err = Error::from(fleet_fs::Error::ConfigParse {
            path: "fleet.toml".into(),
            format: "TOML".into(),
            message: "expected `=`".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Manifest);
    }

    #[test]
    fn serializes_kind_and_message() {
        let err = Error::network(NetworkKind::Unreachable, "could not resolve host");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"]["network"], "unreachable");
        assert_eq!(json["message"], "could not resolve host");
    }
}
