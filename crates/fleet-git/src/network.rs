//! Classification of remote failures
//!
//! git reports transport problems only through stderr text. The executor
//! forces `LC_ALL=C`, so the English messages below are stable enough to
//! match once, here, at the process boundary.

use serde::Serialize;

/// Subtype of a failure to talk to a remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    /// The operation did not finish before its deadline.
    Timeout,
    /// DNS, connection or transport failure; the remote could not be reached.
    Unreachable,
    /// The remote rejected our credentials.
    AuthFailed,
}

impl NetworkKind {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unreachable)
    }
}

impl std::fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Timeout => "timeout",
            Self::Unreachable => "unreachable",
            Self::AuthFailed => "authentication failed",
        };
        f.write_str(label)
    }
}

const AUTH_PATTERNS: &[&str] = &[
    "authentication failed",
    "permission denied (publickey",
    "could not read username",
    "could not read password",
    "invalid username or password",
    "http basic: access denied",
    "the requested url returned error: 401",
    "the requested url returned error: 403",
    "host key verification failed",
];

const TIMEOUT_PATTERNS: &[&str] = &[
    "timed out",
    "operation timed out",
    "connection timed out",
];

const UNREACHABLE_PATTERNS: &[&str] = &[
    "could not resolve host",
    "could not resolve hostname",
    "name or service not known",
    "temporary failure in name resolution",
    "connection refused",
    "connection reset",
    "network is unreachable",
    "no route to host",
    "failed to connect",
    "unable to access",
    "could not read from remote repository",
    "does not appear to be a git repository",
    "the remote end hung up unexpectedly",
    "early eof",
    "ssl_connect",
    "gnutls_handshake",
];

/// Classify git's stderr into a network failure kind.
///
/// Authentication is checked first: an auth failure is often followed by a
/// generic "could not read from remote repository" line.
pub fn classify(stderr: &str) -> Option<NetworkKind> {
    let lowered = stderr.to_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| lowered.contains(p));

    if matches(AUTH_PATTERNS) {
        Some(NetworkKind::AuthFailed)
    } else if matches(TIMEOUT_PATTERNS) {
        Some(NetworkKind::Timeout)
    } else if matches(UNREACHABLE_PATTERNS) {
        Some(NetworkKind::Unreachable)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("fatal: unable to access 'https://github.com/o/r/': Could not resolve host: github.com", NetworkKind::Unreachable)]
    #[case("ssh: connect to host github.com port 22: Connection timed out\nfatal: Could not read from remote repository.", NetworkKind::Timeout)]
    #[case("git@github.com: Permission denied (publickey).\nfatal: Could not read from remote repository.", NetworkKind::AuthFailed)]
    #[case("fatal: Authentication failed for 'https://gitlab.com/o/r.git/'", NetworkKind::AuthFailed)]
    #[case("fatal: '/srv/missing.git' does not appear to be a git repository", NetworkKind::Unreachable)]
    fn classifies_common_git_messages(#[case] stderr: &str, #[case] expected: NetworkKind) {
        assert_eq!(classify(stderr), Some(expected));
    }

    #[test]
    fn local_failures_are_not_network() {
        assert_eq!(
            classify("error: Your local changes to the following files would be overwritten by merge"),
            None
        );
    }

    #[test]
    fn auth_is_not_transient() {
        assert!(!NetworkKind::AuthFailed.is_transient());
        assert!(NetworkKind::Timeout.is_transient());
        assert!(NetworkKind::Unreachable.is_transient());
    }
}
