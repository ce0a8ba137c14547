//! Allow-list validation for values placed in git argv
//!
//! Branch names, revisions, remotes, URLs and paths frequently come from
//! operator input or forge listings. Each is checked against a narrow
//! pattern before it reaches a git command line; nothing starting with `-`
//! is ever accepted, so a value can never be parsed as an option.

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

static REF_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._/+-]*$").expect("Invalid ref name regex")
});

static REVISION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._/+-]*([~^][0-9]*)*$").expect("Invalid revision regex")
});

static REMOTE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]*$").expect("Invalid remote name regex")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((https?|ssh|git|file)://[^\s]+|[A-Za-z0-9_][A-Za-z0-9._-]*@[A-Za-z0-9.-]+:[^\s]+|/[^\s]*)$",
    )
    .expect("Invalid url regex")
});

static RELATIVE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.][\w. /-]*$").expect("Invalid relative path regex"));

/// Validate a branch or other short ref name.
///
/// Follows the subset of `git check-ref-format` rules that matter for
/// safety and sanity.
pub fn validate_ref_name(name: &str) -> Result<()> {
    let ok = REF_NAME.is_match(name)
        && !name.contains("..")
        && !name.contains("//")
        && !name.contains("@{")
        && !name.ends_with('/')
        && !name.ends_with('.')
        && !name.ends_with(".lock");
    if ok {
        Ok(())
    } else {
        Err(Error::invalid("ref name", name))
    }
}

/// Validate a revision expression: a ref name, object id, or either with
/// `~n` / `^n` suffixes.
pub fn validate_revision(revision: &str) -> Result<()> {
    let ok = REVISION.is_match(revision) && !revision.contains("..") && !revision.contains("@{");
    if ok {
        Ok(())
    } else {
        Err(Error::invalid("revision", revision))
    }
}

/// Validate a remote name such as `origin`.
pub fn validate_remote_name(name: &str) -> Result<()> {
    if REMOTE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(Error::invalid("remote name", name))
    }
}

/// Validate a clone URL: `https://`, `ssh://`, `git://`, `file://`,
/// scp-style `user@host:path`, or an absolute local path.
pub fn validate_url(url: &str) -> Result<()> {
    if URL.is_match(url) && !url.chars().any(char::is_control) {
        Ok(())
    } else {
        Err(Error::invalid("url", url))
    }
}

/// Validate a path relative to a fleet root.
///
/// Rejects absolute paths and any `..` component.
pub fn validate_relative_path(path: &str) -> Result<()> {
    let ok = RELATIVE_PATH.is_match(path)
        && !path.starts_with('/')
        && !path.split('/').any(|segment| segment == ".." || segment == "." || segment.is_empty());
    if ok {
        Ok(())
    } else {
        Err(Error::invalid("relative path", path))
    }
}
