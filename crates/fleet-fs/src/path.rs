//! Normalized path handling for repository handles

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
///
/// Repository handles carry both an absolute and a scan-relative form.
/// Keeping one separator everywhere makes relative paths usable as sort
/// keys and as regex subjects for include/exclude filters on every
/// platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        let mut normalized = path_str.replace('\\', "/");
        while normalized.len() > 1 && normalized.ends_with('/') {
            normalized.pop();
        }
        Self { inner: normalized }
    }

    /// Resolve symlinks and relative components, producing an absolute path.
    ///
    /// Uses `dunce` so Windows paths stay in their non-UNC form.
    pub fn canonicalize(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let resolved = dunce::canonicalize(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::new(resolved))
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment. An empty or `.` segment returns self.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let segment = segment.trim_start_matches("./");
        if segment.is_empty() || segment == "." {
            return self.clone();
        }
        let joined = if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment)
        } else {
            format!("{}/{}", self.inner, segment)
        };
        Self::new(joined)
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Path of `self` relative to `base`, or `None` if `self` is not inside it.
    ///
    /// The base itself is reported as `"."`.
    pub fn relative_to(&self, base: &NormalizedPath) -> Option<String> {
        if self.inner == base.inner {
            return Some(".".to_string());
        }
        let prefix = if base.inner.ends_with('/') {
            base.inner.clone()
        } else {
            format!("{}/", base.inner)
        };
        self.inner.strip_prefix(&prefix).map(str::to_string)
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 { None } else { Some(&name[idx + 1..]) }
        })
    }
}

/// Number of path segments in a scan-relative path (`.` has depth 0).
pub fn relative_depth(relative: &str) -> usize {
    if relative == "." || relative.is_empty() {
        0
    } else {
        relative.split('/').filter(|s| !s.is_empty()).count()
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl serde::Serialize for NormalizedPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_to_nested() {
        let base = NormalizedPath::new("/work/fleet");
        let repo = NormalizedPath::new("/work/fleet/team/api");
        assert_eq!(repo.relative_to(&base).as_deref(), Some("team/api"));
    }

    #[test]
    fn relative_to_self_is_dot() {
        let base = NormalizedPath::new("/work/fleet/");
        assert_eq!(base.relative_to(&base).as_deref(), Some("."));
    }

    #[test]
    fn relative_to_sibling_with_shared_prefix() {
        let base = NormalizedPath::new("/work/fleet");
        let other = NormalizedPath::new("/work/fleet-old/api");
        assert_eq!(other.relative_to(&base), None);
    }

    #[test]
    fn join_dot_is_identity() {
        let base = NormalizedPath::new("/work");
        assert_eq!(base.join("."), base);
        assert_eq!(base.join("./api").as_str(), "/work/api");
    }

    #[test]
    fn depth_counts_segments() {
        assert_eq!(relative_depth("."), 0);
        assert_eq!(relative_depth("api"), 1);
        assert_eq!(relative_depth("team/api"), 2);
    }
}
