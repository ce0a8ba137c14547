//! [`TestWorkspace`] builder for multi-repository directory trees.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::git;

/// A temporary fleet root with helpers to lay out repositories beneath it.
///
/// # Example
///
/// ```rust,no_run
/// use fleet_test_utils::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// ws.add_repo("a");
/// ws.add_repo("team/b");
/// ws.add_dir("notes");
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Root of the workspace.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of `relative` under the root.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Create a repository with one commit at `relative`.
    pub fn add_repo(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        git::init_repo_with_commit(&path);
        path
    }

    /// Create a repository at `<relative>` tracking a bare remote stored
    /// under `remotes/`.
    pub fn add_repo_with_remote(&self, relative: &str) -> git::RemotePair {
        git::repo_with_remote(self.root(), relative)
    }

    /// Create a plain directory (no repository).
    pub fn add_dir(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Create a submodule-style pointer directory at `relative`.
    pub fn add_submodule_pointer(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        git::submodule_pointer(&path);
        path
    }

    /// Write a file relative to the root.
    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Assert that `relative` exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_exists(&self, relative: &str) {
        let full_path = self.path(relative);
        assert!(
            full_path.exists(),
            "Expected path to exist: {}",
            full_path.display()
        );
    }

    /// Assert that `relative` does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_not_exists(&self, relative: &str) {
        let full_path = self.path(relative);
        assert!(
            !full_path.exists(),
            "Expected path NOT to exist: {}",
            full_path.display()
        );
    }
}
