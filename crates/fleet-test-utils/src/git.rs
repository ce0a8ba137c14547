//! Git repository fixtures.
//!
//! Everything here drives the real `git` CLI so the resulting repositories
//! look exactly like ones an operator would have on disk. Fixtures panic on
//! any failure; they are only meant for tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn command(dir: &Path, args: &[&str]) -> Output {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_EDITOR", "true")
        .env("LC_ALL", "C")
        .output()
        .unwrap_or_else(|e| panic!("failed to run `git {args:?}` in {}: {e}", dir.display()))
}

/// Run git in `dir` and return trimmed stdout.
///
/// # Panics
/// Panics if git cannot be spawned or exits non-zero.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = command(dir, args);
    if !output.status.success() {
        panic!(
            "`git {args:?}` failed in {}:\n{}",
            dir.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Run git in `dir` and return whether it succeeded. Used for commands
/// that are expected to stop halfway, such as a conflicting rebase.
pub fn git_allow_failure(dir: &Path, args: &[&str]) -> bool {
    command(dir, args).status.success()
}

/// Set a local identity and disable signing.
pub fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// Initialise a repository on branch `main` with one commit of `README.md`.
///
/// Creates `path` if needed.
pub fn init_repo_with_commit(path: &Path) {
    fs::create_dir_all(path)
        .unwrap_or_else(|e| panic!("failed to create {}: {e}", path.display()));
    git(path, &["init", "--quiet"]);
    // symbolic-ref works on every git version, unlike `init -b`.
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure_identity(path);
    commit_file(path, "README.md", "# Test\n", "Initial commit");
}

/// Write `name` with `content`, stage it and commit.
pub fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
    let file = dir.join(name);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("failed to create {}: {e}", parent.display()));
    }
    fs::write(&file, content).unwrap_or_else(|e| panic!("failed to write {}: {e}", file.display()));
    git(dir, &["add", "--", name]);
    git(dir, &["commit", "--quiet", "-m", message]);
}

/// Current HEAD commit id.
pub fn head_oid(dir: &Path) -> String {
    git(dir, &["rev-parse", "HEAD"])
}

/// Trimmed `git status --porcelain` output.
pub fn porcelain_status(dir: &Path) -> String {
    git(dir, &["status", "--porcelain"])
}

/// Create an empty bare repository whose HEAD names `main`.
pub fn bare_remote(path: &Path) {
    fs::create_dir_all(path)
        .unwrap_or_else(|e| panic!("failed to create {}: {e}", path.display()));
    git(path, &["init", "--bare", "--quiet"]);
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
}

/// A working repository tracking a bare remote.
#[derive(Debug, Clone)]
pub struct RemotePair {
    /// Working tree with `origin` pointing at `remote` and `main` tracking it.
    pub work: PathBuf,
    /// Bare repository.
    pub remote: PathBuf,
}

/// Create `<root>/remotes/<name>.git` (bare) and `<root>/<name>` (working
/// tree), with one commit pushed to `origin/main`.
pub fn repo_with_remote(root: &Path, name: &str) -> RemotePair {
    let remote = root.join("remotes").join(format!("{name}.git"));
    let work = root.join(name);
    bare_remote(&remote);
    init_repo_with_commit(&work);
    let remote_str = remote.to_string_lossy().to_string();
    git(&work, &["remote", "add", "origin", &remote_str]);
    git(&work, &["push", "--quiet", "-u", "origin", "main"]);
    RemotePair { work, remote }
}

/// Seed a bare remote at `remote` with one commit on `main`, without
/// leaving a working tree behind.
pub fn seeded_remote(remote: &Path) {
    bare_remote(remote);
    let scratch = TempDir::new().unwrap_or_else(|e| panic!("failed to create scratch dir: {e}"));
    let work = scratch.path().join("seed");
    init_repo_with_commit(&work);
    let remote_str = remote.to_string_lossy().to_string();
    git(&work, &["remote", "add", "origin", &remote_str]);
    git(&work, &["push", "--quiet", "origin", "main"]);
}

/// Push a new commit of `name` to the remote's `main` from a throwaway clone.
pub fn advance_remote(remote: &Path, name: &str, content: &str) {
    let scratch = TempDir::new().unwrap_or_else(|e| panic!("failed to create scratch dir: {e}"));
    let remote_str = remote.to_string_lossy().to_string();
    git(scratch.path(), &["clone", "--quiet", &remote_str, "work"]);
    let work = scratch.path().join("work");
    configure_identity(&work);
    commit_file(&work, name, content, &format!("Update {name}"));
    git(&work, &["push", "--quiet", "origin", "main"]);
}

/// Create branch `feature` and advance `main` so both edit `README.md`
/// differently. Leaves `main` checked out.
pub fn conflicting_branches(path: &Path) {
    git(path, &["checkout", "--quiet", "-b", "feature"]);
    commit_file(path, "README.md", "# Feature\n", "Feature change");
    git(path, &["checkout", "--quiet", "main"]);
    commit_file(path, "README.md", "# Main\n", "Main change");
}

/// Leave `feature` halfway through a conflicting rebase onto `main`.
pub fn interrupted_rebase(path: &Path) {
    conflicting_branches(path);
    git(path, &["checkout", "--quiet", "feature"]);
    let completed = git_allow_failure(path, &["rebase", "main"]);
    assert!(!completed, "interrupted_rebase: rebase unexpectedly succeeded");
}

/// Leave `main` halfway through a conflicting merge of `feature`.
pub fn interrupted_merge(path: &Path) {
    conflicting_branches(path);
    let completed = git_allow_failure(path, &["merge", "--no-edit", "feature"]);
    assert!(!completed, "interrupted_merge: merge unexpectedly succeeded");
}

/// Create a directory whose `.git` is a pointer file, as git does for
/// submodules and linked worktrees.
pub fn submodule_pointer(path: &Path) {
    fs::create_dir_all(path)
        .unwrap_or_else(|e| panic!("failed to create {}: {e}", path.display()));
    fs::write(path.join(".git"), "gitdir: ../.git/modules/vendored\n")
        .unwrap_or_else(|e| panic!("failed to write .git pointer: {e}"));
}
