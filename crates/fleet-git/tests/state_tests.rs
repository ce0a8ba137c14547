//! State inspection against real repositories

use fleet_git::{InProgressOperation, inspect};
use fleet_test_utils::git::{self, commit_file};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn clean_repository_without_upstream() {
    let temp = TempDir::new().unwrap();
    git::init_repo_with_commit(temp.path());

    let state = inspect(temp.path()).unwrap();
    assert_eq!(state.current_branch.as_deref(), Some("main"));
    assert!(state.is_clean);
    assert!(!state.has_upstream());
    assert_eq!((state.ahead, state.behind), (0, 0));
    assert_eq!(state.in_progress, InProgressOperation::None);
    assert!(!state.has_unresolved_conflicts);
}

#[test]
fn categorizes_staged_modified_and_untracked() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    git::init_repo_with_commit(root);
    commit_file(root, "tracked.txt", "one\n", "Add tracked");

    std::fs::write(root.join("README.md"), "# Changed\n").unwrap();
    std::fs::write(root.join("staged.txt"), "new\n").unwrap();
    git::git(root, &["add", "staged.txt"]);
    std::fs::write(root.join("tracked.txt"), "two\n").unwrap();
    std::fs::write(root.join("scratch.log"), "tmp\n").unwrap();

    let state = inspect(root).unwrap();
    assert!(!state.is_clean);
    assert_eq!(state.staged_files, vec!["staged.txt".to_string()]);
    assert_eq!(
        state.modified_files,
        vec!["README.md".to_string(), "tracked.txt".to_string()]
    );
    assert_eq!(state.untracked_files, vec!["scratch.log".to_string()]);
    assert!(state.is_dirty());
}

#[test]
fn untracked_only_is_dirty() {
    let temp = TempDir::new().unwrap();
    git::init_repo_with_commit(temp.path());
    std::fs::write(temp.path().join("notes.txt"), "x").unwrap();

    let state = inspect(temp.path()).unwrap();
    assert!(!state.is_clean);
    assert!(state.is_dirty());
    assert!(state.staged_files.is_empty() && state.modified_files.is_empty());
}

#[test]
fn ahead_and_behind_upstream() {
    let temp = TempDir::new().unwrap();
    let pair = git::repo_with_remote(temp.path(), "api");

    git::advance_remote(&pair.remote, "remote.txt", "from remote\n");
    git::git(&pair.work, &["fetch", "--quiet", "origin"]);
    commit_file(&pair.work, "local.txt", "one\n", "Local one");
    commit_file(&pair.work, "local2.txt", "two\n", "Local two");

    let state = inspect(&pair.work).unwrap();
    assert_eq!(state.upstream.as_deref(), Some("origin/main"));
    assert_eq!((state.ahead, state.behind), (2, 1));
}

#[test]
fn interrupted_rebase_is_detected_with_conflicts() {
    let temp = TempDir::new().unwrap();
    git::init_repo_with_commit(temp.path());
    git::interrupted_rebase(temp.path());

    let state = inspect(temp.path()).unwrap();
    assert_eq!(state.in_progress, InProgressOperation::Rebase);
    assert_eq!(state.current_branch.as_deref(), Some("feature"));
    assert!(state.has_unresolved_conflicts);
    assert_eq!(state.conflicted_paths, vec!["README.md".to_string()]);
}

#[test]
fn interrupted_merge_is_detected() {
    let temp = TempDir::new().unwrap();
    git::init_repo_with_commit(temp.path());
    git::interrupted_merge(temp.path());

    let state = inspect(temp.path()).unwrap();
    assert_eq!(state.in_progress, InProgressOperation::Merge);
    assert_eq!(state.current_branch.as_deref(), Some("main"));
    assert!(state.has_unresolved_conflicts);
}

#[test]
fn detached_head_has_no_branch() {
    let temp = TempDir::new().unwrap();
    git::init_repo_with_commit(temp.path());
    let oid = git::head_oid(temp.path());
    git::git(temp.path(), &["checkout", "--quiet", "--detach", &oid]);

    let state = inspect(temp.path()).unwrap();
    assert_eq!(state.current_branch, None);
    assert!(!state.has_upstream());
}

#[test]
fn plain_directory_is_not_a_repository() {
    let temp = TempDir::new().unwrap();
    let err = inspect(temp.path()).unwrap_err();
    assert!(matches!(err, fleet_git::Error::NotARepository { .. }));
}
