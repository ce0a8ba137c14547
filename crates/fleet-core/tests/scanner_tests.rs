//! Tests for repository discovery

use fleet_core::{BulkOperationOptions, ErrorKind, ScanOptions, scan};
use fleet_test_utils::TestWorkspace;
use fleet_test_utils::git::init_repo_with_commit;
use pretty_assertions::assert_eq;

fn options(depth: usize) -> ScanOptions {
    BulkOperationOptions {
        scan_depth: depth,
        ..Default::default()
    }
    .validate()
    .unwrap()
}

fn relative_paths(ws: &TestWorkspace, options: &ScanOptions) -> Vec<String> {
    scan(ws.root(), options)
        .unwrap()
        .into_iter()
        .map(|h| h.relative_path)
        .collect()
}

#[test]
fn test_submodule_pointers_excluded_by_default() {
    // Two independent repositories and one submodule-linked directory
    let ws = TestWorkspace::new();
    ws.add_repo("alpha");
    ws.add_repo("beta");
    ws.add_submodule_pointer("vendored");

    let handles = scan(ws.root(), &options(1)).unwrap();

    assert_eq!(handles.len(), 2);
    assert_eq!(handles[0].relative_path, "alpha");
    assert_eq!(handles[1].relative_path, "beta");
    assert!(handles.iter().all(|h| h.is_repository_root && !h.is_submodule));
}

#[test]
fn test_recursive_submodules_reports_pointers() {
    let ws = TestWorkspace::new();
    ws.add_repo("alpha");
    ws.add_submodule_pointer("vendored");

    let mut opts = options(1);
    opts.recursive_submodules = true;
    let handles = scan(ws.root(), &opts).unwrap();

    assert_eq!(handles.len(), 2);
    let pointer = handles.iter().find(|h| h.relative_path == "vendored").unwrap();
    assert!(pointer.is_submodule);
    assert!(!pointer.is_repository_root);
}

#[test]
fn test_depth_zero_examines_only_the_root() {
    let ws = TestWorkspace::new();
    init_repo_with_commit(ws.root());
    ws.add_repo("child");

    let handles = scan(ws.root(), &options(0)).unwrap();

    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].relative_path, ".");
}

#[test]
fn test_depth_bounds_the_walk() {
    let ws = TestWorkspace::new();
    ws.add_repo("top");
    ws.add_repo("team/nested");
    ws.add_repo("org/team/deep");

    assert_eq!(relative_paths(&ws, &options(1)), vec!["top"]);
    assert_eq!(relative_paths(&ws, &options(2)), vec!["team/nested", "top"]);
    assert_eq!(
        relative_paths(&ws, &options(3)),
        vec!["org/team/deep", "team/nested", "top"]
    );
}

#[test]
fn test_repository_nested_inside_repository_is_found() {
    let ws = TestWorkspace::new();
    ws.add_repo("outer");
    ws.add_repo("outer/inner");

    assert_eq!(relative_paths(&ws, &options(2)), vec!["outer", "outer/inner"]);
}

#[test]
fn test_plain_directories_are_ignored() {
    let ws = TestWorkspace::new();
    ws.add_repo("api");
    ws.add_dir("notes");
    ws.write_file("docs/README.md", "# Docs\n");

    assert_eq!(relative_paths(&ws, &options(2)), vec!["api"]);
}

#[test]
fn test_include_and_exclude_patterns() {
    let ws = TestWorkspace::new();
    ws.add_repo("services/api");
    ws.add_repo("services/legacy");
    ws.add_repo("tools/ci");

    let opts = BulkOperationOptions {
        scan_depth: 2,
        include: vec!["^services/".into()],
        exclude: vec!["legacy".into()],
        ..Default::default()
    }
    .validate()
    .unwrap();

    assert_eq!(relative_paths(&ws, &opts), vec!["services/api"]);
}

#[test]
fn test_results_are_sorted_and_stable() {
    let ws = TestWorkspace::new();
    for name in ["zeta", "alpha", "mid", "beta"] {
        ws.add_repo(name);
    }

    let first = relative_paths(&ws, &options(1));
    let second = relative_paths(&ws, &options(1));

    assert_eq!(first, vec!["alpha", "beta", "mid", "zeta"]);
    assert_eq!(first, second);
}

#[test]
fn test_handles_carry_absolute_paths() {
    let ws = TestWorkspace::new();
    ws.add_repo("api");

    let handles = scan(ws.root(), &options(1)).unwrap();

    assert!(handles[0].absolute_path.is_absolute());
    assert!(handles[0].absolute_path.join(".git").is_dir());
    assert_eq!(handles[0].name(), "api");
}

#[test]
fn test_missing_root_is_a_scan_error() {
    let ws = TestWorkspace::new();
    let err = scan(&ws.path("missing"), &options(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scan);
}

#[test]
fn test_file_root_is_a_scan_error() {
    let ws = TestWorkspace::new();
    ws.write_file("file.txt", "x");
    let err = scan(&ws.path("file.txt"), &options(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scan);
}

#[test]
fn test_zero_parallelism_is_rejected_before_scanning() {
    let err = BulkOperationOptions {
        parallelism: 0,
        ..Default::default()
    }
    .validate()
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOptions);
}
