//! Integration tests for the fleet binary.
//!
//! These tests exercise the compiled binary using assert_cmd against
//! temporary fleets built with real git.

use assert_cmd::Command;
use fleet_test_utils::TestWorkspace;
use fleet_test_utils::git::{conflicting_branches, interrupted_rebase, seeded_remote};
use predicates::prelude::*;
use pretty_assertions::assert_eq;

/// A `fleet` command isolated from the user's configuration.
fn fleet(ws: &TestWorkspace) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fleet"));
    cmd.current_dir(ws.root())
        .env("XDG_CONFIG_HOME", ws.path(".config"))
        .env_remove("FLEET_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_output() {
    let ws = TestWorkspace::new();
    fleet(&ws)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("many repositories"));
}

#[test]
fn test_version_output() {
    let ws = TestWorkspace::new();
    fleet(&ws)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleet"));
}

#[test]
fn test_no_command_shows_help_hint() {
    let ws = TestWorkspace::new();
    fleet(&ws)
        .assert()
        .success()
        .stdout(predicate::str::contains("fleet --help"));
}

// ============================================================================
// Scan and Bulk Command Tests
// ============================================================================

#[test]
fn test_scan_json_lists_repositories() {
    let ws = TestWorkspace::new();
    ws.add_repo("api");
    ws.add_repo("web");
    ws.add_submodule_pointer("vendored");

    let value = json_stdout(fleet(&ws).args(["scan", "--json"]));

    let paths: Vec<_> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["relative_path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["api", "web"]);
}

#[test]
fn test_scan_missing_root_fails() {
    let ws = TestWorkspace::new();
    fleet(&ws)
        .args(["scan", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn test_status_reports_each_repository() {
    let ws = TestWorkspace::new();
    ws.add_repo("api");
    ws.add_repo("web");

    fleet(&ws)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("api"))
        .stdout(predicate::str::contains("main: clean"))
        .stdout(predicate::str::contains("2 repositories: 2 succeeded"));
}

#[test]
fn test_pull_skips_interrupted_rebase() {
    let ws = TestWorkspace::new();
    let repo = ws.add_repo("api");
    interrupted_rebase(&repo);

    let value = json_stdout(fleet(&ws).args(["pull", "--json"]));

    assert_eq!(value["results"][0]["outcome"], "skipped");
    assert!(value["results"][0]["message"].as_str().unwrap().contains("rebase"));
    assert_eq!(value["summary"]["skipped"], 1);
}

#[test]
fn test_recover_aborts_rebase() {
    let ws = TestWorkspace::new();
    let repo = ws.add_repo("api");
    interrupted_rebase(&repo);

    fleet(&ws)
        .arg("recover")
        .assert()
        .success()
        .stdout(predicate::str::contains("aborted rebase"));
    assert!(!repo.join(".git/rebase-merge").exists());
}

#[test]
fn test_failed_fetch_exits_nonzero() {
    let ws = TestWorkspace::new();
    ws.add_repo("no-remote");

    fleet(&ws)
        .arg("fetch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 1 repositories failed"));
}

#[test]
fn test_zero_parallelism_is_rejected() {
    let ws = TestWorkspace::new();
    ws.add_repo("api");

    fleet(&ws)
        .args(["status", "-j", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parallelism"));
}

// ============================================================================
// Sync Tests
// ============================================================================

#[test]
fn test_sync_dry_run_from_manifest_creates_nothing() {
    let ws = TestWorkspace::new();
    let remotes = tempfile::TempDir::new().unwrap();
    let remote = remotes.path().join("repoX.git");
    seeded_remote(&remote);
    ws.write_file(
        "fleet.toml",
        &format!(
            "[[repository]]\nname = \"repoX\"\nsource_url = \"{}\"\nlocal_path = \"repoX\"\n",
            remote.display()
        ),
    );

    fleet(&ws)
        .args(["sync", "--manifest", "fleet.toml", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would clone"));
    ws.assert_not_exists("repoX");
}

#[test]
fn test_sync_clones_from_manifest() {
    let ws = TestWorkspace::new();
    let remotes = tempfile::TempDir::new().unwrap();
    let remote = remotes.path().join("api.git");
    seeded_remote(&remote);
    ws.write_file(
        "fleet.toml",
        &format!(
            "[[repository]]\nname = \"api\"\nsource_url = \"{}\"\nlocal_path = \"services/api\"\n",
            remote.display()
        ),
    );

    fleet(&ws)
        .args(["sync", "--manifest", "fleet.toml", "--strategy", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cloned"));
    ws.assert_exists("services/api/README.md");
}

#[test]
fn test_sync_without_listing_fails() {
    let ws = TestWorkspace::new();
    fleet(&ws)
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("a listing is required"));
}

#[test]
fn test_sync_rejects_escaping_manifest_path() {
    let ws = TestWorkspace::new();
    ws.write_file(
        "fleet.toml",
        "[[repository]]\nname = \"x\"\nsource_url = \"https://example.com/x.git\"\nlocal_path = \"../x\"\n",
    );

    fleet(&ws)
        .args(["sync", "--manifest", "fleet.toml", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("fleet root"));
}

// ============================================================================
// Health, Conflicts and Watch Tests
// ============================================================================

#[test]
fn test_health_json_without_fetch() {
    let ws = TestWorkspace::new();
    ws.add_repo("api");

    let value = json_stdout(fleet(&ws).args(["health", "--skip-fetch", "--json"]));

    assert_eq!(value["records"][0]["repository"], "api");
    assert_eq!(value["records"][0]["fetch_status"], "skipped");
    assert_eq!(value["summary"]["total"], 1);
}

#[test]
fn test_conflicts_lists_conflicting_paths() {
    let ws = TestWorkspace::new();
    let repo = ws.add_repo("api");
    conflicting_branches(&repo);

    fleet(&ws)
        .args(["conflicts", "feature", "main", "--repo", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("README.md"))
        .stdout(predicate::str::contains("1 conflicting file"));
}

#[test]
fn test_conflicts_strict_fails_on_conflict() {
    let ws = TestWorkspace::new();
    let repo = ws.add_repo("api");
    conflicting_branches(&repo);

    fleet(&ws)
        .args(["conflicts", "feature", "main", "--repo", "api", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("merging feature into main conflicts on 1 file"));
}

#[test]
fn test_watch_stops_after_requested_ticks() {
    let ws = TestWorkspace::new();
    ws.add_repo("api");

    fleet(&ws)
        .args(["watch", "--ticks", "2", "--interval", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tick 0"))
        .stdout(predicate::str::contains("tick 1"));
}

#[test]
fn test_invalid_config_file_fails() {
    let ws = TestWorkspace::new();
    ws.write_file("bad.toml", "parallelism = \"many\"\n");

    fleet(&ws)
        .args(["--config", "bad.toml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
