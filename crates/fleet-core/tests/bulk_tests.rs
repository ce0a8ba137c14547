//! Tests for bulk runs, the safety gate and recovery against real repositories

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CountingExecutor, git_with};
use fleet_core::ops::inspect_state;
use fleet_core::{
    BulkCommand, BulkOperationOptions, BulkRunner, BulkSummary, CancelSignal, ErrorKind,
    GatePolicy, Operator, Outcome, run_bulk, scan,
};
use fleet_git::{Git, InProgressOperation};
use fleet_test_utils::TestWorkspace;
use fleet_test_utils::git::{interrupted_merge, interrupted_rebase, porcelain_status};
use pretty_assertions::assert_eq;

fn operator(git: Git) -> Arc<Operator> {
    Arc::new(Operator::new(git, "origin", Duration::from_secs(30)))
}

async fn run_command(
    ws: &TestWorkspace,
    operator: Arc<Operator>,
    command: BulkCommand,
    parallelism: usize,
) -> Vec<fleet_core::BulkOperationResult> {
    let repos = scan(ws.root(), &BulkOperationOptions::default().validate().unwrap()).unwrap();
    run_bulk(repos, parallelism, &CancelSignal::new(), move |repo| {
        let operator = Arc::clone(&operator);
        let command = command.clone();
        async move { operator.execute(&repo, &command).await }
    })
    .await
}

#[tokio::test]
async fn test_pull_on_interrupted_rebase_is_skipped_then_recovered() {
    let ws = TestWorkspace::new();
    let repo = ws.add_repo("api");
    interrupted_rebase(&repo);

    let results = run_command(&ws, operator(Git::default()), BulkCommand::Pull, 2).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::Skipped);
    assert!(results[0].message.contains("rebase"), "{}", results[0].message);
    assert_eq!(
        results[0].error.as_ref().map(|e| e.kind()),
        Some(ErrorKind::SafetyBlocked)
    );

    let results = run_command(&ws, operator(Git::default()), BulkCommand::Recover, 2).await;
    assert_eq!(results[0].outcome, Outcome::Succeeded);
    assert_eq!(results[0].message, "aborted rebase");

    let state = inspect_state(&repo).await.unwrap();
    assert_eq!(state.in_progress, InProgressOperation::None);
    assert!(!state.has_unresolved_conflicts);
}

#[tokio::test]
async fn test_status_is_allowed_during_a_merge() {
    let ws = TestWorkspace::new();
    let repo = ws.add_repo("api");
    interrupted_merge(&repo);
    let before = porcelain_status(&repo);

    let results = run_command(&ws, operator(Git::default()), BulkCommand::Status, 1).await;

    assert_eq!(results[0].outcome, Outcome::Succeeded);
    assert!(results[0].message.contains("merge in progress"));
    assert_eq!(porcelain_status(&repo), before);
}

#[tokio::test]
async fn test_recover_on_clean_repository_is_skipped() {
    let ws = TestWorkspace::new();
    ws.add_repo("api");

    let results = run_command(&ws, operator(Git::default()), BulkCommand::Recover, 1).await;

    assert_eq!(results[0].outcome, Outcome::Skipped);
    assert_eq!(results[0].message, "nothing to recover");
}

#[tokio::test]
async fn test_auto_recover_aborts_merge_before_switching() {
    let ws = TestWorkspace::new();
    let repo = ws.add_repo("api");
    interrupted_merge(&repo);

    let op = Arc::new(
        Operator::new(Git::default(), "origin", Duration::from_secs(30))
            .with_policy(GatePolicy { auto_recover: true }),
    );
    let results = run_command(
        &ws,
        op,
        BulkCommand::Switch {
            branch: "feature".into(),
            create: false,
        },
        1,
    )
    .await;

    assert_eq!(results[0].outcome, Outcome::Succeeded, "{}", results[0].message);
    assert!(results[0].message.starts_with("aborted merge"));
    let state = inspect_state(&repo).await.unwrap();
    assert_eq!(state.in_progress, InProgressOperation::None);
    assert_eq!(state.current_branch.as_deref(), Some("feature"));
}

#[tokio::test]
async fn test_dry_run_switch_changes_nothing() {
    let ws = TestWorkspace::new();
    let repo = ws.add_repo("api");

    let op = Arc::new(
        Operator::new(Git::default(), "origin", Duration::from_secs(30)).with_dry_run(true),
    );
    let results = run_command(
        &ws,
        op,
        BulkCommand::Switch {
            branch: "release".into(),
            create: true,
        },
        1,
    )
    .await;

    assert_eq!(results[0].outcome, Outcome::Succeeded);
    assert_eq!(results[0].message, "would create and switch to release");
    let state = inspect_state(&repo).await.unwrap();
    assert_eq!(state.current_branch.as_deref(), Some("main"));
}

#[tokio::test]
async fn test_push_with_uncommitted_changes_is_skipped() {
    let ws = TestWorkspace::new();
    let pair = ws.add_repo_with_remote("api");
    std::fs::write(pair.work.join("README.md"), "# Edited\n").unwrap();

    let results = run_command(&ws, operator(Git::default()), BulkCommand::Push, 1).await;

    assert_eq!(results[0].outcome, Outcome::Skipped);
    assert!(results[0].message.contains("uncommitted changes"));
}

#[tokio::test]
async fn test_one_result_per_repository_with_bounded_concurrency() {
    let ws = TestWorkspace::new();
    for name in ["a", "b", "c", "d", "e"] {
        ws.add_repo_with_remote(name);
    }
    let counting = CountingExecutor::new(Duration::from_millis(50));

    let results = run_command(&ws, operator(git_with(counting.clone())), BulkCommand::Fetch, 2).await;

    let names: Vec<_> = results.iter().map(|r| r.repository.relative_path.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    assert!(results.iter().all(|r| r.outcome == Outcome::Succeeded));
    assert_eq!(counting.calls(), 5);
    assert!(counting.peak() <= 2, "peak concurrency {}", counting.peak());
}

#[tokio::test]
async fn test_failures_are_isolated_per_repository() {
    let ws = TestWorkspace::new();
    ws.add_repo_with_remote("good");
    // No remote configured, so fetch fails here only.
    ws.add_repo("orphaned");

    let results = run_command(&ws, operator(Git::default()), BulkCommand::Fetch, 2).await;
    let summary = BulkSummary::from_results(&results);

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(results[0].repository.relative_path, "good");
    assert_eq!(results[1].outcome, Outcome::Failed);
    assert!(!summary.is_success());
}

#[tokio::test]
async fn test_cancelled_run_still_reports_every_repository() {
    let ws = TestWorkspace::new();
    for name in ["a", "b", "c"] {
        ws.add_repo(name);
    }
    let cancel = CancelSignal::new();
    cancel.cancel();

    let runner = BulkRunner::new(BulkOperationOptions::default()).with_cancel(cancel);
    let op = operator(Git::default());
    let results = runner
        .run(ws.root(), move |repo| {
            let op = Arc::clone(&op);
            async move { op.execute(&repo, &BulkCommand::Status).await }
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.outcome == Outcome::Skipped));
    assert!(results.iter().all(|r| r.message == "cancelled before start"));
}

#[tokio::test]
async fn test_runner_rejects_invalid_options_before_touching_repositories() {
    let ws = TestWorkspace::new();
    ws.add_repo("a");
    let runner = BulkRunner::new(BulkOperationOptions {
        parallelism: 0,
        ..Default::default()
    });

    let err = runner
        .run(ws.root(), |_repo| async { Ok("touched".to_string()) })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidOptions);
}
