//! Bulk git commands: status, fetch, pull, push, switch, recover

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use fleet_core::{BulkCommand, BulkOperationResult, BulkRunner, BulkSummary, Operator, Outcome};
use fleet_git::Git;
use serde_json::json;

use crate::context::{Context, resolve_root};
use crate::error::{CliError, Result};

/// Run `command` across the fleet and print the results.
pub async fn run_bulk_command(
    ctx: &Context,
    root: &Path,
    command: BulkCommand,
    dry_run: bool,
    auto_recover: bool,
) -> Result<()> {
    let results = execute(ctx, root, command, dry_run, auto_recover).await?;
    let summary = BulkSummary::from_results(&results);
    render(ctx, &results, &summary)?;
    if summary.is_success() {
        Ok(())
    } else {
        Err(CliError::Failed {
            failed: summary.failed,
            total: summary.total,
        })
    }
}

/// Scan and run without printing.
pub async fn execute(
    ctx: &Context,
    root: &Path,
    command: BulkCommand,
    dry_run: bool,
    auto_recover: bool,
) -> Result<Vec<BulkOperationResult>> {
    let root = resolve_root(root)?;
    let mut policy = ctx.config.gate_policy();
    policy.auto_recover |= auto_recover;

    let operator = Arc::new(
        Operator::new(Git::default(), ctx.config.remote.clone(), ctx.config.fetch_timeout())
            .with_policy(policy)
            .with_dry_run(dry_run),
    );
    let runner = BulkRunner::new(ctx.bulk_options(dry_run)).with_cancel(ctx.cancel.clone());
    let results = runner
        .run(&root, move |repo| {
            let operator = Arc::clone(&operator);
            let command = command.clone();
            async move { operator.execute(&repo, &command).await }
        })
        .await?;
    Ok(results)
}

pub fn render(ctx: &Context, results: &[BulkOperationResult], summary: &BulkSummary) -> Result<()> {
    if ctx.json {
        let value = json!({ "results": results, "summary": summary });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{}", "No repositories found".dimmed());
        return Ok(());
    }

    let width = results
        .iter()
        .map(|r| r.repository.relative_path.len())
        .max()
        .unwrap_or(0);
    for result in results {
        let label = format!("{:<8}", result.outcome.to_string());
        let label = match result.outcome {
            Outcome::Succeeded => label.green(),
            Outcome::Skipped => label.yellow(),
            Outcome::Failed => label.red(),
        };
        let path = format!("{:<width$}", result.repository.relative_path);
        println!("  {label} {}  {}", path.cyan(), result.message);
    }
    println!();
    println!("{}", summary.to_string().bold());
    Ok(())
}
