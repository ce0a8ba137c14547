//! Health command implementation

use std::path::Path;

use colored::Colorize;
use fleet_core::{Divergence, HealthReport, diagnose};

use crate::context::{Context, resolve_root};
use crate::error::Result;

pub async fn run_health(ctx: &Context, root: &Path, skip_fetch: bool) -> Result<()> {
    let report = execute(ctx, root, skip_fetch).await?;
    render(ctx, &report)
}

pub async fn execute(ctx: &Context, root: &Path, skip_fetch: bool) -> Result<HealthReport> {
    let root = resolve_root(root)?;
    let repos = ctx.scan(&root)?;
    let options = ctx.config.health_options(skip_fetch);
    Ok(diagnose(repos, &options, &ctx.cancel).await)
}

pub fn render(ctx: &Context, report: &HealthReport) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.records.is_empty() {
        println!("{}", "No repositories found".dimmed());
        return Ok(());
    }

    let width = report
        .records
        .iter()
        .map(|r| r.repository.len())
        .max()
        .unwrap_or(0);
    for record in &report.records {
        let marker = if record.is_healthy() {
            "+".green()
        } else if record.fetch_status.is_failure() || record.divergence == Divergence::Conflict {
            "!".red()
        } else {
            "~".yellow()
        };
        let path = format!("{:<width$}", record.repository);
        let branch = record.branch.as_deref().unwrap_or("(detached)");
        let dirty = if record.working_tree_dirty { ", dirty" } else { "" };
        println!(
            "  {marker} {}  {} {}{dirty}  {}",
            path.cyan(),
            branch,
            format!("[{}]", record.divergence).dimmed(),
            record.recommendation
        );
    }

    let s = &report.summary;
    println!();
    println!(
        "{}",
        format!(
            "{} repositories: {} healthy, {} behind, {} ahead, {} diverged, {} conflicted, {} fetch failures",
            s.total, s.healthy, s.behind, s.ahead, s.diverged, s.conflicted, s.fetch_failures
        )
        .bold()
    );
    Ok(())
}
