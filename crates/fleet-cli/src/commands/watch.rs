//! Watch command implementation

use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use fleet_core::{BulkCommand, BulkSummary, Watcher};

use super::{bulk, health};
use crate::cli::WatchCommand;
use crate::context::{Context, resolve_root};
use crate::error::Result;

/// Re-run `command` every configured interval until Ctrl-C or `ticks`.
///
/// A failing tick is reported and the loop keeps going.
pub async fn run_watch(
    ctx: &Context,
    root: &Path,
    command: WatchCommand,
    ticks: Option<u64>,
) -> Result<()> {
    let root = resolve_root(root)?;
    let interval = Duration::from_secs(ctx.config.watch_interval_secs);
    let mut watcher = Watcher::new(interval, ctx.cancel.clone());
    if let Some(ticks) = ticks {
        watcher = watcher.with_max_ticks(ticks);
    }

    if !ctx.json {
        println!(
            "{} {} every {}s (Ctrl-C to stop)",
            "Watching".green().bold(),
            root.display(),
            interval.as_secs()
        );
    }

    watcher
        .run(|tick| {
            let ctx = ctx.clone();
            let root = root.clone();
            async move {
                if !ctx.json {
                    println!();
                    println!("{}", format!("tick {tick}").bold());
                }
                if let Err(e) = run_tick(&ctx, &root, command).await {
                    eprintln!("{}: {}", "error".red().bold(), e);
                }
            }
        })
        .await;
    Ok(())
}

async fn run_tick(ctx: &Context, root: &Path, command: WatchCommand) -> Result<()> {
    let command = match command {
        WatchCommand::Health => {
            let report = health::execute(ctx, root, false).await?;
            return health::render(ctx, &report);
        }
        WatchCommand::Status => BulkCommand::Status,
        WatchCommand::Fetch => BulkCommand::Fetch,
        WatchCommand::Pull => BulkCommand::Pull,
    };
    let results = bulk::execute(ctx, root, command, false, false).await?;
    bulk::render(ctx, &results, &BulkSummary::from_results(&results))
}
