//! Command implementations for fleet-cli

pub mod bulk;
pub mod conflicts;
pub mod health;
pub mod scan;
pub mod sync;
pub mod watch;

use fleet_core::BulkCommand;

use crate::cli::Commands;
use crate::context::Context;
use crate::error::Result;

/// Dispatch a parsed command.
pub async fn execute(mut ctx: Context, command: Commands) -> Result<()> {
    match command {
        Commands::Scan { scan } => {
            ctx.apply_scan_args(&scan);
            scan::run_scan(&ctx, &scan.root)
        }
        Commands::Status { scan } => {
            ctx.apply_scan_args(&scan);
            bulk::run_bulk_command(&ctx, &scan.root, BulkCommand::Status, false, false).await
        }
        Commands::Fetch { scan, dry_run } => {
            ctx.apply_scan_args(&scan);
            bulk::run_bulk_command(&ctx, &scan.root, BulkCommand::Fetch, dry_run, false).await
        }
        Commands::Pull {
            scan,
            dry_run,
            auto_recover,
        } => {
            ctx.apply_scan_args(&scan);
            bulk::run_bulk_command(&ctx, &scan.root, BulkCommand::Pull, dry_run, auto_recover).await
        }
        Commands::Push { scan, dry_run } => {
            ctx.apply_scan_args(&scan);
            bulk::run_bulk_command(&ctx, &scan.root, BulkCommand::Push, dry_run, false).await
        }
        Commands::Switch {
            branch,
            scan,
            create,
            dry_run,
            auto_recover,
        } => {
            ctx.apply_scan_args(&scan);
            let command = BulkCommand::Switch { branch, create };
            bulk::run_bulk_command(&ctx, &scan.root, command, dry_run, auto_recover).await
        }
        Commands::Recover { scan, dry_run } => {
            ctx.apply_scan_args(&scan);
            bulk::run_bulk_command(&ctx, &scan.root, BulkCommand::Recover, dry_run, false).await
        }
        Commands::Sync {
            scan,
            source,
            strategy,
            max_retries,
            dry_run,
            export,
        } => {
            ctx.apply_scan_args(&scan);
            let request = sync::SyncRequest {
                root: scan.root,
                source,
                strategy: strategy.map(Into::into),
                max_retries,
                dry_run,
                export,
            };
            sync::run_sync(&ctx, request).await
        }
        Commands::Health {
            scan,
            skip_fetch,
            timeout,
        } => {
            ctx.apply_scan_args(&scan);
            if let Some(secs) = timeout {
                ctx.config.fetch_timeout_secs = secs;
            }
            health::run_health(&ctx, &scan.root, skip_fetch).await
        }
        Commands::Conflicts {
            source,
            target,
            repo,
            strict,
        } => conflicts::run_conflicts(&ctx, &repo, &source, &target, strict).await,
        Commands::Watch {
            scan,
            command,
            interval,
            ticks,
        } => {
            ctx.apply_scan_args(&scan);
            if let Some(secs) = interval {
                ctx.config.watch_interval_secs = secs;
            }
            watch::run_watch(&ctx, &scan.root, command, ticks).await
        }
    }
}
