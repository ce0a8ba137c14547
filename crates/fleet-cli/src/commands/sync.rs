//! Sync command implementation

use std::path::{Path, PathBuf};

use colored::Colorize;
use fleet_core::forge::{GitHubProvider, GitLabProvider, GiteaProvider};
use fleet_core::{
    CloneProtocol, ForgeProvider, RepoFilter, SyncActionKind, SyncExecutor, SyncManifest,
    SyncManifestEntry, SyncOutcome, SyncStrategy, listing_depth, listing_to_entries, plan,
};
use fleet_git::Git;
use serde_json::json;

use crate::cli::{ForgeKind, SourceArgs, StrategyArg};
use crate::context::{Context, resolve_root};
use crate::error::{CliError, Result};

impl From<StrategyArg> for SyncStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Reset => Self::Reset,
            StrategyArg::Pull => Self::Pull,
            StrategyArg::FetchOnly => Self::FetchOnly,
        }
    }
}

/// Everything `fleet sync` was asked to do.
#[derive(Debug)]
pub struct SyncRequest {
    pub root: PathBuf,
    pub source: SourceArgs,
    pub strategy: Option<SyncStrategy>,
    pub max_retries: Option<u32>,
    pub dry_run: bool,
    pub export: Option<PathBuf>,
}

pub async fn run_sync(ctx: &Context, request: SyncRequest) -> Result<()> {
    let entries = load_entries(ctx, &request.source).await?;

    if let Some(path) = &request.export {
        SyncManifest::new(entries.clone()).save(path)?;
        if !ctx.json {
            println!(
                "{} {} entries to {}",
                "Wrote".green(),
                entries.len(),
                path.display()
            );
        }
        return Ok(());
    }

    let root = prepare_root(&request.root, request.dry_run)?;
    let mut scan_ctx = ctx.clone();
    scan_ctx.config.scan_depth = ctx.config.scan_depth.max(listing_depth(&entries));
    let local = match &root {
        Some(root) => scan_ctx.scan(root)?,
        None => Vec::new(),
    };
    let root = root.unwrap_or_else(|| request.root.clone());
    let actions = plan(&entries, &local, &root)?;

    let strategy = request.strategy.unwrap_or(ctx.config.strategy);
    let max_retries = request.max_retries.unwrap_or(ctx.config.max_retries);
    let outcomes = SyncExecutor::new(Git::default(), &root, ctx.config.sync_settings())
        .with_cancel(ctx.cancel.clone())
        .apply(&actions, strategy, request.dry_run, max_retries)
        .await;

    render(ctx, &outcomes, request.dry_run)?;
    let failed = outcomes.iter().filter(|o| !o.succeeded).count();
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::Failed {
            failed,
            total: outcomes.len(),
        })
    }
}

/// The fleet root, created unless this is a dry run. `None` means it does
/// not exist and nothing may be created.
fn prepare_root(root: &Path, dry_run: bool) -> Result<Option<PathBuf>> {
    if !root.exists() {
        if dry_run {
            return Ok(None);
        }
        std::fs::create_dir_all(root)?;
    }
    resolve_root(root).map(Some)
}

async fn load_entries(ctx: &Context, source: &SourceArgs) -> Result<Vec<SyncManifestEntry>> {
    if let Some(path) = &source.manifest {
        return Ok(SyncManifest::load(path)?.repositories);
    }

    let (Some(forge), Some(org)) = (source.forge, source.org.as_deref()) else {
        return Err(CliError::user(
            "a listing is required: pass --manifest <file> or --forge <kind> --org <name>",
        ));
    };

    let provider: Box<dyn ForgeProvider> = match forge {
        ForgeKind::Github => {
            let provider = GitHubProvider::from_env()?;
            match &source.forge_url {
                Some(url) => Box::new(provider.with_api_url(url)),
                None => Box::new(provider),
            }
        }
        ForgeKind::Gitlab => {
            let provider = GitLabProvider::from_env()?;
            match &source.forge_url {
                Some(url) => Box::new(provider.with_api_url(url)),
                None => Box::new(provider),
            }
        }
        ForgeKind::Gitea => {
            let url = source
                .forge_url
                .as_deref()
                .ok_or_else(|| CliError::user("--forge-url is required for gitea"))?;
            Box::new(GiteaProvider::from_env(url)?)
        }
    };

    let filter = RepoFilter::new(
        source.include_archived,
        source.include_forks,
        source.name_pattern.as_deref(),
    )?;
    tracing::info!(forge = provider.name(), org, "Listing forge repositories");
    let listing = provider.list_organization_repositories(org, &filter).await?;

    let protocol = if source.ssh {
        CloneProtocol::Ssh
    } else {
        ctx.config.clone_protocol
    };
    Ok(listing_to_entries(org, &listing, protocol))
}

fn render(ctx: &Context, outcomes: &[SyncOutcome], dry_run: bool) -> Result<()> {
    if ctx.json {
        let value = json!({ "dry_run": dry_run, "outcomes": outcomes });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if outcomes.is_empty() {
        println!("{}", "Nothing to sync".dimmed());
        return Ok(());
    }

    let width = outcomes.iter().map(|o| o.local_path.len()).max().unwrap_or(0);
    for outcome in outcomes {
        let label = format!("{:<10}", outcome.action_applied.to_string());
        let label = match (outcome.succeeded, outcome.action_applied) {
            (false, _) => label.red(),
            (true, SyncActionKind::Orphan) => label.yellow(),
            (true, SyncActionKind::UpToDate) => label.dimmed(),
            (true, _) => label.green(),
        };
        let path = format!("{:<width$}", outcome.local_path);
        let retries = if outcome.retry_count > 0 {
            format!(" (after {} retries)", outcome.retry_count)
        } else {
            String::new()
        };
        println!("  {label} {}  {}{retries}", path.cyan(), outcome.message);
    }

    let failed = outcomes.iter().filter(|o| !o.succeeded).count();
    println!();
    let summary = format!(
        "{} actions: {} succeeded, {} failed",
        outcomes.len(),
        outcomes.len() - failed,
        failed
    );
    println!("{}", summary.bold());
    if dry_run {
        println!("{}", "Dry run: nothing was changed".dimmed());
    }
    Ok(())
}
