//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Fleet - run git operations across many repositories at once
#[derive(Parser, Debug)]
#[command(name = "fleet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to <config dir>/fleet/config.toml)
    #[arg(long, global = true, env = "FLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where to look for repositories and how many to work on at once.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanArgs {
    /// Fleet root directory
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Maximum directory depth below the root (0 examines only the root)
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Number of repositories processed concurrently
    #[arg(short = 'j', long)]
    pub parallelism: Option<usize>,

    /// Only include repositories whose relative path matches (regex)
    #[arg(long)]
    pub include: Vec<String>,

    /// Exclude repositories whose relative path matches (regex)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Also report submodules and linked worktrees
    #[arg(long)]
    pub recursive_submodules: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List repositories under the fleet root
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Show branch, cleanliness and divergence for every repository
    Status {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Fetch every repository from its remote
    Fetch {
        #[command(flatten)]
        scan: ScanArgs,

        /// Preview without fetching
        #[arg(long)]
        dry_run: bool,
    },

    /// Fast-forward every repository from its upstream
    Pull {
        #[command(flatten)]
        scan: ScanArgs,

        /// Preview without pulling
        #[arg(long)]
        dry_run: bool,

        /// Abort conflicted merges and rebases instead of skipping them
        #[arg(long)]
        auto_recover: bool,
    },

    /// Push the current branch of every repository
    Push {
        #[command(flatten)]
        scan: ScanArgs,

        /// Preview without pushing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check out a branch in every repository
    Switch {
        /// Branch to check out
        branch: String,

        #[command(flatten)]
        scan: ScanArgs,

        /// Create the branch
        #[arg(short = 'c', long)]
        create: bool,

        /// Preview without switching
        #[arg(long)]
        dry_run: bool,

        /// Abort conflicted merges and rebases instead of skipping them
        #[arg(long)]
        auto_recover: bool,
    },

    /// Abort interrupted merges, rebases and cherry-picks
    Recover {
        #[command(flatten)]
        scan: ScanArgs,

        /// Preview without aborting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Reconcile the fleet with a manifest or a forge organization
    ///
    /// Examples:
    ///   fleet sync --manifest fleet.toml ~/src
    ///   fleet sync --forge github --org acme --dry-run ~/src
    ///   fleet sync --forge gitlab --org acme --export fleet.toml
    Sync {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// How existing repositories are updated
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Retries for transient network failures
        #[arg(long)]
        max_retries: Option<u32>,

        /// Preview without cloning or updating
        #[arg(long)]
        dry_run: bool,

        /// Write the listing as a manifest to this path and stop
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Fetch, inspect and report divergence for every repository
    Health {
        #[command(flatten)]
        scan: ScanArgs,

        /// Use remote-tracking refs as they are; do not fetch
        #[arg(long)]
        skip_fetch: bool,

        /// Per-repository fetch timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Preview conflicts from merging SOURCE into TARGET without touching the tree
    Conflicts {
        /// Ref to merge
        source: String,

        /// Ref merged into
        target: String,

        /// Repository to inspect
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Exit with an error when any conflict is found
        #[arg(long)]
        strict: bool,
    },

    /// Re-run a bulk command periodically until interrupted
    Watch {
        #[command(flatten)]
        scan: ScanArgs,

        /// Command run on every tick
        #[arg(long, value_enum, default_value_t = WatchCommand::Status)]
        command: WatchCommand,

        /// Seconds between ticks
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
}

/// Where a sync listing comes from.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceArgs {
    /// Manifest file (TOML, JSON or YAML)
    #[arg(long, conflicts_with = "forge")]
    pub manifest: Option<PathBuf>,

    /// Forge to list repositories from
    #[arg(long, value_enum, requires = "org")]
    pub forge: Option<ForgeKind>,

    /// Organization, group or user on the forge
    #[arg(long)]
    pub org: Option<String>,

    /// API root for self-hosted forges (required for gitea)
    #[arg(long)]
    pub forge_url: Option<String>,

    /// Include archived repositories
    #[arg(long)]
    pub include_archived: bool,

    /// Include forks
    #[arg(long)]
    pub include_forks: bool,

    /// Only repositories whose name matches (regex)
    #[arg(long)]
    pub name_pattern: Option<String>,

    /// Clone with ssh urls instead of https
    #[arg(long)]
    pub ssh: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeKind {
    Github,
    Gitlab,
    Gitea,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Reset,
    Pull,
    FetchOnly,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    Status,
    Fetch,
    Pull,
    Health,
}
