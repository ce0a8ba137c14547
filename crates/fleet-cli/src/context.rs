//! Per-invocation context
//!
//! Loads the configuration file, applies command-line overrides on top of
//! it, and owns the cancellation signal shared by every command.

use std::path::{Path, PathBuf};

use fleet_core::{BulkOperationOptions, CancelSignal, FleetConfig, RepositoryHandle, scan};

use crate::cli::ScanArgs;
use crate::error::{CliError, Result};

#[derive(Debug, Clone)]
pub struct Context {
    pub config: FleetConfig,
    pub json: bool,
    pub cancel: CancelSignal,
}

impl Context {
    pub fn new(config_path: Option<&Path>, json: bool) -> Result<Self> {
        let config = match config_path {
            Some(path) => FleetConfig::load(path)?,
            None => FleetConfig::load_default()?,
        };
        Ok(Self {
            config,
            json,
            cancel: CancelSignal::new(),
        })
    }

    /// Fold scan flags into the loaded configuration.
    pub fn apply_scan_args(&mut self, args: &ScanArgs) {
        if let Some(depth) = args.depth {
            self.config.scan_depth = depth;
        }
        if let Some(parallelism) = args.parallelism {
            self.config.parallelism = parallelism;
        }
        if !args.include.is_empty() {
            self.config.include = args.include.clone();
        }
        if !args.exclude.is_empty() {
            self.config.exclude = args.exclude.clone();
        }
        if args.recursive_submodules {
            self.config.recursive_submodules = true;
        }
    }

    pub fn bulk_options(&self, dry_run: bool) -> BulkOperationOptions {
        self.config.bulk_options(dry_run)
    }

    /// Validate options and scan `root`.
    pub fn scan(&self, root: &Path) -> Result<Vec<RepositoryHandle>> {
        let options = self.bulk_options(false).validate()?;
        Ok(scan(root, &options)?)
    }
}

/// Resolve the fleet root against the working directory.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };
    if !root.is_dir() {
        return Err(CliError::user(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(root)
}
