//! Fleet configuration and per-invocation options
//!
//! [`FleetConfig`] is the on-disk shape (TOML, JSON or YAML). It is read once
//! per invocation and converted into the option structs each component
//! takes; nothing here is global or mutable after construction.

use std::path::Path;
use std::time::Duration;

use fleet_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::forge::CloneProtocol;
use crate::gate::GatePolicy;
use crate::scanner::{ScanFilter, ScanOptions};
use crate::sync::SyncStrategy;
use crate::{Error, Result};

/// File name looked up under the user config directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Persistent fleet configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub scan_depth: usize,
    pub parallelism: usize,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub recursive_submodules: bool,
    pub remote: String,
    pub fetch_timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub strategy: SyncStrategy,
    pub auto_recover: bool,
    pub clone_protocol: CloneProtocol,
    pub watch_interval_secs: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            scan_depth: 1,
            parallelism: 4,
            include: Vec::new(),
            exclude: Vec::new(),
            recursive_submodules: false,
            remote: "origin".to_string(),
            fetch_timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            strategy: SyncStrategy::Pull,
            auto_recover: false,
            clone_protocol: CloneProtocol::Https,
            watch_interval_secs: 300,
        }
    }
}

impl FleetConfig {
    /// Load from an explicit file. The format follows the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let path = NormalizedPath::new(path);
        ConfigStore::new()
            .load(&path)
            .map_err(|e| Error::from(e).retag(crate::ErrorKind::InvalidOptions))
    }

    /// Load `<config dir>/fleet/config.toml` if present, defaults otherwise.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "Loading fleet config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fleet").join(CONFIG_FILE))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn gate_policy(&self) -> GatePolicy {
        GatePolicy {
            auto_recover: self.auto_recover,
        }
    }

    pub fn bulk_options(&self, dry_run: bool) -> BulkOperationOptions {
        BulkOperationOptions {
            scan_depth: self.scan_depth,
            parallelism: self.parallelism,
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            dry_run,
            recursive_submodules: self.recursive_submodules,
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            remote: self.remote.clone(),
            parallelism: self.parallelism,
            fetch_timeout: self.fetch_timeout(),
            base_delay: self.base_delay(),
            policy: self.gate_policy(),
        }
    }

    pub fn health_options(&self, skip_fetch: bool) -> HealthOptions {
        HealthOptions {
            skip_fetch,
            timeout: self.fetch_timeout(),
            retries: self.max_retries,
            base_delay: self.base_delay(),
            remote: self.remote.clone(),
            parallelism: self.parallelism,
        }
    }
}

/// Options for one bulk invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOperationOptions {
    pub scan_depth: usize,
    pub parallelism: usize,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub dry_run: bool,
    pub recursive_submodules: bool,
}

impl Default for BulkOperationOptions {
    fn default() -> Self {
        FleetConfig::default().bulk_options(false)
    }
}

impl BulkOperationOptions {
    /// Check the options and compile the filters.
    ///
    /// Fails before any repository is touched.
    pub fn validate(&self) -> Result<ScanOptions> {
        if self.parallelism == 0 {
            return Err(Error::invalid_options("parallelism must be at least 1"));
        }
        let filter = ScanFilter::new(&self.include, &self.exclude)?;
        Ok(ScanOptions {
            max_depth: self.scan_depth,
            filter,
            recursive_submodules: self.recursive_submodules,
        })
    }
}

/// Settings for a sync run that do not vary per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub remote: String,
    pub parallelism: usize,
    pub fetch_timeout: Duration,
    pub base_delay: Duration,
    pub policy: GatePolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        FleetConfig::default().sync_settings()
    }
}

/// Options for a health diagnosis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthOptions {
    pub skip_fetch: bool,
    /// Deadline for each repository's fetch.
    pub timeout: Duration,
    /// Retries for transient network failures.
    pub retries: u32,
    pub base_delay: Duration,
    pub remote: String,
    pub parallelism: usize,
}

impl Default for HealthOptions {
    fn default() -> Self {
        FleetConfig::default().health_options(false)
    }
}
