//! Configuration structures for copy runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::limiter::RateLimit;
use crate::storage::StoreConfig;
use crate::{Error, Result};

/// Smallest accepted chunk size. Parts below S3's 5 MiB floor are rejected
/// by real backends, but a lower bound of 1 KiB keeps the knob testable
/// against local stores.
pub const MIN_CHUNK_SIZE: u64 = 1024;

fn default_transfers() -> usize {
    4
}
fn default_checkers() -> usize {
    8
}
fn default_chunk_size() -> u64 {
    16 * 1024 * 1024
}
fn default_upload_concurrency() -> usize {
    4
}
fn default_retries() -> u32 {
    3
}
fn default_low_level_retries() -> u32 {
    10
}
fn default_retry_sleep_ms() -> u64 {
    100
}
fn default_stats_interval_secs() -> u64 {
    30
}

/// Options for one copy run.
///
/// Unknown keys are rejected at parse time so typos surface at startup
/// rather than silently running with defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CopyOptions {
    /// Concurrent transfer workers
    #[serde(default = "default_transfers")]
    pub transfers: usize,

    /// Concurrent destination checkers
    #[serde(default = "default_checkers")]
    pub checkers: usize,

    /// Part size in bytes; objects at or above this size are copied as a
    /// multipart upload. Real S3-compatible backends require at least 5 MiB.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Concurrent part transfers within one object
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,

    /// Global cap on remote API calls; unset means unlimited
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,

    /// Whole-object retries after chunk-level retries are exhausted
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Per-call retries for transient errors
    #[serde(default = "default_low_level_retries")]
    pub low_level_retries: u32,

    /// Base backoff delay between per-call retries, in milliseconds
    #[serde(default = "default_retry_sleep_ms")]
    pub retry_sleep_ms: u64,

    /// Seconds between progress log lines
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,

    /// Also write log output to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            transfers: default_transfers(),
            checkers: default_checkers(),
            chunk_size: default_chunk_size(),
            upload_concurrency: default_upload_concurrency(),
            rate_limit: None,
            retries: default_retries(),
            low_level_retries: default_low_level_retries(),
            retry_sleep_ms: default_retry_sleep_ms(),
            stats_interval_secs: default_stats_interval_secs(),
            log_file: None,
        }
    }
}

impl CopyOptions {
    /// Validate option values before a run starts.
    pub fn validate(&self) -> Result<()> {
        if self.transfers == 0 {
            return Err(Error::Config("transfers must be at least 1".to_string()));
        }
        if self.checkers == 0 {
            return Err(Error::Config("checkers must be at least 1".to_string()));
        }
        if self.upload_concurrency == 0 {
            return Err(Error::Config(
                "upload_concurrency must be at least 1".to_string(),
            ));
        }
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(Error::Config(format!(
                "chunk_size must be at least {} bytes",
                MIN_CHUNK_SIZE
            )));
        }
        if let Some(limit) = &self.rate_limit {
            if limit.rps == 0 || limit.burst == 0 {
                return Err(Error::Config(
                    "rate_limit rps and burst must be at least 1".to_string(),
                ));
            }
        }
        if self.stats_interval_secs == 0 {
            return Err(Error::Config(
                "stats_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Named remote stores, usually loaded from a YAML file:
///
/// ```yaml
/// remotes:
///   src:
///     kind: s3
///     bucket: exports
///     region: me-central-1
///   dst:
///     kind: azure
///     account_name: archive
///     container_name: exports
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemotesConfig {
    #[serde(default)]
    pub remotes: HashMap<String, StoreConfig>,
}

impl RemotesConfig {
    /// Load remote definitions from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn get(&self, name: &str) -> Option<&StoreConfig> {
        self.remotes.get(name)
    }
}

/// A store plus the key prefix a run operates under.
#[derive(Debug, Clone)]
pub struct Location {
    pub store: StoreConfig,
    pub prefix: String,
}

/// Resolve a location argument.
///
/// Accepts `remote:prefix` (looked up in the remotes config) or a direct URL
/// such as `s3://bucket/prefix`. A remote-level prefix from the store
/// definition is prepended to the given prefix.
pub fn parse_location(input: &str, remotes: &RemotesConfig) -> Result<Location> {
    if input.contains("://") {
        let (store, prefix) = StoreConfig::from_url(input)?;
        return Ok(Location { store, prefix });
    }

    if let Some((name, rest)) = input.split_once(':') {
        let store = remotes.get(name).ok_or_else(|| {
            Error::Config(format!("Remote '{}' is not defined in the config", name))
        })?;
        let prefix = join_prefix(store.prefix(), rest);
        return Ok(Location {
            store: store.clone(),
            prefix,
        });
    }

    Err(Error::Config(format!(
        "Cannot parse location '{}': expected remote:prefix or a store URL",
        input
    )))
}

/// Join an optional remote-level prefix with a run prefix.
fn join_prefix(base: Option<&str>, rest: &str) -> String {
    let rest = rest.trim_matches('/');
    match base.map(|b| b.trim_matches('/')).filter(|b| !b.is_empty()) {
        Some(base) if rest.is_empty() => base.to_string(),
        Some(base) => format!("{}/{}", base, rest),
        None => rest.to_string(),
    }
}
