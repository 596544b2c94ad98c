//! Configuration for kv2pc components
//!
//! Values come from an optional `kv2pc.toml`, then `KV2PC__*` environment
//! variables, then command-line flags (highest priority, applied by the
//! binaries).

use crate::common::utils::node_url;
use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default config file looked up in the working directory
pub const CONFIG_FILE: &str = "kv2pc.toml";

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Coordinator-specific config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<CoordinatorConfig>,

    /// Worker-specific config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<WorkerConfig>,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Bind address for the client-facing API
    #[serde(default = "default_coord_bind")]
    pub bind_addr: SocketAddr,

    /// Worker addresses (`host:port`), resolved once at startup
    #[serde(default)]
    pub workers: Vec<String>,

    /// Concurrent outbound worker calls across all transactions
    #[serde(default = "default_dispatch_pool_size")]
    pub dispatch_pool_size: usize,

    /// Per worker call timeout. `None` waits forever.
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

fn default_coord_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}
fn default_dispatch_pool_size() -> usize {
    5
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_coord_bind(),
            workers: Vec::new(),
            dispatch_pool_size: default_dispatch_pool_size(),
            call_timeout_ms: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers.is_empty() {
            return Err(Error::InvalidConfig(
                "coordinator needs at least one worker address".into(),
            ));
        }
        if self.dispatch_pool_size == 0 {
            return Err(Error::InvalidConfig(
                "dispatch_pool_size must be at least 1".into(),
            ));
        }
        for addr in &self.workers {
            node_url(addr)?;
        }
        Ok(())
    }
}

/// Worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Bind address for the phase endpoints
    #[serde(default = "default_worker_bind")]
    pub bind_addr: SocketAddr,

    /// Concurrent commit tasks against the local store
    #[serde(default = "default_execution_pool_size")]
    pub execution_pool_size: usize,
}

fn default_worker_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 6000))
}
fn default_execution_pool_size() -> usize {
    10
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_worker_bind(),
            execution_pool_size: default_execution_pool_size(),
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.execution_pool_size == 0 {
            return Err(Error::InvalidConfig(
                "execution_pool_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load `kv2pc.toml` from the working directory plus the environment.
    /// A missing file gives defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load the given file (if present) layered under `KV2PC__*` variables
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("KV2PC")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("coordinator.workers")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
