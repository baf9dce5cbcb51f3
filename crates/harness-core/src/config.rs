//! Test information loaded from the test configuration file
//!
//! The file is YAML and every section is optional:
//!
//! ```yaml
//! client_hosts: [node1]
//! server_hosts: [node2]
//! targets:
//!   client: { program: tests/threaded_client }
//!   server: { program: tests/threaded_server }
//! runner:
//!   program: orterun
//!   args: [--allow-run-as-root]
//! scenario:
//!   settle_delay: 1s
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::env::EnvSource;
use crate::error::{HarnessError, Result};
use crate::hosts::HostClaims;
use crate::role::RoleTargets;

/// Variable naming the test configuration file when no path is given
pub const CONFIG_PATH_VAR: &str = "THREADED_HARNESS_CONFIG";

/// Default wait between a background launch and its liveness check
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Everything the test configuration file provides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestInfo {
    /// Hosts the client may be launched on
    #[serde(default)]
    pub client_hosts: Vec<String>,

    /// Hosts the server may be launched on
    #[serde(default)]
    pub server_hosts: Vec<String>,

    /// Executables for each role
    #[serde(default)]
    pub targets: RoleTargets,

    /// Parallel job launcher used to start participants (None = exec directly)
    #[serde(default)]
    pub runner: Option<RunnerConfig>,

    /// Scenario timing
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl TestInfo {
    /// Load test info from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HarnessError::ConfigNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let info = Self::from_yaml(&text)?;
        info!(
            path = %path.display(),
            clients = info.client_hosts.len(),
            servers = info.server_hosts.len(),
            "Loaded test info"
        );
        Ok(info)
    }

    /// Parse test info from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load from `explicit`, else from the path in [`CONFIG_PATH_VAR`], else defaults
    pub fn discover(explicit: Option<&Path>, env: &impl EnvSource) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.non_empty(CONFIG_PATH_VAR).map(PathBuf::from));

        match path {
            Some(path) => Self::load(path),
            None => {
                debug!("No test configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Snapshot of the client host list
    pub fn client_list(&self) -> HostClaims {
        HostClaims::new(self.client_hosts.iter().cloned())
    }

    /// Snapshot of the server host list
    pub fn server_list(&self) -> HostClaims {
        HostClaims::new(self.server_hosts.iter().cloned())
    }
}

/// Command-line shape of an MPI-style job launcher such as `orterun`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Launcher executable
    pub program: PathBuf,
    /// Arguments placed before everything else
    #[serde(default)]
    pub args: Vec<String>,
    /// Flag that targets a host
    #[serde(default = "default_host_flag")]
    pub host_flag: String,
    /// Flag that forwards an environment variable by name
    #[serde(default = "default_env_flag")]
    pub env_flag: String,
    /// Flag that sets the process count of an application context
    #[serde(default = "default_np_flag")]
    pub np_flag: String,
    /// Token separating application contexts
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_host_flag() -> String {
    "-H".to_string()
}

fn default_env_flag() -> String {
    "-x".to_string()
}

fn default_np_flag() -> String {
    "-np".to_string()
}

fn default_separator() -> String {
    ":".to_string()
}

impl RunnerConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            host_flag: default_host_flag(),
            env_flag: default_env_flag(),
            np_flag: default_np_flag(),
            separator: default_separator(),
        }
    }
}

/// Scenario timing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Wait between a background launch and its liveness check
    #[serde(with = "humantime_serde", default = "default_settle_delay")]
    pub settle_delay: Duration,
}

fn default_settle_delay() -> Duration {
    DEFAULT_SETTLE_DELAY
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

// Helper module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        s.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
