//! Harness Core - Foundational types for the threaded client/server harness
//!
//! This crate holds everything the orchestration layers agree on before any
//! process is started.
//!
//! # Modules
//!
//! - [`env`] - Run configuration resolved from environment overrides
//! - [`port`] - Collision-avoided port allocation
//! - [`role`] - Participant roles and their executables
//! - [`hosts`] - Host list snapshots with explicit claiming
//! - [`config`] - Test information file (host lists, targets, runner)
//! - [`verdict`] - Pass/fail/skip classification
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```rust
//! use harness_core::{PortAllocator, RunConfig};
//! use std::collections::HashMap;
//!
//! let allocator = PortAllocator::with_probe(20000, 20099, |_| true);
//! let env: HashMap<&str, &str> = HashMap::new();
//! let config = RunConfig::resolve_from(&env, &allocator).unwrap();
//! assert_eq!(config.log_mask, "INFO");
//! assert_eq!(config.env_pairs().len(), 6);
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod hosts;
pub mod port;
pub mod role;
pub mod verdict;

pub use config::{RunnerConfig, ScenarioConfig, TestInfo, CONFIG_PATH_VAR, DEFAULT_SETTLE_DELAY};
pub use env::{multi_node_enabled, EnvSource, ProcessEnv, RunConfig, PROJECTED_VARS};
pub use error::{HarnessError, Result};
pub use hosts::HostClaims;
pub use port::{PortAllocator, PortLease};
pub use role::{Invocation, NodeRole, RoleTarget, RoleTargets};
pub use verdict::{FailureCause, Verdict};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'), "VERSION should be semver format");
    }
}
