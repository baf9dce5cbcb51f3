//! Run configuration resolved from the environment
//!
//! [`RunConfig::resolve`] reads the transport overrides, asks the port
//! allocator for a port, and produces the configuration every launch in a
//! test consumes. Reading goes through [`EnvSource`] so the resolver never
//! touches process state itself; projecting the result into a child's
//! environment happens at the launch boundary.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::{HarnessError, Result};
use crate::port::PortAllocator;

/// Log verbosity mask for the launched participants
pub const LOG_MASK_VAR: &str = "D_LOG_MASK";
/// Transport address family
pub const PHY_ADDR_VAR: &str = "CRT_PHY_ADDR_STR";
/// Network interface the transport binds to
pub const INTERFACE_VAR: &str = "OFI_INTERFACE";
/// Port the transport listens on (produced, never read)
pub const PORT_VAR: &str = "OFI_PORT";
/// Whether contexts share one address
pub const CTX_SHARE_VAR: &str = "CRT_CTX_SHARE_ADDR";
/// Number of transport contexts
pub const CTX_NUM_VAR: &str = "CRT_CTX_NUM";
/// Set when the test runner provides more than one node
pub const MULTI_NODE_VAR: &str = "TR_USE_URI";

pub const DEFAULT_LOG_MASK: &str = "INFO";
pub const DEFAULT_PHY_ADDR: &str = "ofi+sockets";
pub const DEFAULT_INTERFACE: &str = "eth0";
pub const DEFAULT_CTX_SHARE: &str = "0";
pub const DEFAULT_CTX_NUM: &str = "0";

/// Variables injected into every launched participant
pub const PROJECTED_VARS: [&str; 6] = [
    LOG_MASK_VAR,
    PHY_ADDR_VAR,
    INTERFACE_VAR,
    PORT_VAR,
    CTX_SHARE_VAR,
    CTX_NUM_VAR,
];

/// Read-only view of environment variables
pub trait EnvSource {
    /// Value of `key`, or `None` when unset
    fn var(&self, key: &str) -> Option<String>;

    /// Value of `key`, treating an empty value as unset
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|v| !v.is_empty())
    }
}

/// The harness process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<K, V> EnvSource for HashMap<K, V>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
{
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.as_ref().to_string())
    }
}

/// Configuration consumed by every launch in one test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub log_mask: String,
    pub transport_address_family: String,
    pub network_interface: String,
    pub port: u16,
    /// `CRT_CTX_SHARE_ADDR`, which must be `0` or `1`
    pub context_share_flag: bool,
    pub context_count: u32,
}

impl RunConfig {
    /// Resolve from the harness process environment
    pub fn resolve(allocator: &PortAllocator) -> Result<Self> {
        Self::resolve_from(&ProcessEnv, allocator)
    }

    /// Resolve from an explicit environment source
    pub fn resolve_from(env: &impl EnvSource, allocator: &PortAllocator) -> Result<Self> {
        let log_mask = env
            .non_empty(LOG_MASK_VAR)
            .unwrap_or_else(|| DEFAULT_LOG_MASK.to_string());
        let transport_address_family = env
            .non_empty(PHY_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_PHY_ADDR.to_string());
        let network_interface = env
            .non_empty(INTERFACE_VAR)
            .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());
        let context_share_flag = parse_flag(
            CTX_SHARE_VAR,
            &env.non_empty(CTX_SHARE_VAR)
                .unwrap_or_else(|| DEFAULT_CTX_SHARE.to_string()),
        )?;
        let context_count = parse_count(
            CTX_NUM_VAR,
            &env.non_empty(CTX_NUM_VAR)
                .unwrap_or_else(|| DEFAULT_CTX_NUM.to_string()),
        )?;

        let port = allocator.allocate(&network_interface)?;

        Ok(Self {
            log_mask,
            transport_address_family,
            network_interface,
            port,
            context_share_flag,
            context_count,
        })
    }

    /// All six variables as they are injected into a participant
    pub fn env_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (LOG_MASK_VAR, self.log_mask.clone()),
            (PHY_ADDR_VAR, self.transport_address_family.clone()),
            (INTERFACE_VAR, self.network_interface.clone()),
            (PORT_VAR, self.port.to_string()),
            (
                CTX_SHARE_VAR,
                if self.context_share_flag { "1" } else { "0" }.to_string(),
            ),
            (CTX_NUM_VAR, self.context_count.to_string()),
        ]
    }
}

/// Whether the test runner enabled multi-node scenarios
pub fn multi_node_enabled(env: &impl EnvSource) -> bool {
    env.non_empty(MULTI_NODE_VAR).is_some()
}

/// Only `0` and `1` are accepted, so the projected value always equals the override
fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(HarnessError::InvalidConfig(format!(
            "{} must be 0 or 1, got {:?}",
            key, value
        ))),
    }
}

fn parse_count(key: &str, value: &str) -> Result<u32> {
    value.trim().parse::<u32>().map_err(|_| {
        HarnessError::InvalidConfig(format!("{} must be a non-negative integer, got {:?}", key, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> PortAllocator {
        PortAllocator::with_probe(31000, 31099, |_| true)
    }

    #[test]
    fn test_defaults_when_unset() {
        let env: HashMap<&str, &str> = HashMap::new();
        let config = RunConfig::resolve_from(&env, &allocator()).unwrap();

        assert_eq!(config.log_mask, "INFO");
        assert_eq!(config.transport_address_family, "ofi+sockets");
        assert_eq!(config.network_interface, "eth0");
        assert!(!config.context_share_flag);
        assert_eq!(config.context_count, 0);
        assert!((31000..=31099).contains(&config.port));
    }

    #[test]
    fn test_overrides_are_applied() {
        let env: HashMap<&str, &str> = [
            (LOG_MASK_VAR, "DEBUG"),
            (PHY_ADDR_VAR, "ofi+tcp;ofi_rxm"),
            (INTERFACE_VAR, "ib0"),
            (CTX_SHARE_VAR, "1"),
            (CTX_NUM_VAR, "8"),
        ]
        .into_iter()
        .collect();
        let config = RunConfig::resolve_from(&env, &allocator()).unwrap();

        assert_eq!(config.log_mask, "DEBUG");
        assert_eq!(config.transport_address_family, "ofi+tcp;ofi_rxm");
        assert_eq!(config.network_interface, "ib0");
        assert!(config.context_share_flag);
        assert_eq!(config.context_count, 8);
    }

    #[test]
    fn test_empty_value_falls_back_to_default() {
        let env: HashMap<&str, &str> = [(LOG_MASK_VAR, "")].into_iter().collect();
        let config = RunConfig::resolve_from(&env, &allocator()).unwrap();
        assert_eq!(config.log_mask, "INFO");
    }

    #[test]
    fn test_non_numeric_context_count_is_rejected() {
        let env: HashMap<&str, &str> = [(CTX_NUM_VAR, "many")].into_iter().collect();
        let err = RunConfig::resolve_from(&env, &allocator()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_share_flag_accepts_only_zero_or_one() {
        for value in ["2", "yes", "-1"] {
            let env: HashMap<&str, &str> = [(CTX_SHARE_VAR, value)].into_iter().collect();
            let err = RunConfig::resolve_from(&env, &allocator()).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_CONFIG", "accepted {:?}", value);
        }

        let env: HashMap<&str, &str> = [(CTX_SHARE_VAR, "1")].into_iter().collect();
        let config = RunConfig::resolve_from(&env, &allocator()).unwrap();
        let pairs: HashMap<&str, String> = config.env_pairs().into_iter().collect();
        assert_eq!(pairs[CTX_SHARE_VAR], "1");
    }

    #[test]
    fn test_env_pairs_complete() {
        let env: HashMap<&str, &str> = HashMap::new();
        let config = RunConfig::resolve_from(&env, &allocator()).unwrap();
        let pairs: HashMap<&str, String> = config.env_pairs().into_iter().collect();

        for key in PROJECTED_VARS {
            assert!(pairs.contains_key(key), "missing {}", key);
        }
        assert_eq!(pairs[PORT_VAR], config.port.to_string());
        assert_eq!(pairs[CTX_SHARE_VAR], "0");
        assert_eq!(pairs[CTX_NUM_VAR], "0");
    }

    #[test]
    fn test_multi_node_flag() {
        let unset: HashMap<&str, &str> = HashMap::new();
        assert!(!multi_node_enabled(&unset));

        let empty: HashMap<&str, &str> = [(MULTI_NODE_VAR, "")].into_iter().collect();
        assert!(!multi_node_enabled(&empty));

        let set: HashMap<&str, &str> = [(MULTI_NODE_VAR, "yes")].into_iter().collect();
        assert!(multi_node_enabled(&set));
    }
}
