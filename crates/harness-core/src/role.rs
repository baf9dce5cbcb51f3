//! Participant roles and the executables bound to them

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default invocation target for the client role
pub const DEFAULT_CLIENT_TARGET: &str = "tests/threaded_client";

/// Default invocation target for the server role
pub const DEFAULT_SERVER_TARGET: &str = "tests/threaded_server";

/// One of the two cooperating processes under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// The threaded client, drives RPCs and tells the server to shut down
    Client,
    /// The threaded server, serves RPCs until told to stop
    Server,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Client => "client",
            NodeRole::Server => "server",
        }
    }
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executable and fixed arguments a role is launched with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTarget {
    /// Path to the test executable
    pub program: PathBuf,
    /// Arguments always passed to the executable
    #[serde(default)]
    pub args: Vec<String>,
}

impl RoleTarget {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Invocation targets for both roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTargets {
    #[serde(default = "default_client")]
    pub client: RoleTarget,
    #[serde(default = "default_server")]
    pub server: RoleTarget,
}

fn default_client() -> RoleTarget {
    RoleTarget::new(DEFAULT_CLIENT_TARGET)
}

fn default_server() -> RoleTarget {
    RoleTarget::new(DEFAULT_SERVER_TARGET)
}

impl Default for RoleTargets {
    fn default() -> Self {
        Self {
            client: default_client(),
            server: default_server(),
        }
    }
}

impl RoleTargets {
    /// Get the target bound to a role
    pub fn for_role(&self, role: NodeRole) -> &RoleTarget {
        match role {
            NodeRole::Client => &self.client,
            NodeRole::Server => &self.server,
        }
    }
}

/// The set of roles started by a single launch call
///
/// A single-node run starts both roles in one invocation; a two-node run
/// starts each role separately on its own host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Just one role
    Single(NodeRole),
    /// Server and client together, server listed first
    Combined,
}

impl Invocation {
    /// Roles in launch order
    pub fn roles(&self) -> &'static [NodeRole] {
        match self {
            Invocation::Single(NodeRole::Client) => &[NodeRole::Client],
            Invocation::Single(NodeRole::Server) => &[NodeRole::Server],
            Invocation::Combined => &[NodeRole::Server, NodeRole::Client],
        }
    }

    /// Role errors are attributed to
    ///
    /// A combined invocation reports as the client since its exit status is
    /// what the run is judged on.
    pub fn primary_role(&self) -> NodeRole {
        match self {
            Invocation::Single(role) => *role,
            Invocation::Combined => NodeRole::Client,
        }
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invocation::Single(role) => write!(f, "{}", role),
            Invocation::Combined => write!(f, "client+server"),
        }
    }
}
