//! Scenario Controller - single-node and two-node recipes
//!
//! Single-node:
//!
//! ```text
//! Init -> CheckNoClients -> Launch -> Done
//! ```
//!
//! Two-node:
//!
//! ```text
//! Init -> CheckMultiNodeEnabled -> CheckClientList -> CheckServerList
//!      -> LaunchServer -> SettleCheck -> LaunchClient -> StopServer
//!      -> Aggregate -> Done
//! ```
//!
//! Every check that can skip a scenario runs before anything is launched.
//! Once the server is up it is stopped exactly once, whatever the client
//! did, and the client is only launched after the server passed its
//! settle check.

use chrono::{DateTime, Utc};
use harness_core::{
    multi_node_enabled, EnvSource, FailureCause, HarnessError, HostClaims, Invocation, NodeRole,
    PortAllocator, Result, RunConfig, TestInfo, Verdict, DEFAULT_SETTLE_DELAY,
};
use harness_process::{monitor, terminator, LaunchRequest, Launcher};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::run::TestRun;

pub const SKIP_CLIENTS_CONFIGURED: &str = "Client list is not empty.";
pub const SKIP_SINGLE_NODE_ONLY: &str = "requires two or more nodes.";
pub const SKIP_NO_CLIENTS: &str = "Client list is empty.";
pub const SKIP_NO_SERVERS: &str = "Server list is empty.";

/// Which recipe to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Client and server co-located, started by one invocation
    SingleNode,
    /// Server in the background on one host, client on another
    TwoNode,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 2] = [ScenarioKind::SingleNode, ScenarioKind::TwoNode];

    /// Test name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::SingleNode => "test_threaded_one_node",
            ScenarioKind::TwoNode => "test_threaded_two_nodes",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScenarioKind::SingleNode => "Simple threaded test one node",
            ScenarioKind::TwoNode => "Simple threaded test two nodes",
        }
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Hosts and node mode a scenario runs against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    pub clients: HostClaims,
    pub servers: HostClaims,
    /// Whether the test runner provides more than one node
    pub multi_node: bool,
}

impl Topology {
    pub fn new(clients: HostClaims, servers: HostClaims, multi_node: bool) -> Self {
        Self {
            clients,
            servers,
            multi_node,
        }
    }

    /// Topology from test info, with the multi-node flag read from `env`
    pub fn from_test_info(info: &TestInfo, env: &impl EnvSource) -> Self {
        Self {
            clients: info.client_list(),
            servers: info.server_list(),
            multi_node: multi_node_enabled(env),
        }
    }
}

/// Scenario timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioSettings {
    /// Wait between the background server launch and its liveness check
    pub settle_delay: Duration,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl ScenarioSettings {
    pub fn from_test_info(info: &TestInfo) -> Self {
        Self {
            settle_delay: info.scenario.settle_delay,
        }
    }
}

/// Outcome of one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub id: Uuid,
    pub kind: ScenarioKind,
    pub verdict: Verdict,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Runs scenarios through a [`Launcher`]
pub struct ScenarioController<L> {
    launcher: L,
    topology: Topology,
    settings: ScenarioSettings,
}

impl<L: Launcher> ScenarioController<L> {
    pub fn new(launcher: L, topology: Topology, settings: ScenarioSettings) -> Self {
        Self {
            launcher,
            topology,
            settings,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Topology checks for `kind`; `Some` means the scenario is skipped
    pub fn precheck(&self, kind: ScenarioKind) -> Option<Verdict> {
        let reason = match kind {
            ScenarioKind::SingleNode => {
                if !self.topology.clients.is_empty() {
                    Some(SKIP_CLIENTS_CONFIGURED)
                } else {
                    None
                }
            }
            ScenarioKind::TwoNode => {
                if !self.topology.multi_node {
                    Some(SKIP_SINGLE_NODE_ONLY)
                } else if self.topology.clients.is_empty() {
                    Some(SKIP_NO_CLIENTS)
                } else if self.topology.servers.is_empty() {
                    Some(SKIP_NO_SERVERS)
                } else {
                    None
                }
            }
        };

        reason.map(|reason| {
            info!(scenario = %kind, reason, "Skipping");
            Verdict::skipped(reason)
        })
    }

    /// Run a scenario with its own setup and teardown
    ///
    /// Topology checks run before setup, so a skipped scenario allocates
    /// nothing. Setup errors (bad overrides, no free port) are returned as
    /// errors rather than verdicts.
    pub async fn run_with_setup(
        &self,
        kind: ScenarioKind,
        env: &impl EnvSource,
        allocator: &PortAllocator,
    ) -> Result<ScenarioReport> {
        let started_at = Utc::now();
        let started = Instant::now();

        if let Some(skip) = self.precheck(kind) {
            return Ok(report(kind, skip, started_at, started));
        }

        let run = TestRun::setup(env, allocator)?;
        let verdict = self.dispatch(kind, run.config()).await;
        run.teardown();

        Ok(report(kind, verdict, started_at, started))
    }

    /// Run a scenario against an already resolved configuration
    pub async fn run(&self, kind: ScenarioKind, config: &RunConfig) -> ScenarioReport {
        let started_at = Utc::now();
        let started = Instant::now();
        let verdict = self.dispatch(kind, config).await;
        report(kind, verdict, started_at, started)
    }

    async fn dispatch(&self, kind: ScenarioKind, config: &RunConfig) -> Verdict {
        info!(scenario = %kind, "{}", kind.description());
        match kind {
            ScenarioKind::SingleNode => self.single_node(config).await,
            ScenarioKind::TwoNode => self.two_node(config).await,
        }
    }

    /// Client and server on this node, started together, judged on one code
    pub async fn single_node(&self, config: &RunConfig) -> Verdict {
        if let Some(skip) = self.precheck(ScenarioKind::SingleNode) {
            return skip;
        }

        let request = LaunchRequest::new(Invocation::Combined, config);
        match self.launcher.launch_blocking(request).await {
            Ok(0) => Verdict::Pass,
            Ok(code) => {
                error!(code, "Failed, return code {}", code);
                Verdict::fail(FailureCause::CombinedExit { exit_code: code })
            }
            Err(e) => {
                error!("Launch failed: {}", e);
                Verdict::fail(launch_failure(NodeRole::Client, e))
            }
        }
    }

    /// Server in the background on the first server host, client on the first
    /// client host
    pub async fn two_node(&self, config: &RunConfig) -> Verdict {
        if let Some(skip) = self.precheck(ScenarioKind::TwoNode) {
            return skip;
        }

        let mut servers = self.topology.servers.clone();
        let mut clients = self.topology.clients.clone();
        let Some(server_host) = servers.claim_next() else {
            return Verdict::skipped(SKIP_NO_SERVERS);
        };

        // LaunchServer
        let request =
            LaunchRequest::new(Invocation::Single(NodeRole::Server), config).on_host(&server_host);
        let mut server = match self.launcher.launch_background(request).await {
            Ok(handle) => handle,
            Err(e) => {
                error!(host = %server_host, "Server launch failed: {}", e);
                return Verdict::fail(launch_failure(NodeRole::Server, e));
            }
        };

        // SettleCheck
        tokio::time::sleep(self.settings.settle_delay).await;
        if !monitor::is_alive(&mut server) {
            let exit_code = match terminator::stop(&mut server).await {
                Ok(code) => Some(code),
                Err(e) => {
                    warn!("Could not reap server: {}", e);
                    None
                }
            };
            error!(host = %server_host, exit_code = ?exit_code, "Server did not launch");
            return Verdict::fail(FailureCause::EarlyExit {
                role: NodeRole::Server,
                exit_code,
            });
        }
        info!(host = %server_host, pid = ?server.pid(), "Server running");

        // LaunchClient: keep the result, judge it only after the server is stopped
        let client = match clients.claim_next() {
            Some(client_host) => {
                let request = LaunchRequest::new(Invocation::Single(NodeRole::Client), config)
                    .on_host(&client_host);
                self.launcher.launch_blocking(request).await
            }
            None => Err(HarnessError::LaunchFailed {
                role: NodeRole::Client,
                reason: SKIP_NO_CLIENTS.to_string(),
            }),
        };

        // StopServer
        let server_code = terminator::stop(&mut server).await;

        aggregate(client, server_code)
    }
}

/// Combine the client's outcome and the server's stop result into a verdict
///
/// A failed stop is logged and only becomes the verdict when nothing else
/// failed first.
pub fn aggregate(client: Result<i32>, server: Result<i32>) -> Verdict {
    if let Err(e) = &server {
        warn!("Server cleanup failed: {}", e);
    }

    match (client, server) {
        (Err(e), server) => {
            let server = server.ok();
            error!(server = ?server, "Client launch failed: {}", e);
            Verdict::fail(FailureCause::ClientLaunchFailure {
                reason: launch_reason(e),
                server,
            })
        }
        (Ok(client), Ok(server)) => {
            let verdict = Verdict::from_exit_codes(Some(client), Some(server));
            if verdict.is_fail() {
                error!(client, server, "Failed, return codes client {} server {}", client, server);
            }
            verdict
        }
        (Ok(client), Err(e)) => {
            if client != 0 {
                Verdict::fail(FailureCause::NonZeroExit {
                    client: Some(client),
                    server: None,
                })
            } else {
                Verdict::fail(FailureCause::CleanupFailure {
                    role: NodeRole::Server,
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn launch_failure(default_role: NodeRole, err: HarnessError) -> FailureCause {
    let role = err.role().unwrap_or(default_role);
    FailureCause::LaunchFailure {
        role,
        reason: launch_reason(err),
    }
}

fn launch_reason(err: HarnessError) -> String {
    match err {
        HarnessError::LaunchFailed { reason, .. } => reason,
        other => other.to_string(),
    }
}

fn report(
    kind: ScenarioKind,
    verdict: Verdict,
    started_at: DateTime<Utc>,
    started: Instant,
) -> ScenarioReport {
    let duration_ms = started.elapsed().as_millis() as u64;
    info!(scenario = %kind, verdict = %verdict, duration_ms, "Scenario finished");
    ScenarioReport {
        id: Uuid::new_v4(),
        kind,
        verdict,
        started_at,
        duration_ms,
    }
}
