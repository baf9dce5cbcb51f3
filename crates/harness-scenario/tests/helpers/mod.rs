pub mod mock;

pub use mock::{LaunchCall, ScriptedLauncher, ServerScript};

use harness_core::{HostClaims, RunConfig};
use harness_scenario::{ScenarioController, ScenarioSettings, Topology};
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("harness_scenario=debug,harness_process=debug")
        .with_test_writer()
        .try_init();
}

pub fn test_config(port: u16) -> RunConfig {
    RunConfig {
        log_mask: "INFO".to_string(),
        transport_address_family: "ofi+sockets".to_string(),
        network_interface: "lo".to_string(),
        port,
        context_share_flag: false,
        context_count: 0,
    }
}

pub fn two_node_topology() -> Topology {
    Topology::new(HostClaims::new(["node1"]), HostClaims::new(["node2"]), true)
}

pub fn controller(
    launcher: ScriptedLauncher,
    topology: Topology,
) -> ScenarioController<ScriptedLauncher> {
    ScenarioController::new(
        launcher,
        topology,
        ScenarioSettings {
            settle_delay: Duration::from_secs(1),
        },
    )
}
