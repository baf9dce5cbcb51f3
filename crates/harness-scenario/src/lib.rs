//! Harness Scenario - Single-node and two-node threaded tests
//!
//! - [`controller`] - The two scenario recipes and verdict aggregation
//! - [`run`] - Per-test setup and teardown
//!
//! # Example
//!
//! ```rust,no_run
//! use harness_core::{PortAllocator, ProcessEnv, TestInfo};
//! use harness_process::ProcessLauncher;
//! use harness_scenario::{ScenarioController, ScenarioKind, ScenarioSettings, Topology};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let info = TestInfo::discover(None, &ProcessEnv)?;
//!     let controller = ScenarioController::new(
//!         ProcessLauncher::from_test_info(&info),
//!         Topology::from_test_info(&info, &ProcessEnv),
//!         ScenarioSettings::from_test_info(&info),
//!     );
//!
//!     let allocator = PortAllocator::new();
//!     for kind in ScenarioKind::ALL {
//!         let report = controller.run_with_setup(kind, &ProcessEnv, &allocator).await?;
//!         println!("{}: {}", report.kind, report.verdict);
//!     }
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod run;

pub use controller::{
    aggregate, ScenarioController, ScenarioKind, ScenarioReport, ScenarioSettings, Topology,
    SKIP_CLIENTS_CONFIGURED, SKIP_NO_CLIENTS, SKIP_NO_SERVERS, SKIP_SINGLE_NODE_ONLY,
};
pub use run::TestRun;
