//! Threaded Harness - runs the threaded client/server scenarios
//!
//! Loads the test information file, runs the requested scenarios against the
//! configured client and server binaries, prints one verdict per scenario and
//! exits non-zero if any scenario failed.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use harness_core::{PortAllocator, ProcessEnv, TestInfo};
use harness_process::ProcessLauncher;
use harness_scenario::{ScenarioController, ScenarioKind, ScenarioReport, ScenarioSettings, Topology};

#[derive(Parser)]
#[command(name = "threaded-harness")]
#[command(about = "Run threaded client/server tests on one or two nodes")]
#[command(version = harness_core::VERSION)]
struct Args {
    /// Scenario(s) to run
    #[arg(value_enum)]
    scenario: Selection,

    /// Test information file (defaults to $THREADED_HARNESS_CONFIG)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Print reports as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Selection {
    OneNode,
    TwoNode,
    All,
}

impl Selection {
    fn kinds(self) -> Vec<ScenarioKind> {
        match self {
            Selection::OneNode => vec![ScenarioKind::SingleNode],
            Selection::TwoNode => vec![ScenarioKind::TwoNode],
            Selection::All => ScenarioKind::ALL.to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let info = TestInfo::discover(args.config.as_deref(), &ProcessEnv)
        .context("loading test information")?;
    info!(
        clients = ?info.client_hosts,
        servers = ?info.server_hosts,
        runner = ?info.runner.as_ref().map(|r| r.program.display().to_string()),
        "Test information loaded"
    );

    let controller = ScenarioController::new(
        ProcessLauncher::from_test_info(&info),
        Topology::from_test_info(&info, &ProcessEnv),
        ScenarioSettings::from_test_info(&info),
    );
    let allocator = PortAllocator::new();

    let mut reports = Vec::new();
    for kind in args.scenario.kinds() {
        let report = controller
            .run_with_setup(kind, &ProcessEnv, &allocator)
            .await
            .with_context(|| format!("setting up {}", kind))?;
        print_report(&report, args.json)?;
        reports.push(report);
    }

    let failed = reports.iter().filter(|r| r.verdict.is_fail()).count();
    if failed > 0 {
        error!(failed, total = reports.len(), "Scenario(s) failed");
        std::process::exit(1);
    }

    info!(total = reports.len(), "All scenarios passed or skipped");
    Ok(())
}

fn print_report(report: &ScenarioReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
    } else {
        println!(
            "{:<26} {} ({} ms)",
            report.kind.name(),
            report.verdict,
            report.duration_ms
        );
    }
    Ok(())
}
