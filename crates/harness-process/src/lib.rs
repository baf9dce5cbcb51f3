//! Harness Process - OS-process plumbing for the threaded harness
//!
//! This crate starts participants, watches them and stops them:
//!
//! - [`launcher`] - Blocking and background launches behind the [`Launcher`] trait
//! - [`handle`] - [`ParticipantHandle`] for background participants
//! - [`monitor`] - Non-blocking liveness checks
//! - [`terminator`] - Graceful, idempotent stop
//! - [`command`] - Command lines, direct or through a job launcher
//! - [`env_scope`] - Scoped projection of the run configuration into the environment
//!
//! # Example
//!
//! ```rust,no_run
//! use harness_core::{Invocation, NodeRole, PortAllocator, RoleTargets, RunConfig};
//! use harness_process::{monitor, terminator, LaunchRequest, Launcher, ProcessLauncher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let allocator = PortAllocator::new();
//!     let config = RunConfig::resolve(&allocator)?;
//!     let launcher = ProcessLauncher::new(RoleTargets::default());
//!
//!     let mut server = launcher
//!         .launch_background(LaunchRequest::new(Invocation::Single(NodeRole::Server), &config))
//!         .await?;
//!     if monitor::is_alive(&mut server) {
//!         let client = launcher
//!             .launch_blocking(LaunchRequest::new(Invocation::Single(NodeRole::Client), &config))
//!             .await?;
//!         println!("client exited with {}", client);
//!     }
//!     let server_code = terminator::stop(&mut server).await?;
//!     println!("server exited with {}", server_code);
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod env_scope;
pub mod handle;
pub mod launcher;
pub mod monitor;
pub mod terminator;

pub use command::{CommandPlan, PlannedCommand};
pub use env_scope::EnvScope;
pub use handle::{ChildProcess, ParticipantHandle, ParticipantProcess};
pub use launcher::{LaunchRequest, Launcher, ProcessLauncher};
