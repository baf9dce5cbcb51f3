//! Command lines for launching participants
//!
//! With a job launcher configured, one invocation becomes one launcher
//! command in MPMD form:
//!
//! ```text
//! orterun [args] -H node2 -np 1 -x D_LOG_MASK ... tests/threaded_server : -np 1 -x ... tests/threaded_client
//! ```
//!
//! Without one, every role is executed directly as its own child process,
//! which only works on the local host.

use harness_core::{HarnessError, Invocation, Result, RoleTargets, RunConfig, RunnerConfig};
use std::path::PathBuf;

/// Host names that direct mode accepts as "this machine"
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// One process to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PlannedCommand {
    /// Render as a shell-like line for logging
    pub fn display(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How an invocation is turned into processes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPlan {
    /// A single job-launcher process starting every role
    Runner(PlannedCommand),
    /// One child per role, in launch order
    Direct(Vec<PlannedCommand>),
}

impl CommandPlan {
    /// Number of OS processes the harness will spawn
    pub fn process_count(&self) -> usize {
        match self {
            CommandPlan::Runner(_) => 1,
            CommandPlan::Direct(commands) => commands.len(),
        }
    }

    pub fn commands(&self) -> Vec<&PlannedCommand> {
        match self {
            CommandPlan::Runner(command) => vec![command],
            CommandPlan::Direct(commands) => commands.iter().collect(),
        }
    }
}

/// Build the command plan for an invocation
pub fn plan(
    invocation: Invocation,
    targets: &RoleTargets,
    runner: Option<&RunnerConfig>,
    config: &RunConfig,
    host: Option<&str>,
) -> Result<CommandPlan> {
    match runner {
        Some(runner) => Ok(CommandPlan::Runner(runner_command(
            invocation, targets, runner, config, host,
        ))),
        None => {
            if let Some(host) = host.filter(|h| !LOCAL_HOSTS.contains(h)) {
                return Err(HarnessError::LaunchFailed {
                    role: invocation.primary_role(),
                    reason: format!("host {} requires a job launcher, none configured", host),
                });
            }
            Ok(CommandPlan::Direct(
                invocation
                    .roles()
                    .iter()
                    .map(|role| {
                        let target = targets.for_role(*role);
                        PlannedCommand {
                            program: target.program.clone(),
                            args: target.args.clone(),
                        }
                    })
                    .collect(),
            ))
        }
    }
}

fn runner_command(
    invocation: Invocation,
    targets: &RoleTargets,
    runner: &RunnerConfig,
    config: &RunConfig,
    host: Option<&str>,
) -> PlannedCommand {
    let mut args = runner.args.clone();

    if let Some(host) = host {
        args.push(runner.host_flag.clone());
        args.push(host.to_string());
    }

    for (i, role) in invocation.roles().iter().enumerate() {
        if i > 0 {
            args.push(runner.separator.clone());
        }
        args.push(runner.np_flag.clone());
        args.push("1".to_string());
        for (key, _) in config.env_pairs() {
            args.push(runner.env_flag.clone());
            args.push(key.to_string());
        }

        let target = targets.for_role(*role);
        args.push(target.program.display().to_string());
        args.extend(target.args.iter().cloned());
    }

    PlannedCommand {
        program: runner.program.clone(),
        args,
    }
}
