//! Starting participants
//!
//! [`Launcher`] is the seam scenarios drive. [`ProcessLauncher`] implements
//! it with `tokio::process`; scenario tests plug in scripted launchers.

use async_trait::async_trait;
use futures::future::join_all;
use harness_core::{
    HarnessError, Invocation, Result, RoleTargets, RunConfig, RunnerConfig, TestInfo,
};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::command::{self, CommandPlan, PlannedCommand};
use crate::env_scope::EnvScope;
use crate::handle::{exit_code, ChildProcess, ParticipantHandle};

/// What to launch, with which configuration, where
#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub invocation: Invocation,
    pub config: &'a RunConfig,
    /// Claimed host to target, `None` for the local host
    pub host: Option<&'a str>,
}

impl<'a> LaunchRequest<'a> {
    pub fn new(invocation: Invocation, config: &'a RunConfig) -> Self {
        Self {
            invocation,
            config,
            host: None,
        }
    }

    pub fn on_host(mut self, host: &'a str) -> Self {
        self.host = Some(host);
        self
    }
}

/// Starts participants either to completion or in the background
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Start the participant(s) and wait for them to exit
    ///
    /// Returns the exit code. A failure to start is
    /// [`HarnessError::LaunchFailed`].
    async fn launch_blocking(&self, request: LaunchRequest<'_>) -> Result<i32>;

    /// Start a participant and return without waiting
    ///
    /// A failure to start is [`HarnessError::LaunchFailed`]; no handle
    /// exists in that case.
    async fn launch_background(&self, request: LaunchRequest<'_>) -> Result<ParticipantHandle>;
}

/// Launches participants as OS processes
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    targets: RoleTargets,
    runner: Option<RunnerConfig>,
    working_dir: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new(targets: RoleTargets) -> Self {
        Self {
            targets,
            runner: None,
            working_dir: None,
        }
    }

    /// Launcher configured from test info
    pub fn from_test_info(info: &TestInfo) -> Self {
        Self {
            targets: info.targets.clone(),
            runner: info.runner.clone(),
            working_dir: None,
        }
    }

    pub fn with_runner(mut self, runner: RunnerConfig) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn targets(&self) -> &RoleTargets {
        &self.targets
    }

    fn plan(&self, request: &LaunchRequest<'_>) -> Result<CommandPlan> {
        command::plan(
            request.invocation,
            &self.targets,
            self.runner.as_ref(),
            request.config,
            request.host,
        )
    }

    fn spawn(
        &self,
        planned: &PlannedCommand,
        request: &LaunchRequest<'_>,
        kill_on_drop: bool,
    ) -> Result<Child> {
        let mut cmd = Command::new(&planned.program);
        cmd.args(&planned.args)
            .envs(request.config.env_pairs())
            .stdin(Stdio::null())
            .kill_on_drop(kill_on_drop);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!(command = %planned.display(), "Spawning");
        cmd.spawn().map_err(|e| HarnessError::LaunchFailed {
            role: request.invocation.primary_role(),
            reason: format!("{}: {}", planned.program.display(), e),
        })
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch_blocking(&self, request: LaunchRequest<'_>) -> Result<i32> {
        let plan = self.plan(&request)?;
        info!(
            invocation = %request.invocation,
            host = ?request.host,
            port = request.config.port,
            "Launching and waiting"
        );

        let mut children = Vec::with_capacity(plan.process_count());
        {
            let _scope = EnvScope::enter(request.config.env_pairs()).await;
            for planned in plan.commands() {
                // Children already spawned are killed on drop if a later spawn fails
                children.push(self.spawn(planned, &request, true)?);
            }
        }

        let results = join_all(children.iter_mut().map(|child| child.wait())).await;
        let mut codes = Vec::with_capacity(results.len());
        for result in results {
            codes.push(exit_code(result?));
        }

        let code = codes.iter().copied().find(|c| *c != 0).unwrap_or(0);
        if code == 0 {
            info!(invocation = %request.invocation, "Participant(s) exited cleanly");
        } else {
            warn!(invocation = %request.invocation, codes = ?codes, "Participant(s) exited with failure");
        }
        Ok(code)
    }

    async fn launch_background(&self, request: LaunchRequest<'_>) -> Result<ParticipantHandle> {
        let role = match request.invocation {
            Invocation::Single(role) => role,
            Invocation::Combined => {
                return Err(HarnessError::LaunchFailed {
                    role: request.invocation.primary_role(),
                    reason: "background launch takes a single role".to_string(),
                })
            }
        };
        let plan = self.plan(&request)?;
        let planned = match plan.commands().as_slice() {
            [single] => (*single).clone(),
            commands => {
                return Err(HarnessError::LaunchFailed {
                    role,
                    reason: format!("expected one process for {}, planned {}", role, commands.len()),
                })
            }
        };

        let child = {
            let _scope = EnvScope::enter(request.config.env_pairs()).await;
            self.spawn(&planned, &request, false)?
        };

        let handle = ParticipantHandle::new(
            role,
            request.host.map(str::to_string),
            Box::new(ChildProcess::new(child)),
        );
        info!(
            role = %handle.role(),
            pid = ?handle.pid(),
            host = ?handle.host(),
            port = request.config.port,
            "Launched in background"
        );
        Ok(handle)
    }
}
