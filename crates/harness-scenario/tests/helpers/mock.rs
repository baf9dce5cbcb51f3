//! Scripted launcher and process for driving scenarios without spawning

use async_trait::async_trait;
use harness_core::{HarnessError, Invocation, NodeRole, Result, RunConfig};
use harness_process::{LaunchRequest, Launcher, ParticipantHandle, ParticipantProcess};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// One call made on the launcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCall {
    pub invocation: Invocation,
    pub host: Option<String>,
    pub background: bool,
    pub port: u16,
    /// Configuration handed to the launch
    pub config: RunConfig,
    /// Whether the background server was alive when this call was made
    pub server_alive: bool,
}

/// How the background server behaves
#[derive(Debug, Clone)]
pub enum ServerScript {
    /// Runs until stopped, then exits with `exit_code`
    Runs { exit_code: i32 },
    /// Already dead by the settle check
    DiesEarly { exit_code: i32 },
    /// Runs, but the stop signal cannot be delivered
    IgnoresStop,
    /// Never starts
    FailsToLaunch(String),
}

/// State shared between the launcher and the server process it hands out
#[derive(Debug, Default)]
pub struct ServerState {
    pub alive: AtomicBool,
    pub stop_requests: AtomicUsize,
}

impl ServerState {
    pub fn stop_requests(&self) -> usize {
        self.stop_requests.load(Ordering::SeqCst)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ScriptedProcess {
    state: Arc<ServerState>,
    exit_code: i32,
    ignores_stop: bool,
}

#[async_trait]
impl ParticipantProcess for ScriptedProcess {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        if self.state.is_alive() {
            Ok(None)
        } else {
            Ok(Some(self.exit_code))
        }
    }

    fn request_stop(&mut self) -> io::Result<()> {
        self.state.stop_requests.fetch_add(1, Ordering::SeqCst);
        if self.ignores_stop {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "EPERM"));
        }
        self.state.alive.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_exit_code(&mut self) -> io::Result<i32> {
        Ok(self.exit_code)
    }
}

/// Launcher that returns scripted results and records every call
pub struct ScriptedLauncher {
    server: ServerScript,
    client: std::result::Result<i32, String>,
    combined: std::result::Result<i32, String>,
    state: Arc<ServerState>,
    calls: Mutex<Vec<LaunchCall>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self {
            server: ServerScript::Runs { exit_code: 0 },
            client: Ok(0),
            combined: Ok(0),
            state: Arc::new(ServerState::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_server(mut self, server: ServerScript) -> Self {
        self.server = server;
        self
    }

    pub fn with_client_exit(mut self, code: i32) -> Self {
        self.client = Ok(code);
        self
    }

    pub fn with_client_launch_error(mut self, reason: &str) -> Self {
        self.client = Err(reason.to_string());
        self
    }

    pub fn with_combined_exit(mut self, code: i32) -> Self {
        self.combined = Ok(code);
        self
    }

    pub fn with_combined_launch_error(mut self, reason: &str) -> Self {
        self.combined = Err(reason.to_string());
        self
    }

    pub fn server_state(&self) -> Arc<ServerState> {
        self.state.clone()
    }

    pub fn calls(&self) -> Vec<LaunchCall> {
        self.calls.lock().clone()
    }

    fn record(&self, request: &LaunchRequest<'_>, background: bool) {
        self.calls.lock().push(LaunchCall {
            invocation: request.invocation,
            host: request.host.map(str::to_string),
            background,
            port: request.config.port,
            config: request.config.clone(),
            server_alive: self.state.is_alive(),
        });
    }

    fn scripted(result: &std::result::Result<i32, String>, role: NodeRole) -> Result<i32> {
        result.clone().map_err(|reason| HarnessError::LaunchFailed { role, reason })
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    async fn launch_blocking(&self, request: LaunchRequest<'_>) -> Result<i32> {
        self.record(&request, false);
        match request.invocation {
            Invocation::Combined => Self::scripted(&self.combined, NodeRole::Client),
            Invocation::Single(NodeRole::Client) => Self::scripted(&self.client, NodeRole::Client),
            Invocation::Single(NodeRole::Server) => Ok(0),
        }
    }

    async fn launch_background(&self, request: LaunchRequest<'_>) -> Result<ParticipantHandle> {
        self.record(&request, true);
        let (alive, exit_code, ignores_stop) = match &self.server {
            ServerScript::Runs { exit_code } => (true, *exit_code, false),
            ServerScript::DiesEarly { exit_code } => (false, *exit_code, false),
            ServerScript::IgnoresStop => (true, 0, true),
            ServerScript::FailsToLaunch(reason) => {
                return Err(HarnessError::LaunchFailed {
                    role: NodeRole::Server,
                    reason: reason.clone(),
                })
            }
        };
        self.state.alive.store(alive, Ordering::SeqCst);

        let process = ScriptedProcess {
            state: self.state.clone(),
            exit_code,
            ignores_stop,
        };
        Ok(ParticipantHandle::new(
            NodeRole::Server,
            request.host.map(str::to_string),
            Box::new(process),
        ))
    }
}
