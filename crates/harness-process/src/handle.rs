//! Handles to participants running in the background

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harness_core::NodeRole;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::io;
use std::process::ExitStatus;
use tokio::process::Child;
use tracing::{debug, warn};
use uuid::Uuid;

/// OS-level operations on a launched participant
///
/// [`ChildProcess`] is the real implementation; tests substitute scripted
/// processes to drive scenarios without spawning anything.
#[async_trait]
pub trait ParticipantProcess: Send + std::fmt::Debug {
    /// Process id, if the process has not been reaped yet
    fn pid(&self) -> Option<u32>;

    /// Exit code if the process has exited, without blocking
    fn try_exit_code(&mut self) -> io::Result<Option<i32>>;

    /// Ask the process to shut down gracefully
    fn request_stop(&mut self) -> io::Result<()>;

    /// Wait for the process to exit
    async fn wait_exit_code(&mut self) -> io::Result<i32>;
}

/// A participant spawned with `tokio::process`
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
}

impl ChildProcess {
    pub fn new(child: Child) -> Self {
        Self { child }
    }
}

#[async_trait]
impl ParticipantProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        Ok(self.child.try_wait()?.map(exit_code))
    }

    fn request_stop(&mut self) -> io::Result<()> {
        let Some(pid) = self.child.id() else {
            // Already reaped
            return Ok(());
        };
        kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from)
    }

    async fn wait_exit_code(&mut self) -> io::Result<i32> {
        Ok(exit_code(self.child.wait().await?))
    }
}

/// Exit code of a finished process, `128 + signal` when killed by a signal
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

/// A participant launched in the background
///
/// The handle belongs to whoever launched the participant and must be
/// stopped (see [`crate::terminator::stop`]) or observed dead (see
/// [`crate::monitor::is_alive`]) before it is dropped. Dropping a handle
/// whose process may still be running logs a warning and sends the
/// graceful stop signal.
#[derive(Debug)]
pub struct ParticipantHandle {
    id: Uuid,
    role: NodeRole,
    host: Option<String>,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    process: Box<dyn ParticipantProcess>,
    exit_code: Option<i32>,
}

impl ParticipantHandle {
    pub fn new(role: NodeRole, host: Option<String>, process: Box<dyn ParticipantProcess>) -> Self {
        let pid = process.pid();
        Self {
            id: Uuid::new_v4(),
            role,
            host,
            pid,
            started_at: Utc::now(),
            process,
            exit_code: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Pid recorded at launch
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Exit code, once the participant has been reaped
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn is_reaped(&self) -> bool {
        self.exit_code.is_some()
    }

    pub(crate) fn record_exit(&mut self, code: i32) {
        if self.exit_code.is_none() {
            debug!(role = %self.role, pid = ?self.pid, code, "Participant exited");
            self.exit_code = Some(code);
        }
    }

    pub(crate) fn process_mut(&mut self) -> &mut dyn ParticipantProcess {
        self.process.as_mut()
    }
}

impl Drop for ParticipantHandle {
    fn drop(&mut self) {
        if self.exit_code.is_some() {
            return;
        }
        if let Ok(Some(_)) = self.process.try_exit_code() {
            return;
        }

        warn!(
            role = %self.role,
            pid = ?self.pid,
            "Participant handle dropped while running, sending stop signal"
        );
        if let Err(e) = self.process.request_stop() {
            warn!(role = %self.role, "Failed to signal participant: {}", e);
        }
    }
}
