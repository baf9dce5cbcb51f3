//! Graceful shutdown of background participants

use harness_core::{HarnessError, Result};
use tracing::{debug, info};

use crate::handle::ParticipantHandle;

/// Stop a background participant and return its exit code
///
/// Sends the graceful stop signal (SIGTERM, never SIGKILL) and waits for the
/// process to exit. Calling this on a participant that already exited, or
/// calling it twice, returns the recorded code without signalling again.
pub async fn stop(handle: &mut ParticipantHandle) -> Result<i32> {
    if let Some(code) = handle.exit_code() {
        debug!(role = %handle.role(), code, "Participant already stopped");
        return Ok(code);
    }

    let role = handle.role();
    let stop_failed = |e: std::io::Error| HarnessError::StopFailed {
        role,
        reason: e.to_string(),
    };

    if let Some(code) = handle.process_mut().try_exit_code().map_err(stop_failed)? {
        handle.record_exit(code);
        return Ok(code);
    }

    info!(role = %role, pid = ?handle.pid(), host = ?handle.host(), "Stopping participant");
    handle.process_mut().request_stop().map_err(stop_failed)?;
    let code = handle
        .process_mut()
        .wait_exit_code()
        .await
        .map_err(stop_failed)?;
    handle.record_exit(code);

    info!(role = %role, code, "Participant stopped");
    Ok(code)
}
