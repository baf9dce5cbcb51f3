//! Non-blocking liveness checks for background participants

use tracing::{debug, warn};

use crate::handle::ParticipantHandle;

/// Check whether a background participant is still running
///
/// Never blocks. If the participant has exited, its code is recorded on
/// the handle so a later [`crate::terminator::stop`] returns it without
/// signalling. A process whose state cannot be read counts as not alive.
pub fn is_alive(handle: &mut ParticipantHandle) -> bool {
    if handle.is_reaped() {
        return false;
    }

    match handle.process_mut().try_exit_code() {
        Ok(None) => true,
        Ok(Some(code)) => {
            debug!(role = %handle.role(), code, "Participant already exited");
            handle.record_exit(code);
            false
        }
        Err(e) => {
            warn!(role = %handle.role(), pid = ?handle.pid(), "Liveness check failed: {}", e);
            false
        }
    }
}
