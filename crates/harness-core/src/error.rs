//! Error types for the threaded harness
//!
//! Every failure that can stop a scenario before a verdict is reached is a
//! [`HarnessError`]. Failures of the participants themselves (non-zero exit,
//! early death) are not errors; they are carried by [`crate::Verdict`].

use crate::role::NodeRole;
use thiserror::Error;

/// Main error type for harness operations
#[derive(Error, Debug)]
pub enum HarnessError {
    // ===== Configuration Errors =====
    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Test configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Test configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    // ===== Port Errors =====
    /// No free port left in the allocator's range
    #[error("No free port on {interface} in range {start}-{end}")]
    PortExhausted {
        interface: String,
        start: u16,
        end: u16,
    },

    // ===== Process Errors =====
    /// A participant could not be started
    #[error("Failed to launch {role}: {reason}")]
    LaunchFailed { role: NodeRole, reason: String },

    /// A background participant could not be stopped
    #[error("Failed to stop {role}: {reason}")]
    StopFailed { role: NodeRole, reason: String },

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Get an error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            HarnessError::InvalidConfig(_) => "INVALID_CONFIG",
            HarnessError::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            HarnessError::ConfigParse(_) => "CONFIG_PARSE",
            HarnessError::PortExhausted { .. } => "PORT_EXHAUSTED",
            HarnessError::LaunchFailed { .. } => "LAUNCH_FAILED",
            HarnessError::StopFailed { .. } => "STOP_FAILED",
            HarnessError::Io(_) => "IO_ERROR",
        }
    }

    /// The participant role this error is attributed to, if any
    pub fn role(&self) -> Option<NodeRole> {
        match self {
            HarnessError::LaunchFailed { role, .. } | HarnessError::StopFailed { role, .. } => {
                Some(*role)
            }
            _ => None,
        }
    }

    /// Check if this error happened during test setup (before any launch)
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            HarnessError::InvalidConfig(_)
                | HarnessError::ConfigNotFound(_)
                | HarnessError::ConfigParse(_)
                | HarnessError::PortExhausted { .. }
        )
    }
}

impl From<serde_yaml::Error> for HarnessError {
    fn from(err: serde_yaml::Error) -> Self {
        HarnessError::ConfigParse(err.to_string())
    }
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
