//! Scenario verdicts
//!
//! A verdict is the only thing a scenario hands back to the test-result
//! layer. Skips are never failures, and every failure names its cause so a
//! partial failure (server up, client down) reads differently from a total
//! one.

use serde::{Deserialize, Serialize};

use crate::role::NodeRole;

/// Why a scenario failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    /// A participant could not be started at all
    LaunchFailure { role: NodeRole, reason: String },

    /// The client could not be started while a server was already running
    ///
    /// `server` is the code the server reported when it was stopped, `None`
    /// if the stop itself failed.
    ClientLaunchFailure { reason: String, server: Option<i32> },

    /// A background participant died before its settle check
    EarlyExit {
        role: NodeRole,
        /// Code reported when the dead participant was reaped
        exit_code: Option<i32>,
    },

    /// One or more participants ran to completion with a non-zero status
    ///
    /// `None` means the side never produced a status: it was not part of
    /// the run, or its launch or stop failed.
    NonZeroExit {
        client: Option<i32>,
        server: Option<i32>,
    },

    /// A combined client+server launch exited non-zero
    ///
    /// The launcher reports one status for both roles, so the failure
    /// cannot be attributed to either side.
    CombinedExit { exit_code: i32 },

    /// A background participant could not be stopped
    CleanupFailure { role: NodeRole, reason: String },
}

impl FailureCause {
    /// The role the failure is attributed to, when there is exactly one
    pub fn role(&self) -> Option<NodeRole> {
        match self {
            FailureCause::LaunchFailure { role, .. }
            | FailureCause::EarlyExit { role, .. }
            | FailureCause::CleanupFailure { role, .. } => Some(*role),
            FailureCause::ClientLaunchFailure { server, .. } => match server {
                Some(code) if *code != 0 => None,
                _ => Some(NodeRole::Client),
            },
            FailureCause::NonZeroExit { client, server } => {
                let client_failed = client.map_or(false, |c| c != 0);
                let server_failed = server.map_or(false, |s| s != 0);
                match (client_failed, server_failed) {
                    (true, false) => Some(NodeRole::Client),
                    (false, true) => Some(NodeRole::Server),
                    _ => None,
                }
            }
            FailureCause::CombinedExit { .. } => None,
        }
    }
}

impl std::fmt::Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCause::LaunchFailure { role, reason } => {
                write!(f, "{} launch failed: {}", role, reason)
            }
            FailureCause::ClientLaunchFailure { reason, server } => {
                write!(
                    f,
                    "client launch failed: {}, return code server {}",
                    reason,
                    code_text(*server)
                )
            }
            FailureCause::EarlyExit { role, exit_code } => {
                write!(f, "{} failed to start", role)?;
                match exit_code {
                    Some(code) => write!(f, " (exited with {})", code),
                    None => Ok(()),
                }
            }
            FailureCause::NonZeroExit { client, server } => {
                write!(f, "return codes client {} server {}", code_text(*client), code_text(*server))
            }
            FailureCause::CombinedExit { exit_code } => {
                write!(f, "return code {}", exit_code)
            }
            FailureCause::CleanupFailure { role, reason } => {
                write!(f, "failed to stop {}: {}", role, reason)
            }
        }
    }
}

fn code_text(code: Option<i32>) -> String {
    code.map_or_else(|| "n/a".to_string(), |c| c.to_string())
}

/// Final classification of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Skipped { reason: String },
    Fail { cause: FailureCause },
}

impl Verdict {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Verdict::Skipped {
            reason: reason.into(),
        }
    }

    pub fn fail(cause: FailureCause) -> Self {
        Verdict::Fail { cause }
    }

    /// Aggregate exit codes: pass iff every present code is zero
    pub fn from_exit_codes(client: Option<i32>, server: Option<i32>) -> Self {
        let failed = [client, server].iter().flatten().any(|code| *code != 0);
        if failed {
            Verdict::fail(FailureCause::NonZeroExit { client, server })
        } else {
            Verdict::Pass
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Verdict::Skipped { .. })
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Verdict::Fail { .. })
    }

    /// The failure cause, if this is a failure
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            Verdict::Fail { cause } => Some(cause),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Skipped { .. } => "SKIP",
            Verdict::Fail { .. } => "FAIL",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Skipped { reason } => write!(f, "SKIP: {}", reason),
            Verdict::Fail { cause } => write!(f, "FAIL: {}", cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero_passes() {
        assert!(Verdict::from_exit_codes(Some(0), Some(0)).is_pass());
        assert!(Verdict::from_exit_codes(Some(0), None).is_pass());
    }

    #[test]
    fn test_codes_reported_separately() {
        let verdict = Verdict::from_exit_codes(Some(0), Some(3));
        assert_eq!(
            verdict.cause(),
            Some(&FailureCause::NonZeroExit {
                client: Some(0),
                server: Some(3)
            })
        );
        assert_eq!(verdict.to_string(), "FAIL: return codes client 0 server 3");
        assert_eq!(verdict.cause().and_then(|c| c.role()), Some(NodeRole::Server));
    }

    #[test]
    fn test_both_failed_has_no_single_role() {
        let cause = FailureCause::NonZeroExit {
            client: Some(1),
            server: Some(2),
        };
        assert_eq!(cause.role(), None);
    }

    #[test]
    fn test_client_launch_failure_keeps_server_code() {
        let cause = FailureCause::ClientLaunchFailure {
            reason: "node1 unreachable".to_string(),
            server: Some(139),
        };
        assert_eq!(
            cause.to_string(),
            "client launch failed: node1 unreachable, return code server 139"
        );
        // Both sides failed
        assert_eq!(cause.role(), None);

        let cause = FailureCause::ClientLaunchFailure {
            reason: "node1 unreachable".to_string(),
            server: Some(0),
        };
        assert_eq!(cause.role(), Some(NodeRole::Client));
    }

    #[test]
    fn test_early_exit_message() {
        let cause = FailureCause::EarlyExit {
            role: NodeRole::Server,
            exit_code: None,
        };
        assert_eq!(cause.to_string(), "server failed to start");
    }

    #[test]
    fn test_combined_exit_message() {
        let verdict = Verdict::fail(FailureCause::CombinedExit { exit_code: 1 });
        assert_eq!(verdict.to_string(), "FAIL: return code 1");
        assert_eq!(verdict.cause().and_then(|c| c.role()), None);
    }

    #[test]
    fn test_skip_is_not_failure() {
        let verdict = Verdict::skipped("Client list is not empty.");
        assert!(verdict.is_skipped());
        assert!(!verdict.is_fail());
        assert_eq!(verdict.label(), "SKIP");
    }

    #[test]
    fn test_verdict_serialization() {
        let verdict = Verdict::fail(FailureCause::EarlyExit {
            role: NodeRole::Server,
            exit_code: Some(1),
        });
        let json = serde_json::to_string(&verdict).unwrap();
        let recovered: Verdict = serde_json::from_str(&json).unwrap();
        assert_eq!(verdict, recovered);
    }
}
