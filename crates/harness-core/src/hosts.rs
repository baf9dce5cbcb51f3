//! Host lists handed to scenarios
//!
//! A scenario receives an immutable snapshot of the configured hosts and
//! claims them one at a time. Claiming never mutates the configured list,
//! so two scenarios run from the same test info see the same hosts.

/// Snapshot of hosts available to one scenario
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostClaims {
    hosts: Vec<String>,
    claimed: Vec<bool>,
}

impl HostClaims {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: Vec<String> = hosts.into_iter().map(Into::into).collect();
        let claimed = vec![false; hosts.len()];
        Self { hosts, claimed }
    }

    /// True when no hosts were configured at all
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Hosts not yet claimed
    pub fn available(&self) -> usize {
        self.claimed.iter().filter(|c| !**c).count()
    }

    /// Claim the first unclaimed host
    pub fn claim_next(&mut self) -> Option<String> {
        let index = self.claimed.iter().position(|c| !*c)?;
        self.claimed[index] = true;
        Some(self.hosts[index].clone())
    }

    /// Every configured host, claimed or not
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}
