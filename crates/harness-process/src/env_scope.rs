//! Scoped projection of a run configuration into the harness environment
//!
//! Children already receive the run's variables on their own command
//! (`Command::envs`), so forwarding does not depend on this scope. The scope
//! mirrors the values into the harness process itself for the duration of a
//! launch: set on entry, removed or restored on exit, so nothing set for one
//! test is visible to the next.
//!
//! Only one scope exists at a time across the process, and dropping it
//! restores every variable to what it was before, on every exit path.

use std::ffi::OsString;
use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

static ENV_OWNER: Mutex<()> = Mutex::const_new(());

/// Guard holding the harness environment for one launch
#[derive(Debug)]
pub struct EnvScope {
    saved: Vec<(String, Option<OsString>)>,
    _owner: MutexGuard<'static, ()>,
}

impl EnvScope {
    /// Wait for exclusive ownership of the environment, then apply `pairs`
    pub async fn enter<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let owner = ENV_OWNER.lock().await;

        let mut saved = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            saved.push((key.clone(), std::env::var_os(&key)));
            std::env::set_var(&key, value.as_ref());
            trace!(key = %key, "Projected variable");
        }

        Self {
            saved,
            _owner: owner,
        }
    }

    /// Names of the variables this scope set
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.saved.iter().map(|(key, _)| key.as_str())
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        // Restore in reverse so a key listed twice ends at its original value
        for (key, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}
