//! ScriptDir - throwaway participant executables for launcher tests
//!
//! Each test gets its own temporary directory of small shell scripts that
//! stand in for the threaded client and server binaries.

use harness_core::RunConfig;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct ScriptDir {
    dir: TempDir,
}

impl ScriptDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create script dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write an executable `/bin/sh` script and return its path
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// Script that exits with `code`
    pub fn exits_with(&self, name: &str, code: i32) -> PathBuf {
        self.script(name, &format!("exit {}", code))
    }

    /// Script that runs until SIGTERM, then exits with `code`
    pub fn serves_until_term(&self, name: &str, code: i32) -> PathBuf {
        self.script(
            name,
            &format!("trap 'exit {}' TERM\nwhile :; do sleep 0.05; done", code),
        )
    }

    /// File inside the script dir
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Run configuration with a fixed port, for tests that never bind it
pub fn test_config(port: u16) -> RunConfig {
    RunConfig {
        log_mask: "DEBUG".to_string(),
        transport_address_family: "ofi+sockets".to_string(),
        network_interface: "lo".to_string(),
        port,
        context_share_flag: true,
        context_count: 4,
    }
}
