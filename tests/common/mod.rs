//! Common test utilities for almanac integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/almanac/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` owns a temporary base data directory; the `alm()` method
/// returns a `Command` that sets `ALM_DATA_DIR` per-invocation, making tests
/// parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated data directory.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize almanac.
    pub fn init() -> Self {
        let env = Self::new();
        env.alm().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the alm binary with isolated data directory.
    pub fn alm(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_alm"));
        cmd.env("ALM_DATA_DIR", self.data_dir.path());
        cmd.env_remove("ALM_PROFILE");
        cmd
    }

    /// Resolved data directory of the default profile, for tests that edit
    /// config.toml directly.
    pub fn profile_root(&self) -> PathBuf {
        almanac::storage::storage_root(Some(self.data_dir.path()), "default").unwrap()
    }

    /// Run a command and parse its JSON stdout.
    ///
    /// Panics with stderr attached when the command fails.
    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.alm().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Run a command expected to fail and return its stderr.
    pub fn run_err(&self, args: &[&str]) -> String {
        let output = self.alm().args(args).output().unwrap();
        assert!(
            !output.status.success(),
            "command {:?} unexpectedly succeeded: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
