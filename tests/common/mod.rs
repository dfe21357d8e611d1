//! Common test utilities for menuwright integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/menuwright/` or `~/.config/menuwright/`.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with isolated data and config directories.
///
/// The `mw()` method returns a `Command` that sets `MW_DATA_DIR` and
/// `MW_CONFIG_DIR` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
    pub work_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
            work_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize the store.
    pub fn init() -> Self {
        let env = Self::new();
        env.mw().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the mw binary with isolated directories.
    pub fn mw(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_mw"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("MW_DATA_DIR", self.data_dir.path());
        cmd.env("MW_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("MW_LOG");
        cmd
    }

    /// Run `mw` with `args`, expect success and parse stdout as JSON.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.mw().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "mw {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Like [`TestEnv::json`], feeding `input` on stdin.
    pub fn json_with_stdin(&self, args: &[&str], input: &str) -> serde_json::Value {
        let output = self.mw().args(args).write_stdin(input).output().unwrap();
        assert!(
            output.status.success(),
            "mw {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Write a file into the working directory and return its path.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.work_dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Get the path to the system config directory.
    pub fn config_path(&self) -> &Path {
        self.config_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
