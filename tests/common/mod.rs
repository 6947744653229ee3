//! Common test utilities for gos integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/growthos/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// Environment variables that would point the binary at a real model.
const LLM_ENV_VARS: [&str; 7] = [
    "GOS_LLM_PROVIDER",
    "GOS_LLM_MODEL",
    "GOS_LLM_BASE_URL",
    "ALIYUN_API_KEY",
    "OPENAI_API_KEY",
    "DEEPSEEK_API_KEY",
    "ANTHROPIC_API_KEY",
];

/// A test environment with isolated data storage.
///
/// The `gos()` method returns a `Command` that sets `GOS_DATA_DIR`
/// per-invocation and clears model credentials, making tests parallel-safe
/// and offline.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the gos binary with isolated data directory.
    pub fn gos(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_gos"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("GOS_DATA_DIR", self.data_dir.path());
        cmd.env_remove("GOS_LOG");
        for var in LLM_ENV_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Run `gos` with `args`, assert success and parse stdout as JSON.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.gos().args(args).output().unwrap();
        assert!(
            output.status.success(),
            "gos {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("Failed to parse JSON")
    }

    /// Create a project and return its ID.
    pub fn create_project(&self, args: &[&str]) -> String {
        let mut full = vec!["project", "create"];
        full.extend_from_slice(args);
        self.json(&full)["id"]
            .as_str()
            .expect("Missing id field")
            .to_string()
    }

    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
