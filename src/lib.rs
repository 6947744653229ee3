//! growthos - daily planning and stagnation recovery for long-running projects.
//!
//! This library provides the engine behind the `gos` CLI: time-budgeted daily
//! task selection, project progress aggregation, WBS synchronization, and the
//! daily stagnation sweep that escalates into AI-driven difficulty adjustments.

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod llm;
pub mod models;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    use crate::llm::{CompletionOptions, LanguageModel, LlmError};
    use crate::storage::Storage;

    /// Test environment with an isolated data directory.
    pub struct TestEnv {
        pub data_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Open storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::open(self.data_path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Language model fake that replays canned replies in order and records prompts.
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new() -> Self {
            Self {
                replies: Mutex::new(VecDeque::new()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn reply(self, text: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(self, err: LlmError) -> Self {
            self.replies.lock().unwrap().push_back(Err(err));
            self
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl LanguageModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        fn complete(
            &self,
            prompt: &str,
            _options: &CompletionOptions,
        ) -> std::result::Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("{}".to_string()))
        }
    }
}

/// Library-level error type for growthos operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// The language model answered, but not with the JSON shape we asked for.
    #[error("Could not parse generated output: {message}")]
    GenerationParse { message: String, raw: String },

    #[error("Language model unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the failure left stored state untouched and a later attempt may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::GenerationParse { .. } | Error::CollaboratorUnavailable(_)
        )
    }
}

/// Result type alias for growthos operations.
pub type Result<T> = std::result::Result<T, Error>;
