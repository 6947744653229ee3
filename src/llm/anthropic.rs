//! Anthropic messages API client.

use std::time::Duration;

use serde_json::{Value, json};

use super::{CompletionOptions, LanguageModel, LlmError, agent, post_json};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
    agent: ureq::Agent,
}

impl Anthropic {
    pub fn new(base_url: &str, model: &str, api_key: String, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/messages", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
            timeout,
            agent: agent(timeout),
        }
    }
}

impl LanguageModel for Anthropic {
    fn name(&self) -> &str {
        "claude"
    }

    fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "max_tokens": options.max_tokens(),
            "messages": [{ "role": "user", "content": prompt }],
        });
        let reply = post_json(
            &self.agent,
            self.name(),
            &self.endpoint,
            &[
                ("x-api-key", self.api_key.as_str()),
                ("anthropic-version", ANTHROPIC_VERSION),
            ],
            &body,
            self.timeout,
        )?;
        Ok(reply_text(&reply))
    }
}

/// First text content block, trimmed.
fn reply_text(reply: &Value) -> String {
    reply["content"]
        .as_array()
        .and_then(|blocks| blocks.iter().find(|b| b["type"] == "text"))
        .and_then(|b| b["text"].as_str())
        .unwrap_or_default()
        .trim()
        .to_string()
}
