//! OpenAI-compatible chat-completions client (OpenAI, DeepSeek, DashScope).

use std::time::Duration;

use serde_json::{Value, json};

use super::{CompletionOptions, LanguageModel, LlmError, agent, post_json};

pub struct OpenAiCompatible {
    name: String,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
    agent: ureq::Agent,
}

impl OpenAiCompatible {
    pub fn new(name: &str, base_url: &str, model: &str, api_key: String, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
            timeout,
            agent: agent(timeout),
        }
    }
}

impl LanguageModel for OpenAiCompatible {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, LlmError> {
        let body = request_body(&self.model, prompt, options.max_tokens());
        let auth = format!("Bearer {}", self.api_key);
        let reply = post_json(
            &self.agent,
            &self.name,
            &self.endpoint,
            &[("Authorization", auth.as_str())],
            &body,
            self.timeout,
        )?;
        Ok(reply_text(&reply))
    }
}

fn request_body(model: &str, prompt: &str, max_tokens: u32) -> Value {
    json!({
        "model": model,
        "messages": [{ "role": "user", "content": prompt }],
        "max_tokens": max_tokens,
    })
}

/// First choice's message content, trimmed.
fn reply_text(reply: &Value) -> String {
    reply["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .trim()
        .to_string()
}
