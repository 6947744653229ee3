//! Language-model collaborator.
//!
//! The engine only talks to [`LanguageModel`]. Concrete providers are thin
//! blocking HTTP clients over `ureq`, each with an explicit request timeout:
//!
//! - [`openai::OpenAiCompatible`] speaks the chat-completions API and covers
//!   OpenAI, DeepSeek and Aliyun DashScope's compatible mode.
//! - [`anthropic::Anthropic`] speaks the messages API.
//!
//! [`build_provider`] turns resolved settings into exactly one boxed model,
//! which callers inject into the engine components that need it.

pub mod anthropic;
pub mod openai;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default completion length cap.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Errors from the language-model boundary.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured for {provider} (set {env_var} or `gos config set llm-api-key`)")]
    MissingApiKey {
        provider: ProviderKind,
        env_var: &'static str,
    },

    #[error("{provider} is not reachable at {url}: {message}")]
    Unavailable {
        provider: String,
        url: String,
        message: String,
    },

    #[error("{provider} request timed out after {timeout_secs}s")]
    Timeout { provider: String, timeout_secs: u64 },

    #[error("{provider} API error: HTTP {code}: {body}")]
    Status {
        provider: String,
        code: u16,
        body: String,
    },

    #[error("unexpected {provider} response: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl From<LlmError> for crate::Error {
    fn from(e: LlmError) -> Self {
        crate::Error::CollaboratorUnavailable(e.to_string())
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Falls back to [`DEFAULT_MAX_TOKENS`]
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn with_max_tokens(max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
        }
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

/// A text-generation collaborator: prompt in, raw text out.
pub trait LanguageModel: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Complete a single-turn prompt. The reply is trimmed; it is empty when the
    /// provider returned no text.
    fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<String, LlmError>;
}

/// Supported providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Aliyun,
    OpenAi,
    DeepSeek,
    Claude,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Aliyun,
        ProviderKind::OpenAi,
        ProviderKind::DeepSeek,
        ProviderKind::Claude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Aliyun => "aliyun",
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Claude => "claude",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Aliyun => "qwen-turbo",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::DeepSeek => "deepseek-chat",
            ProviderKind::Claude => "claude-3-5-haiku-20241022",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Aliyun => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::DeepSeek => "https://api.deepseek.com/v1",
            ProviderKind::Claude => "https://api.anthropic.com/v1",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Aliyun => "ALIYUN_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aliyun" | "dashscope" | "qwen" => Ok(ProviderKind::Aliyun),
            "openai" => Ok(ProviderKind::OpenAi),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            _ => Err(format!(
                "Unknown LLM provider: {}. Use aliyun | openai | deepseek | claude",
                s
            )),
        }
    }
}

/// Fully resolved provider settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl LlmSettings {
    /// Built-in defaults for a provider, without an API key.
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions::with_max_tokens(self.max_tokens)
    }
}

/// Build the configured provider. Without an API key this yields an
/// [`UnavailableModel`] so callers can still run and report the failure per call.
pub fn build_provider(settings: &LlmSettings) -> Box<dyn LanguageModel> {
    let Some(api_key) = settings.api_key.clone().filter(|k| !k.trim().is_empty()) else {
        return Box::new(UnavailableModel::missing_key(settings.provider));
    };

    match settings.provider {
        ProviderKind::Claude => Box::new(anthropic::Anthropic::new(
            &settings.base_url,
            &settings.model,
            api_key,
            settings.timeout,
        )),
        kind => Box::new(openai::OpenAiCompatible::new(
            kind.as_str(),
            &settings.base_url,
            &settings.model,
            api_key,
            settings.timeout,
        )),
    }
}

/// A model that fails every call. Used when no provider can be configured.
#[derive(Debug, Clone)]
pub struct UnavailableModel {
    provider: ProviderKind,
}

impl UnavailableModel {
    pub fn missing_key(provider: ProviderKind) -> Self {
        Self { provider }
    }
}

impl LanguageModel for UnavailableModel {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String, LlmError> {
        Err(LlmError::MissingApiKey {
            provider: self.provider,
            env_var: self.provider.api_key_env(),
        })
    }
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
        text = text.trim_start_matches(|c: char| c == ' ' || c == '\t');
        text = text.strip_prefix('\n').unwrap_or(text);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// POST a JSON body and decode the JSON reply.
pub(crate) fn post_json(
    agent: &ureq::Agent,
    provider: &str,
    url: &str,
    headers: &[(&str, &str)],
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<serde_json::Value, LlmError> {
    let mut request = agent.post(url).set("Content-Type", "application/json");
    for (name, value) in headers {
        request = request.set(name, value);
    }

    tracing::debug!(provider, url, "sending completion request");

    let resp = match request.send_string(&body.to_string()) {
        Ok(resp) => resp,
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            return Err(LlmError::Status {
                provider: provider.to_string(),
                code,
                body,
            });
        }
        Err(ureq::Error::Transport(t)) => {
            return Err(transport_error(provider, url, timeout, &t));
        }
    };

    let text = resp.into_string().map_err(|e| LlmError::InvalidResponse {
        provider: provider.to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| LlmError::InvalidResponse {
        provider: provider.to_string(),
        message: format!("{}: {}", e, text),
    })
}

fn transport_error(provider: &str, url: &str, timeout: Duration, t: &ureq::Transport) -> LlmError {
    let timed_out = std::error::Error::source(t)
        .and_then(|s| s.downcast_ref::<std::io::Error>())
        .is_some_and(|io| {
            matches!(
                io.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            )
        });

    if timed_out {
        LlmError::Timeout {
            provider: provider.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        LlmError::Unavailable {
            provider: provider.to_string(),
            url: url.to_string(),
            message: t.to_string(),
        }
    }
}

pub(crate) fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}
