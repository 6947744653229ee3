//! KDL schema definitions for config.kdl and state.kdl.

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

use crate::llm::ProviderKind;

/// Keys accepted in config.kdl.
pub const CONFIG_KEYS: [&str; 6] = [
    "default-daily-minutes",
    "llm-provider",
    "llm-model",
    "llm-base-url",
    "llm-timeout-secs",
    "llm-max-tokens",
];

/// Keys accepted in state.kdl.
pub const STATE_KEYS: [&str; 1] = ["llm-api-key"];

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// default-daily-minutes 45
/// llm-provider "openai"   // aliyun | openai | deepseek | claude
/// llm-model "gpt-4o-mini"
/// llm-base-url "https://api.openai.com/v1"
/// llm-timeout-secs 60
/// llm-max-tokens 1024
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthConfig {
    /// Budget for projects that don't set their own
    pub default_daily_minutes: Option<u32>,
    pub llm_provider: Option<ProviderKind>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_timeout_secs: Option<u64>,
    pub llm_max_tokens: Option<u32>,
}

impl GrowthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document. Unknown nodes and invalid values are skipped.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(i) = first_integer(doc, "default-daily-minutes") {
            config.default_daily_minutes = u32::try_from(i).ok().filter(|m| *m > 0);
        }

        if let Some(s) = first_string(doc, "llm-provider") {
            match s.parse::<ProviderKind>() {
                Ok(kind) => config.llm_provider = Some(kind),
                Err(e) => tracing::warn!(error = %e, "ignoring llm-provider in config.kdl"),
            }
        }

        config.llm_model = first_string(doc, "llm-model").filter(|s| !s.is_empty());
        config.llm_base_url = first_string(doc, "llm-base-url").filter(|s| !s.is_empty());

        if let Some(i) = first_integer(doc, "llm-timeout-secs") {
            config.llm_timeout_secs = u64::try_from(i).ok().filter(|s| *s > 0);
        }
        if let Some(i) = first_integer(doc, "llm-max-tokens") {
            config.llm_max_tokens = u32::try_from(i).ok().filter(|t| *t > 0);
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(minutes) = self.default_daily_minutes {
            push_integer(&mut doc, "default-daily-minutes", i128::from(minutes));
        }
        if let Some(provider) = self.llm_provider {
            push_string(&mut doc, "llm-provider", provider.as_str());
        }
        if let Some(ref model) = self.llm_model {
            push_string(&mut doc, "llm-model", model);
        }
        if let Some(ref url) = self.llm_base_url {
            push_string(&mut doc, "llm-base-url", url);
        }
        if let Some(secs) = self.llm_timeout_secs {
            push_integer(&mut doc, "llm-timeout-secs", i128::from(secs));
        }
        if let Some(tokens) = self.llm_max_tokens {
            push_integer(&mut doc, "llm-max-tokens", i128::from(tokens));
        }

        doc
    }

    /// Set one key from its string form, validating the value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        match key {
            "default-daily-minutes" => self.default_daily_minutes = Some(positive(key, value)?),
            "llm-provider" => self.llm_provider = Some(value.parse()?),
            "llm-model" => self.llm_model = Some(non_empty(key, value)?),
            "llm-base-url" => {
                let url = non_empty(key, value)?;
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(format!("{} must be an http(s) URL, got {}", key, url));
                }
                self.llm_base_url = Some(url);
            }
            "llm-timeout-secs" => self.llm_timeout_secs = Some(u64::from(positive(key, value)?)),
            "llm-max-tokens" => self.llm_max_tokens = Some(positive(key, value)?),
            _ => {
                return Err(format!(
                    "Unknown config key: {}. Valid keys: {}, {}",
                    key,
                    CONFIG_KEYS.join(", "),
                    STATE_KEYS.join(", ")
                ));
            }
        }
        Ok(())
    }
}

/// Secrets stored in state.kdl.
///
/// **Must be written with 0600 permissions (owner read/write only).**
///
/// ```kdl
/// llm-api-key "sk-xxxxxxxxxxxxxxxx"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthState {
    pub llm_api_key: Option<String>,
}

impl GrowthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_kdl(doc: &KdlDocument) -> Self {
        Self {
            llm_api_key: first_string(doc, "llm-api-key").filter(|s| !s.is_empty()),
        }
    }

    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();
        if let Some(ref key) = self.llm_api_key {
            push_string(&mut doc, "llm-api-key", key);
        }
        doc
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "llm-api-key" => {
                self.llm_api_key = Some(non_empty(key, value.trim())?);
                Ok(())
            }
            _ => Err(format!("Unknown state key: {}", key)),
        }
    }
}

/// Mask a secret for display, keeping the first and last four characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        let head: String = chars.iter().take(4.min(chars.len())).collect();
        format!("{}...", head)
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

/// Required permissions for state.kdl (Unix: 0600, owner read/write only).
#[cfg(unix)]
pub const STATE_FILE_MODE: u32 = 0o600;

/// Required permissions for config.kdl (Unix: 0644, readable by all).
#[cfg(unix)]
pub const CONFIG_FILE_MODE: u32 = 0o644;

fn first_string(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_string())
        .map(|s| s.to_string())
}

fn first_integer(doc: &KdlDocument, name: &str) -> Option<i128> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .and_then(|entry| entry.value().as_integer())
}

fn push_string(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}

fn push_integer(doc: &mut KdlDocument, name: &str, value: i128) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::Integer(value)));
    doc.nodes_mut().push(node);
}

fn positive(key: &str, value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{} must be a positive integer, got {}", key, value)),
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    Ok(value.to_string())
}
