//! Precedence resolution for configuration and secrets.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags
//! 2. Environment variables (`GOS_LLM_PROVIDER`, `GOS_LLM_MODEL`,
//!    `GOS_LLM_BASE_URL`, and the provider's API key variable such as
//!    `OPENAI_API_KEY`)
//! 3. config.kdl / state.kdl in the data directory
//! 4. Built-in defaults

use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::config::schema::{GrowthConfig, GrowthState, mask_secret};
use crate::config::{read_config, read_state};
use crate::llm::{DEFAULT_MAX_TOKENS, DEFAULT_TIMEOUT_SECS, LlmSettings, ProviderKind};
use crate::models::DEFAULT_DAILY_MINUTES;
use crate::{Error, Result};

/// Environment variable selecting the provider.
pub const PROVIDER_ENV: &str = "GOS_LLM_PROVIDER";
/// Environment variable selecting the model.
pub const MODEL_ENV: &str = "GOS_LLM_MODEL";
/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "GOS_LLM_BASE_URL";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    CliFlag,
    EnvVar(String),
    ConfigFile,
    StateFile,
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config.kdl"),
            ValueSource::StateFile => write!(f, "state.kdl"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// CLI overrides for resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub default_daily_minutes: Resolved<u32>,
    pub provider: Resolved<ProviderKind>,
    pub model: Resolved<String>,
    pub base_url: Resolved<String>,
    pub timeout_secs: Resolved<u64>,
    pub max_tokens: Resolved<u32>,
    pub api_key: Option<Resolved<String>>,
}

impl ResolvedSettings {
    /// Provider settings for [`crate::llm::build_provider`].
    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            provider: self.provider.value,
            model: self.model.value.clone(),
            base_url: self.base_url.value.clone(),
            api_key: self.api_key.as_ref().map(|r| r.value.clone()),
            timeout: Duration::from_secs(self.timeout_secs.value),
            max_tokens: self.max_tokens.value,
        }
    }

    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key.as_ref().map(|r| mask_secret(&r.value))
    }
}

/// Resolve settings for `data_dir` against the process environment.
pub fn resolve(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedSettings> {
    let config = read_config(data_dir)?;
    let state = read_state(data_dir)?;
    resolve_with_env(&config, &state, overrides, |name| std::env::var(name).ok())
}

/// Resolve settings from already-loaded files and an environment lookup.
pub fn resolve_with_env(
    config: &GrowthConfig,
    state: &GrowthState,
    overrides: &ConfigOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedSettings> {
    let lookup = |name: &str| env(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let default_daily_minutes = match config.default_daily_minutes {
        Some(m) => Resolved::new(m, ValueSource::ConfigFile),
        None => Resolved::new(DEFAULT_DAILY_MINUTES, ValueSource::Default),
    };

    let provider = if let Some(p) = overrides.provider {
        Resolved::new(p, ValueSource::CliFlag)
    } else if let Some(raw) = lookup(PROVIDER_ENV) {
        let p = raw
            .parse::<ProviderKind>()
            .map_err(|e| Error::Validation(format!("{}: {}", PROVIDER_ENV, e)))?;
        Resolved::new(p, ValueSource::EnvVar(PROVIDER_ENV.to_string()))
    } else if let Some(p) = config.llm_provider {
        Resolved::new(p, ValueSource::ConfigFile)
    } else {
        Resolved::new(ProviderKind::default(), ValueSource::Default)
    };
    let kind = provider.value;

    let model = pick(
        overrides.model.clone(),
        MODEL_ENV,
        &lookup,
        config.llm_model.clone(),
        kind.default_model(),
    );
    let base_url = pick(
        overrides.base_url.clone(),
        BASE_URL_ENV,
        &lookup,
        config.llm_base_url.clone(),
        kind.default_base_url(),
    );

    let timeout_secs = match (overrides.timeout_secs, config.llm_timeout_secs) {
        (Some(0), _) => {
            return Err(Error::Validation("Timeout must be a positive number of seconds".to_string()));
        }
        (Some(s), _) => Resolved::new(s, ValueSource::CliFlag),
        (None, Some(s)) => Resolved::new(s, ValueSource::ConfigFile),
        (None, None) => Resolved::new(DEFAULT_TIMEOUT_SECS, ValueSource::Default),
    };

    let max_tokens = match config.llm_max_tokens {
        Some(t) => Resolved::new(t, ValueSource::ConfigFile),
        None => Resolved::new(DEFAULT_MAX_TOKENS, ValueSource::Default),
    };

    let key_env = kind.api_key_env();
    let api_key = if let Some(key) = lookup(key_env) {
        Some(Resolved::new(key, ValueSource::EnvVar(key_env.to_string())))
    } else {
        state
            .llm_api_key
            .clone()
            .map(|key| Resolved::new(key, ValueSource::StateFile))
    };

    Ok(ResolvedSettings {
        default_daily_minutes,
        provider,
        model,
        base_url,
        timeout_secs,
        max_tokens,
        api_key,
    })
}

fn pick(
    cli: Option<String>,
    env_name: &str,
    env: &impl Fn(&str) -> Option<String>,
    file: Option<String>,
    default: &str,
) -> Resolved<String> {
    if let Some(v) = cli {
        Resolved::new(v, ValueSource::CliFlag)
    } else if let Some(v) = env(env_name) {
        Resolved::new(v, ValueSource::EnvVar(env_name.to_string()))
    } else if let Some(v) = file {
        Resolved::new(v, ValueSource::ConfigFile)
    } else {
        Resolved::new(default.to_string(), ValueSource::Default)
    }
}
