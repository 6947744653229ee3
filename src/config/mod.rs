//! Configuration and state management.
//!
//! Two KDL files live in the data directory next to the database:
//!
//! ## config.kdl - User preferences
//!
//! - `default-daily-minutes` - Budget for projects that don't set their own
//! - `llm-provider`, `llm-model`, `llm-base-url` - Which model to talk to
//! - `llm-timeout-secs`, `llm-max-tokens` - Request limits
//!
//! ## state.kdl - Secrets
//!
//! - `llm-api-key` - Fallback API key when the provider's env var is unset
//!
//! ## Security
//!
//! **CRITICAL**: `state.kdl` MUST be written with 0600 permissions (owner read/write only)
//! because it contains an API key.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

use std::fs;
use std::path::Path;

use kdl::KdlDocument;

pub use resolver::{ConfigOverrides, Resolved, ResolvedSettings, ValueSource, resolve};
pub use schema::{CONFIG_KEYS, GrowthConfig, GrowthState, STATE_KEYS, mask_secret};
#[cfg(unix)]
pub use schema::{CONFIG_FILE_MODE, STATE_FILE_MODE};

use crate::{Error, Result};

pub const CONFIG_FILE: &str = "config.kdl";
pub const STATE_FILE: &str = "state.kdl";

/// Read config.kdl, or defaults when the file doesn't exist.
pub fn read_config(data_dir: &Path) -> Result<GrowthConfig> {
    Ok(read_kdl(&data_dir.join(CONFIG_FILE))?
        .map(|doc| GrowthConfig::from_kdl(&doc))
        .unwrap_or_default())
}

/// Read state.kdl, or an empty state when the file doesn't exist.
pub fn read_state(data_dir: &Path) -> Result<GrowthState> {
    Ok(read_kdl(&data_dir.join(STATE_FILE))?
        .map(|doc| GrowthState::from_kdl(&doc))
        .unwrap_or_default())
}

pub fn write_config(data_dir: &Path, config: &GrowthConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    fs::create_dir_all(data_dir)?;
    fs::write(&path, config.to_kdl().to_string())?;
    #[cfg(unix)]
    set_mode(&path, CONFIG_FILE_MODE)?;
    Ok(())
}

pub fn write_state(data_dir: &Path, state: &GrowthState) -> Result<()> {
    let path = data_dir.join(STATE_FILE);
    fs::create_dir_all(data_dir)?;
    fs::write(&path, state.to_kdl().to_string())?;
    #[cfg(unix)]
    set_mode(&path, STATE_FILE_MODE)?;
    Ok(())
}

/// Where a key is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFile {
    Config,
    State,
}

impl KeyFile {
    pub fn for_key(key: &str) -> Self {
        if STATE_KEYS.contains(&key) {
            KeyFile::State
        } else {
            KeyFile::Config
        }
    }
}

/// Validate and persist one key, routing secrets to state.kdl.
pub fn set_value(data_dir: &Path, key: &str, value: &str) -> Result<KeyFile> {
    let file = KeyFile::for_key(key);
    match file {
        KeyFile::State => {
            let mut state = read_state(data_dir)?;
            state.set(key, value).map_err(Error::Validation)?;
            write_state(data_dir, &state)?;
        }
        KeyFile::Config => {
            let mut config = read_config(data_dir)?;
            config.set(key, value).map_err(Error::Validation)?;
            write_config(data_dir, &config)?;
        }
    }
    tracing::debug!(key, "config value saved");
    Ok(file)
}

fn read_kdl(path: &Path) -> Result<Option<KdlDocument>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let doc = content
        .parse::<KdlDocument>()
        .map_err(|e| Error::Validation(format!("Invalid KDL in {}: {}", path.display(), e)))?;
    Ok(Some(doc))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}
