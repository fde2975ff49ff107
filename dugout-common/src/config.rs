//! Configuration loading and credential resolution
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (handled by each binary's clap parser, with env fallback)
//! 2. TOML config file
//! 3. Compiled default
//!
//! A missing config file is not an error; a malformed one is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variables consulted for the generation backend credential,
/// highest priority first
pub const API_KEY_ENV_VARS: [&str; 2] = ["DUGOUT_OPENAI_API_KEY", "OPENAI_API_KEY"];

/// Settings read from the TOML config file
///
/// Every field is optional; absent values fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// sqlx connection string for the record store
    pub database_url: Option<String>,
    pub upstream_url: Option<String>,
    pub upstream_batch_size: Option<usize>,
    /// Fixed seed for tie-breaking during rank correction
    pub rank_seed: Option<u64>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub model: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub token_pace_ms: Option<u64>,
    pub split_tokens: Option<bool>,
    pub keepalive_secs: Option<u64>,
    pub session_channel_capacity: Option<usize>,
    /// Base URL the client uses to reach the server
    pub server_url: Option<String>,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directives (e.g. "info", "dugout_server=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default config file location (`~/.config/dugout/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dugout").join("config.toml"))
}

/// Load the TOML config
///
/// An explicitly requested file must exist. When no path is given the
/// default location is tried and silently skipped if absent.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                debug!("No config file found, using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Parse TOML text into a config
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Resolve the generation backend API key
///
/// **Priority:** `DUGOUT_OPENAI_API_KEY` → `OPENAI_API_KEY` → TOML `openai_api_key`
///
/// Returns `None` when no valid key is configured.
pub fn resolve_api_key(toml_config: &TomlConfig) -> Option<String> {
    let mut candidates: Vec<(&str, String)> = API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok().map(|v| (*name, v)))
        .collect();
    if let Some(key) = &toml_config.openai_api_key {
        candidates.push(("TOML", key.clone()));
    }
    candidates.retain(|(_, key)| is_valid_key(key));

    if candidates.len() > 1 {
        let sources: Vec<&str> = candidates.iter().map(|(source, _)| *source).collect();
        warn!(
            "API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    candidates.into_iter().next().map(|(source, key)| {
        info!("API key loaded from {}", source);
        key.trim().to_string()
    })
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
