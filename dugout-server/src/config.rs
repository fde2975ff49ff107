//! dugout-server configuration
//!
//! Resolution order per setting: command line (or its `DUGOUT_*` env var)
//! → TOML file → compiled default. The backend credential is resolved
//! separately by `dugout_common::config::resolve_api_key`.

use clap::Parser;
use dugout_common::config::TomlConfig;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_DATABASE_URL: &str = "sqlite://dugout.db?mode=rwc";
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.sampleapis.com/baseball/hitsSingleSeason";
pub const DEFAULT_UPSTREAM_BATCH_SIZE: usize = 10;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_TOKEN_PACE_MS: u64 = 50;
pub const DEFAULT_KEEPALIVE_SECS: u64 = 15;
pub const DEFAULT_SESSION_CHANNEL_CAPACITY: usize = 32;

/// Command-line arguments for dugout-server
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "dugout-server")]
#[command(about = "Record service with streamed summary generation")]
#[command(version)]
pub struct CliArgs {
    /// TOML config file (default: ~/.config/dugout/config.toml if present)
    #[arg(short, long, env = "DUGOUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "DUGOUT_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "DUGOUT_PORT")]
    pub port: Option<u16>,

    /// sqlx connection string for the record store
    #[arg(long, env = "DUGOUT_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Upstream data source URL
    #[arg(long, env = "DUGOUT_UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    /// Fixed seed for rank tie-breaking (random when unset)
    #[arg(long, env = "DUGOUT_RANK_SEED")]
    pub rank_seed: Option<u64>,

    /// Chat completion API base URL
    #[arg(long, env = "DUGOUT_OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Model name sent to the generation backend
    #[arg(long, env = "DUGOUT_MODEL")]
    pub model: Option<String>,

    /// Delay before each relayed frame, in milliseconds (0 disables pacing)
    #[arg(long, env = "DUGOUT_TOKEN_PACE_MS")]
    pub token_pace_ms: Option<u64>,

    /// Log level or EnvFilter directives (overridden by RUST_LOG)
    #[arg(long, env = "DUGOUT_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Generation backend settings
///
/// Built once at startup and handed to the backend client; there is no
/// process-global client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
}

/// Upstream data source settings
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub url: String,
    pub batch_size: usize,
}

/// Stream relay settings
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Delay before each token frame (cosmetic typing effect)
    pub token_pace: Duration,
    /// Relay each character as its own frame
    pub split_tokens: bool,
    /// Idle keep-alive interval (never zero)
    pub keepalive: Duration,
    /// Bound of the session → relay event channel
    pub session_channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            token_pace: Duration::from_millis(DEFAULT_TOKEN_PACE_MS),
            split_tokens: true,
            keepalive: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            session_channel_capacity: DEFAULT_SESSION_CHANNEL_CAPACITY,
        }
    }
}

/// Resolved server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub upstream: UpstreamConfig,
    pub rank_seed: Option<u64>,
    pub backend: BackendConfig,
    pub relay: RelayConfig,
    pub log_level: String,
}

impl Config {
    /// Merge command-line arguments over TOML settings over defaults
    pub fn resolve(args: &CliArgs, toml: &TomlConfig, api_key: Option<String>) -> Self {
        let relay_defaults = RelayConfig::default();

        Self {
            host: args
                .host
                .clone()
                .or_else(|| toml.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: args.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            database_url: args
                .database_url
                .clone()
                .or_else(|| toml.database_url.clone())
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            upstream: UpstreamConfig {
                url: args
                    .upstream_url
                    .clone()
                    .or_else(|| toml.upstream_url.clone())
                    .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
                batch_size: toml
                    .upstream_batch_size
                    .unwrap_or(DEFAULT_UPSTREAM_BATCH_SIZE),
            },
            rank_seed: args.rank_seed.or(toml.rank_seed),
            backend: BackendConfig {
                base_url: args
                    .openai_base_url
                    .clone()
                    .or_else(|| toml.openai_base_url.clone())
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                api_key,
                model: args
                    .model
                    .clone()
                    .or_else(|| toml.model.clone())
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                request_timeout: Duration::from_secs(
                    toml.request_timeout_secs
                        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
                ),
            },
            relay: RelayConfig {
                token_pace: args
                    .token_pace_ms
                    .or(toml.token_pace_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(relay_defaults.token_pace),
                split_tokens: toml.split_tokens.unwrap_or(relay_defaults.split_tokens),
                keepalive: toml
                    .keepalive_secs
                    .filter(|s| *s > 0)
                    .map(Duration::from_secs)
                    .unwrap_or(relay_defaults.keepalive),
                session_channel_capacity: toml
                    .session_channel_capacity
                    .filter(|c| *c > 0)
                    .unwrap_or(relay_defaults.session_channel_capacity),
            },
            log_level: args
                .log_level
                .clone()
                .unwrap_or_else(|| toml.logging.level.clone()),
        }
    }

    /// `host:port` string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::resolve(&CliArgs::default(), &TomlConfig::default(), None);

        assert_eq!(config.bind_addr(), "127.0.0.1:5050");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.upstream.batch_size, 10);
        assert_eq!(config.backend.model, "gpt-3.5-turbo");
        assert_eq!(config.backend.api_key, None);
        assert_eq!(config.relay.token_pace, Duration::from_millis(50));
        assert!(config.relay.split_tokens);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.rank_seed, None);
    }

    #[test]
    fn cli_overrides_toml() {
        let args = CliArgs {
            port: Some(9000),
            token_pace_ms: Some(0),
            ..Default::default()
        };
        let toml = TomlConfig {
            port: Some(8000),
            host: Some("0.0.0.0".to_string()),
            token_pace_ms: Some(25),
            rank_seed: Some(7),
            session_channel_capacity: Some(0),
            keepalive_secs: Some(0),
            ..Default::default()
        };

        let config = Config::resolve(&args, &toml, Some("key".to_string()));

        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.relay.token_pace, Duration::ZERO);
        assert_eq!(config.rank_seed, Some(7));
        assert_eq!(config.relay.session_channel_capacity, DEFAULT_SESSION_CHANNEL_CAPACITY);
        assert_eq!(config.relay.keepalive, Duration::from_secs(DEFAULT_KEEPALIVE_SECS));
        assert_eq!(config.backend.api_key.as_deref(), Some("key"));
    }
}
