//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API keys are loaded from the GEMINI_API_KEYS env var or `api_keys_file`,
//! never stored in the TOML directly to avoid leaking secrets.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var holding a comma-separated list of API keys.
pub const API_KEYS_ENV: &str = "GEMINI_API_KEYS";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub pool: PoolConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Text-generation service settings
#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,
    /// File with one API key per line (alternative to GEMINI_API_KEYS)
    #[serde(default)]
    pub api_keys_file: Option<PathBuf>,
    #[serde(skip)]
    pub api_keys: Vec<Secret<String>>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            attempt_timeout_secs: default_attempt_timeout(),
            api_keys_file: None,
            api_keys: Vec::new(),
        }
    }
}

impl GeminiConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// Key rotation settings
#[derive(Debug, Default, Deserialize)]
pub struct PoolConfig {
    /// Seconds a quota-exhausted or rejected key is skipped; 0 disables.
    #[serde(default)]
    pub cooldown_secs: u64,
}

impl PoolConfig {
    pub fn cooldown(&self) -> Option<Duration> {
        (self.cooldown_secs > 0).then(|| Duration::from_secs(self.cooldown_secs))
    }
}

fn default_max_connections() -> usize {
    1000
}

fn default_base_url() -> String {
    provider::gemini::DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    provider::gemini::DEFAULT_MODEL.to_string()
}

fn default_attempt_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file, then resolve API keys.
    ///
    /// API key resolution order:
    /// 1. GEMINI_API_KEYS env var (comma-separated)
    /// 2. api_keys_file path from config (one per line, `#` comments)
    ///
    /// Finding no keys at all is an error: the service cannot start without
    /// at least one.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.gemini.base_url.starts_with("http://")
            && !config.gemini.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.gemini.base_url
            )));
        }

        if config.gemini.model.trim().is_empty() {
            return Err(common::Error::Config("model must not be empty".into()));
        }

        if config.gemini.attempt_timeout_secs == 0 {
            return Err(common::Error::Config(
                "attempt_timeout_secs must be greater than 0".into(),
            ));
        }

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        config.gemini.api_keys = resolve_api_keys(config.gemini.api_keys_file.as_deref())?;
        if config.gemini.api_keys.is_empty() {
            return Err(common::Error::MissingCredentials);
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("maas-web.toml")
    }
}

/// Env var takes precedence over the keys file.
fn resolve_api_keys(keys_file: Option<&Path>) -> common::Result<Vec<Secret<String>>> {
    if let Ok(raw) = std::env::var(API_KEYS_ENV) {
        return Ok(raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(Secret::from)
            .collect());
    }

    let Some(keys_file) = keys_file else {
        return Ok(Vec::new());
    };
    let contents = std::fs::read_to_string(keys_file).map_err(|e| {
        common::Error::Config(format!(
            "failed to read api_keys_file {}: {e}",
            keys_file.display()
        ))
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Secret::from)
        .collect())
}
