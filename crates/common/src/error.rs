//! Startup and configuration errors

use thiserror::Error;

/// Configuration error shared by the service and its libraries
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No API keys configured: set GEMINI_API_KEYS or gemini.api_keys_file")]
    MissingCredentials,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
