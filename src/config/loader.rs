//! Configuration loading from disk.

use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CHAT_SERVICE_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern"))
}

/// Replace `${VAR}` and `${VAR:default}` with values from the environment.
///
/// Unset variables without a default expand to the empty string.
pub fn substitute_env<F>(content: &str, lookup: F) -> Cow<'_, str>
where
    F: Fn(&str) -> Option<String>,
{
    env_pattern().replace_all(content, |caps: &Captures<'_>| {
        let spec = &caps[1];
        let (name, default) = match spec.split_once(':') {
            Some((name, default)) => (name, default),
            None => (spec, ""),
        };
        lookup(name).unwrap_or_else(|| default.to_string())
    })
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let expanded = substitute_env(content, |name| std::env::var(name).ok());
    let config: ServiceConfig = toml::from_str(&expanded)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load from `CHAT_SERVICE_CONFIG`, or fall back to defaults plus the
/// well-known environment variables.
pub fn load_from_env() -> Result<ServiceConfig, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        tracing::info!(path = %path, "Loading configuration file");
        return load_config(Path::new(&path));
    }

    let mut config = ServiceConfig::default();
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        config.agent.api_key = key;
    }
    if let Ok(url) = std::env::var(&config.tool_server.url_env_var) {
        config.tool_server.server_url = url;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
