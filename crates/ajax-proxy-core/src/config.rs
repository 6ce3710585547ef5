//! Relay configuration loading.

use std::fs;
use std::path::Path;

use ajax_proxy_types::{ConfigError, RelayConfig};

pub const ENV_ENABLE_CORS: &str = "AJAX_PROXY_ENABLE_CORS";
pub const ENV_ALLOWED_ORIGIN: &str = "AJAX_PROXY_ALLOWED_ORIGIN";
pub const ENV_MAX_REDIRECTS: &str = "AJAX_PROXY_MAX_REDIRECTS";

/// Load and validate a JSON config file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.display().to_string() });
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::from_io_error(&e))?;
    let config: RelayConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?;
    config.check()?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the default config.
pub fn load_config_or_default(path: &Path) -> Result<RelayConfig, ConfigError> {
    match load_config(path) {
        Err(ConfigError::NotFound { path }) => {
            tracing::info!("No relay config at {}, using defaults", path);
            Ok(RelayConfig::default())
        },
        other => other,
    }
}

/// Apply `AJAX_PROXY_*` environment overrides; unparseable values are ignored.
pub fn apply_env_overrides(config: &mut RelayConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides(config: &mut RelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(raw) = lookup(ENV_ENABLE_CORS) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => config.enable_cors = true,
            "0" | "false" | "no" | "off" => config.enable_cors = false,
            _ => tracing::warn!("{} has unrecognized value {:?}, ignoring", ENV_ENABLE_CORS, raw),
        }
    }

    if let Some(raw) = lookup(ENV_ALLOWED_ORIGIN) {
        let origin = raw.trim();
        if origin.is_empty() {
            tracing::warn!("{} is empty, ignoring", ENV_ALLOWED_ORIGIN);
        } else {
            config.allowed_origin = origin.to_string();
        }
    }

    if let Some(raw) = lookup(ENV_MAX_REDIRECTS) {
        match raw.trim().parse::<u32>() {
            Ok(n) => config.max_redirects = n,
            Err(_) => tracing::warn!("{} is not a number, ignoring", ENV_MAX_REDIRECTS),
        }
    }
}
