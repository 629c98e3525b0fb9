//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the bot looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SECRET_SANTA_CONFIG_PATH";
const DEFAULT_SEND_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_JOIN_BUTTON_LABEL: &str = "Join";
const DEFAULT_MAX_CURRENCY_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Upper bound for a single outbound message request.
    pub send_timeout: Duration,
    /// Label of the inline button that joins a registration.
    pub join_button_label: String,
    /// Longest accepted currency code in `/start <currency> <amount>`.
    pub max_currency_len: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        send_timeout_ms = app_config.send_timeout.as_millis() as u64,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            send_timeout: Duration::from_millis(DEFAULT_SEND_TIMEOUT_MS),
            join_button_label: DEFAULT_JOIN_BUTTON_LABEL.to_owned(),
            max_currency_len: DEFAULT_MAX_CURRENCY_LEN,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    send_timeout_ms: Option<u64>,
    join_button_label: Option<String>,
    max_currency_len: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            send_timeout: value
                .send_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.send_timeout),
            join_button_label: value
                .join_button_label
                .filter(|label| !label.trim().is_empty())
                .unwrap_or(defaults.join_button_label),
            max_currency_len: value
                .max_currency_len
                .filter(|len| *len > 0)
                .unwrap_or(defaults.max_currency_len),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let raw: RawConfig = serde_json::from_str(r#"{"send_timeout_ms": 1500}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.send_timeout, Duration::from_millis(1500));
        assert_eq!(config.join_button_label, "Join");
        assert_eq!(config.max_currency_len, 8);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"send_timeout_ms": 0, "join_button_label": "  ", "max_currency_len": 0}"#,
        )
        .unwrap();
        assert_eq!(AppConfig::from(raw), AppConfig::default());
    }
}
