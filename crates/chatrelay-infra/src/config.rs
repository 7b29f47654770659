//! Configuration loader for chatrelay.
//!
//! Reads `config.toml` (from `--config` or the data directory) into
//! [`RelayConfig`], falling back to defaults when the file is missing or
//! malformed. Environment overrides are applied on top.

use std::path::{Path, PathBuf};

use chatrelay_types::config::{HistoryBackend, RelayConfig};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "CHATRELAY_DATA_DIR";

/// Data directory: `$CHATRELAY_DATA_DIR`, else `~/.chatrelay`, else `./.chatrelay`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chatrelay")
}

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// No file at the path; defaults in effect.
    Missing,
    /// The file could not be read or parsed; defaults in effect.
    Invalid(String),
}

/// Result of [`load_relay_config`].
///
/// Loading happens before the tracing subscriber exists (the config picks
/// the log level), so the outcome is carried here and reported by
/// [`LoadedConfig::log_outcome`] once logging is up.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RelayConfig,
    pub path: PathBuf,
    pub source: ConfigSource,
}

impl LoadedConfig {
    pub fn log_outcome(&self) {
        match &self.source {
            ConfigSource::File => {
                tracing::info!("Loaded configuration from {}", self.path.display());
            }
            ConfigSource::Missing => {
                tracing::debug!("No config file at {}, using defaults", self.path.display());
            }
            ConfigSource::Invalid(err) => {
                tracing::warn!("Failed to load {}: {err}, using defaults", self.path.display());
            }
        }
    }
}

/// Load configuration from `path`.
///
/// A missing, unreadable or unparsable file yields [`RelayConfig::default()`];
/// the reason is recorded in [`LoadedConfig::source`].
pub async fn load_relay_config(path: &Path) -> LoadedConfig {
    let loaded = |config, source| LoadedConfig {
        config,
        path: path.to_path_buf(),
        source,
    };

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return loaded(RelayConfig::default(), ConfigSource::Missing);
        }
        Err(err) => {
            return loaded(RelayConfig::default(), ConfigSource::Invalid(err.to_string()));
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(config) => loaded(config, ConfigSource::File),
        Err(err) => loaded(RelayConfig::default(), ConfigSource::Invalid(err.to_string())),
    }
}

/// Apply environment overrides on top of file configuration.
///
/// `lookup` is `std::env::var` in production. Recognized variables:
/// `OPENAI_BASE_URL`, `DEFAULT_MODEL`, `CHATRELAY_HISTORY_BACKEND`
/// (`sqlite`/`memory`), `CHATRELAY_DATABASE_URL`, `APP_NAME` and `DEBUG`
/// (`true`/`1`/`yes`, case-insensitive). Blank values are ignored; an
/// unknown backend name is logged and ignored.
pub fn apply_env_overrides<F>(mut config: RelayConfig, lookup: F) -> RelayConfig
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get("OPENAI_BASE_URL") {
        config.provider.base_url = url;
    }
    if let Some(model) = get("DEFAULT_MODEL") {
        config.provider.default_model = model;
    }
    if let Some(backend) = get("CHATRELAY_HISTORY_BACKEND") {
        match backend.trim().parse::<HistoryBackend>() {
            Ok(backend) => config.history.backend = backend,
            Err(e) => tracing::warn!("Ignoring CHATRELAY_HISTORY_BACKEND: {e}"),
        }
    }
    if let Some(url) = get("CHATRELAY_DATABASE_URL") {
        config.history.database_url = Some(url);
    }
    if let Some(name) = get("APP_NAME") {
        config.app_name = name;
    }
    if let Some(debug) = get("DEBUG") {
        config.debug = matches!(debug.trim().to_lowercase().as_str(), "true" | "1" | "yes");
    }
    config
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn load_relay_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let loaded = load_relay_config(&tmp.path().join("config.toml")).await;
        assert_eq!(loaded.source, ConfigSource::Missing);
        assert_eq!(loaded.config.provider.default_model, "qwen-plus");
        assert_eq!(loaded.config.server.port, 8000);
    }

    #[tokio::test]
    async fn load_relay_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
app_name = "Support Desk"

[server]
port = 9100

[history]
backend = "memory"
max_turns = 8
"#,
        )
        .await
        .unwrap();

        let loaded = load_relay_config(&config_path).await;
        assert_eq!(loaded.source, ConfigSource::File);
        let config = loaded.config;
        assert_eq!(config.app_name, "Support Desk");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.history.backend, HistoryBackend::Memory);
        assert_eq!(config.history.max_turns, 8);
        assert_eq!(config.provider.default_max_tokens, 2000);
    }

    #[tokio::test]
    async fn load_relay_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let loaded = load_relay_config(&config_path).await;
        assert!(matches!(loaded.source, ConfigSource::Invalid(_)));
        assert_eq!(loaded.config.app_name, "Chat Relay");
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let config = apply_env_overrides(
            RelayConfig::default(),
            env(&[
                ("OPENAI_BASE_URL", "http://localhost:11434/v1"),
                ("DEFAULT_MODEL", "qwen-max"),
                ("CHATRELAY_HISTORY_BACKEND", "Memory"),
                ("CHATRELAY_DATABASE_URL", "sqlite:///var/lib/relay/history.db"),
                ("APP_NAME", "Edge Relay"),
                ("DEBUG", "True"),
            ]),
        );

        assert_eq!(config.provider.base_url, "http://localhost:11434/v1");
        assert_eq!(config.provider.default_model, "qwen-max");
        assert_eq!(config.history.backend, HistoryBackend::Memory);
        assert_eq!(
            config.history.database_url.as_deref(),
            Some("sqlite:///var/lib/relay/history.db")
        );
        assert_eq!(config.app_name, "Edge Relay");
        assert!(config.debug);
    }

    #[test]
    fn env_overrides_ignore_blank_and_absent_values() {
        let config = apply_env_overrides(
            RelayConfig::default(),
            env(&[
                ("DEFAULT_MODEL", "  "),
                ("DEBUG", "off"),
                ("CHATRELAY_HISTORY_BACKEND", "redis"),
            ]),
        );

        assert_eq!(config.provider.default_model, "qwen-plus");
        assert_eq!(config.history.backend, HistoryBackend::Sqlite);
        assert!(config.history.database_url.is_none());
        assert!(!config.debug);
    }
}
