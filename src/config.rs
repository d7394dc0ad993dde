use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub listen: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub host: HostConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default = "default_host_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_url: default_host_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле listen обязательно".to_string(),
            ));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "поле listen должно быть корректным адресом host:port".to_string(),
            ));
        }
        if self.poll_interval_ms < 1 {
            return Err(ConfigError::Validation(
                "poll_interval_ms должно быть >= 1".to_string(),
            ));
        }
        if self.host.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "host.base_url не должен быть пустым".to_string(),
            ));
        }
        if !self.host.base_url.starts_with("http://") && !self.host.base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(
                "host.base_url должен начинаться с http:// или https://".to_string(),
            ));
        }
        if self.host.request_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "host.request_timeout_ms должно быть > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_host_base_url() -> String {
    "http://127.0.0.1:57781".to_string()
}

const fn default_request_timeout_ms() -> u64 {
    3000
}
