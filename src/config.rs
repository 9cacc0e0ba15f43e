use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ClientConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_ask_timeout_ms")]
    pub ask_timeout_ms: u64,
    #[serde(default = "default_models_timeout_ms")]
    pub models_timeout_ms: u64,
    #[serde(default = "default_health_timeout_ms")]
    pub health_timeout_ms: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_tick_rate")]
    pub tick_rate_fps: f64,
}

fn default_api_base() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_ask_timeout_ms() -> u64 {
    120_000
}

fn default_models_timeout_ms() -> u64 {
    10_000
}

fn default_health_timeout_ms() -> u64 {
    5_000
}

fn default_retry_count() -> u32 {
    1
}

fn default_model() -> String {
    "google/gemma-2-9b-it".to_string()
}

fn default_tick_rate() -> f64 {
    30.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            ask_timeout_ms: default_ask_timeout_ms(),
            models_timeout_ms: default_models_timeout_ms(),
            health_timeout_ms: default_health_timeout_ms(),
            retry_count: default_retry_count(),
            default_model: default_model(),
            tick_rate_fps: default_tick_rate(),
        }
    }
}

impl AppConfig {
    /// Settings for [`crate::api::AskClient`].
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_base: self.api_base.clone(),
            ask_timeout: Duration::from_millis(self.ask_timeout_ms),
            models_timeout: Duration::from_millis(self.models_timeout_ms),
            health_timeout: Duration::from_millis(self.health_timeout_ms),
            retry_count: self.retry_count,
        }
    }

    /// Apply `NLPASK_API_BASE` / `NLPASK_MODEL` overrides.
    fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_base) = get("NLPASK_API_BASE") {
            self.api_base = api_base;
        }
        if let Some(model) = get("NLPASK_MODEL") {
            self.default_model = model;
        }
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config/nlpask"))
}

fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Return candidate .env paths in priority order.
fn env_file_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = config_dir() {
        paths.push(dir.join(".env"));
    }
    paths.push(PathBuf::from(".env"));
    paths
}

/// Load .env files. Earlier files win because dotenvy does not overwrite
/// variables that are already set.
pub fn load_env_files() {
    for path in env_file_paths() {
        if path.exists()
            && let Err(e) = dotenvy::from_path(&path)
        {
            tracing::warn!(path = %path.display(), "failed to load .env file: {e}");
        }
    }
}

/// Parse a config file, falling back to defaults for missing keys.
pub fn parse_config(contents: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(contents)
}

/// Load `~/.config/nlpask/config.toml` and apply environment overrides.
pub fn load_config() -> AppConfig {
    load_env_files();

    let mut config = match config_path().map(fs::read_to_string) {
        Some(Ok(contents)) => parse_config(&contents).unwrap_or_else(|e| {
            tracing::warn!("invalid config.toml, using defaults: {e}");
            AppConfig::default()
        }),
        _ => AppConfig::default(),
    };

    config.apply_env(|name| std::env::var(name).ok().filter(|v| !v.is_empty()));
    config
}
