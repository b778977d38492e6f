//! Configuration management for cpp-perf-audit
//!
//! Tunables live in ~/.config/cpp-perf-audit/config.json. The API key is
//! never written there; it always comes from the environment.

use crate::batch::{BatchBudget, CHARS_PER_TOKEN_ESTIMATE, MAX_TOKENS_PER_BATCH};
use crate::llm::error::API_KEY_ENV;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";
pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
/// Max completion length per call
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub api_url: String,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    pub max_tokens_per_batch: usize,
    pub chars_per_token: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_tokens_per_batch: MAX_TOKENS_PER_BATCH,
            chars_per_token: CHARS_PER_TOKEN_ESTIMATE,
        }
    }
}

impl Config {
    /// Replace empty or zero values with defaults
    fn sanitize(&mut self) {
        let defaults = Config::default();
        if self.model.trim().is_empty() {
            self.model = defaults.model;
        }
        if self.api_url.trim().is_empty() {
            self.api_url = defaults.api_url;
        }
        if self.max_tokens == 0 {
            self.max_tokens = defaults.max_tokens;
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = defaults.request_timeout_secs;
        }
        if self.max_tokens_per_batch == 0 {
            self.max_tokens_per_batch = defaults.max_tokens_per_batch;
        }
        if self.chars_per_token == 0 {
            self.chars_per_token = defaults.chars_per_token;
        }
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cpp-perf-audit"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return defaults.
    ///
    /// A corrupt file is moved aside to `config.json.corrupt` so the next
    /// run starts clean.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                if let Ok(content) = fs::read_to_string(&path) {
                    preserve_corrupt_config(&path, &content);
                }
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "config file could not be loaded; using defaults"
                );
                Self::default()
            }
        }
    }

    /// Load and sanitize a config file
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.sanitize();
        Ok(config)
    }

    /// The service credential from the environment; blank counts as absent.
    pub fn api_key() -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    pub fn batch_budget(&self) -> BatchBudget {
        BatchBudget {
            max_tokens_per_batch: self.max_tokens_per_batch,
            chars_per_token: self.chars_per_token,
        }
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}
