//! TOML configuration for the cat picker backend
//!
//! Every field has a default, so an empty or missing file is valid. Secrets
//! come from the environment by default.
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! port = 8000
//!
//! [assistant]
//! model = "gpt-4o-mini"
//! run_instructions = "Please address the user as Jane Doe."
//!
//! [cats]
//! timeout_secs = 15
//!
//! [run]
//! poll_interval_ms = 500
//! timeout_secs = 60
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;


pub const CONFIG_FILE_NAME: &str = "catpicker.toml";

pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful assistant that helps users pick the most suitable cat picture. \
     Use the search_cats tool to find cat images matching the user's wishes.";

/// Root configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub cats: CatApiConfig,

    #[serde(default)]
    pub run: RunConfig,
}

/// HTTP listener settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Remote assistant service settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AssistantConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// API key. Read from `OPENAI_API_KEY` when absent from the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_assistant_name")]
    pub name: String,

    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Extra instructions sent with every run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_instructions: Option<String>,

    /// Reuse this pre-provisioned assistant instead of creating one per request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key: None,
            model: default_model(),
            name: default_assistant_name(),
            instructions: default_instructions(),
            run_instructions: None,
            assistant_id: None,
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Cat image service settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CatApiConfig {
    #[serde(default = "default_cat_api_base_url")]
    pub base_url: String,

    /// API key. Read from `CAT_API_KEY` when absent from the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CatApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_cat_api_base_url(),
            api_key: None,
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Bounds of the run observation loop
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_run_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_polls: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_run_timeout_secs(),
            max_polls: None,
        }
    }
}

impl RunConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_assistant_name() -> String {
    "Cat Picker".to_string()
}

fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.to_string()
}

fn default_cat_api_base_url() -> String {
    "https://api.thecatapi.com/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_run_timeout_secs() -> u64 {
    60
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error occurred while reading the config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// A value is present but unusable
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    /// A required value is missing
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
}

impl Config {
    /// Load configuration and apply environment overrides.
    ///
    /// Searches `./catpicker.toml`, then `~/.config/catpicker/catpicker.toml`,
    /// and falls back to defaults when neither exists.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::locate() {
            Some(path) => Self::load_from(&path)?,
            None => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load a specific file without environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    fn locate() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        let user = dirs::home_dir()?
            .join(".config")
            .join("catpicker")
            .join(CONFIG_FILE_NAME);
        user.exists().then_some(user)
    }

    /// Apply environment variable overrides
    ///
    /// - `OPENAI_API_KEY` → `assistant.api_key`
    /// - `OPENAI_BASE_URL` → `assistant.base_url`
    /// - `CATPICKER_MODEL` → `assistant.model`
    /// - `CATPICKER_ASSISTANT_ID` → `assistant.assistant_id`
    /// - `CAT_API_KEY` → `cats.api_key`
    /// - `CATPICKER_HOST` / `CATPICKER_PORT` → `server`
    /// - `CATPICKER_RUN_TIMEOUT_SECS` → `run.timeout_secs`
    ///
    /// Invalid values are logged as warnings and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(api_key) = non_empty_var("OPENAI_API_KEY") {
            self.assistant.api_key = Some(api_key);
        }
        if let Some(base_url) = non_empty_var("OPENAI_BASE_URL") {
            self.assistant.base_url = base_url;
        }
        if let Some(model) = non_empty_var("CATPICKER_MODEL") {
            self.assistant.model = model;
        }
        if let Some(assistant_id) = non_empty_var("CATPICKER_ASSISTANT_ID") {
            self.assistant.assistant_id = Some(assistant_id);
        }
        if let Some(api_key) = non_empty_var("CAT_API_KEY") {
            self.cats.api_key = Some(api_key);
        }
        if let Some(host) = non_empty_var("CATPICKER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty_var("CATPICKER_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid CATPICKER_PORT value: {}", port),
            }
        }
        if let Some(timeout) = non_empty_var("CATPICKER_RUN_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => self.run.timeout_secs = secs,
                _ => tracing::warn!(
                    "Ignoring invalid CATPICKER_RUN_TIMEOUT_SECS value: {}",
                    timeout
                ),
            }
        }
    }

    /// Fail fast on settings the server cannot run without.
    ///
    /// A missing cat API key is not fatal: tool calls degrade to an error
    /// payload instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .assistant
            .api_key
            .as_deref()
            .map_or(true, |k| k.trim().is_empty())
        {
            return Err(ConfigError::Missing("assistant.api_key (OPENAI_API_KEY)"));
        }
        if self.run.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "run.poll_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.run.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "run.timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.cats.api_key.is_none() {
            tracing::warn!("CAT_API_KEY is not set; search_cats calls will report an error");
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
