//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use crate::Result;
use crate::error::Error;

/// Environment variable holding the store base address
pub const STORE_URL_ENV: &str = "STORE_NAME";

/// Environment variable holding the completion API credential
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

pub const MODEL_ENV: &str = "SHOPKEEP_MODEL";
pub const API_BASE_URL_ENV: &str = "SHOPKEEP_API_BASE_URL";

/// Path of the MCP endpoint relative to the store base address
const MCP_PATH: &str = "api/mcp";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base address of the store that hosts the MCP server
    #[serde(default)]
    pub store_url: String,

    /// Credential for the chat completions API
    #[serde(default)]
    pub api_key: String,

    /// OpenAI-compatible API base (must end with a slash to be joined)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum model round-trips per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Timeout applied to every HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai/".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_iterations() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: String::new(),
            api_key: String::new(),
            api_base_url: default_api_base_url(),
            model: default_model(),
            max_iterations: default_max_iterations(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Override fields from environment variables found by `lookup`.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// clobber the config file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(STORE_URL_ENV) {
            self.store_url = v;
        }
        if let Some(v) = get(API_KEY_ENV) {
            self.api_key = v;
        }
        if let Some(v) = get(MODEL_ENV) {
            self.model = v;
        }
        if let Some(v) = get(API_BASE_URL_ENV) {
            self.api_base_url = v;
        }
    }

    /// Check that everything needed to start a session is present.
    pub fn validate(&self) -> Result<()> {
        if self.store_url.trim().is_empty() {
            return Err(Error::Config(format!(
                "store address not set (export {} or set \"store_url\" in {:?})",
                STORE_URL_ENV,
                config_path()
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "API key not set (export {} or set \"api_key\" in {:?})",
                API_KEY_ENV,
                config_path()
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Address of the MCP endpoint: `{store_url}/api/mcp`.
    pub fn mcp_endpoint(&self) -> Result<Url> {
        let mut base = self.store_url.trim().trim_end_matches('/').to_string();
        base.push('/');
        Ok(Url::parse(&base)?.join(MCP_PATH)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".shopkeep")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration: defaults, then the optional config file, then the
/// process environment.
pub fn load() -> Result<Config> {
    let mut config = load_file(&config_path())?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

/// Read a config file, falling back to defaults when it does not exist.
pub fn load_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {:?}: {}", path, e)))?;
    Ok(config)
}
