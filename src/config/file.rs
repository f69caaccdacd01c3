//! Optional TOML configuration file
//!
//! Every section and key is optional; missing values fall back to the
//! built-in defaults and may still be overridden by environment variables.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [llm]
//! base_url = "https://api.groq.com/openai/v1"
//! api_key_env = "GROQ_API_KEY"
//! default_model = "llama3-8b-8192"
//! temperature = 0.3
//! fallback_models = ["llama3-8b-8192", "llama-3.1-8b-instant"]
//! timeout_secs = 60
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ConfigError;

/// Root of the configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub llm: LlmSection,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig = toml::from_str(content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

/// Upstream model provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSection {
    /// OpenAI-compatible API root
    #[serde(default)]
    pub base_url: Option<String>,

    /// Name of the environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Model used when a request does not name one
    #[serde(default)]
    pub default_model: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    /// Ordered candidates for the non-streaming endpoint
    #[serde(default)]
    pub fallback_models: Option<Vec<String>>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}
