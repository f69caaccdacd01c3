//! Application configuration

pub mod file;
pub mod prompts;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use file::FileConfig;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_FALLBACK_MODELS: [&str; 4] = [
    "llama3-8b-8192",
    "llama3-70b-8192",
    "mixtral-8x7b-32768",
    "llama-3.1-8b-instant",
];

/// Server configuration, built once at startup and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    /// Name of the variable the key was read from, used in error messages
    pub api_key_env: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub default_model: String,
    pub temperature: f32,
    pub fallback_models: Vec<String>,
    pub timeout_secs: u64,
}

impl Config {
    /// Load the optional file named by `TOMONI_CONFIG`, then apply the
    /// process environment on top of it.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match env::var("TOMONI_CONFIG") {
            Ok(path) => FileConfig::from_file(&PathBuf::from(path))?,
            Err(_) => FileConfig::default(),
        };
        Self::from_sources(file, |key| env::var(key).ok())
    }

    /// Merge a parsed file with a variable lookup. Variables win.
    pub fn from_sources<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm = file.llm;

        let api_key_env = llm
            .api_key_env
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = lookup(&api_key_env).filter(|key| !key.trim().is_empty());

        let fallback_models = match lookup("TOMONI_FALLBACK_MODELS") {
            Some(list) => parse_model_list(&list),
            None => llm.fallback_models.unwrap_or_else(|| {
                DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect()
            }),
        };

        let config = Self {
            host: lookup("HOST")
                .or(file.server.host)
                .unwrap_or_else(|| DEFAULT_HOST.into()),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .or(file.server.port)
                .unwrap_or(DEFAULT_PORT),
            base_url: lookup("GROQ_BASE_URL")
                .or(llm.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
            api_key_env,
            api_key,
            default_model: lookup("TOMONI_DEFAULT_MODEL")
                .or(llm.default_model)
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            temperature: lookup("TOMONI_TEMPERATURE")
                .and_then(|t| t.parse().ok())
                .or(llm.temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
            fallback_models,
            timeout_secs: lookup("TOMONI_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .or(llm.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Validation(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Error text reported when the credential is absent.
    pub fn missing_key_message(&self) -> String {
        format!("{} missing", self.api_key_env)
    }
}

fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
