use config::{Config as ConfigLoader, ConfigError, Environment, File};
use pdfchat_graph::OrchestratorConfig;
use serde::Deserialize;
use std::path::Path;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,

    // Secret (from ENV only)
    #[serde(default)]
    pub google_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    /// Document characters embedded in each prompt
    pub excerpt_chars: usize,
}

impl From<&LlmConfig> for OrchestratorConfig {
    fn from(config: &LlmConfig) -> Self {
        OrchestratorConfig::new(config.model.clone())
            .with_temperature(config.temperature)
            .with_excerpt_chars(config.excerpt_chars)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. built-in defaults
    /// 2. config/default.toml
    /// 3. config/{ENV}.toml (if ENV is set)
    /// 4. `PDFCHAT_<SECTION>__<KEY>` environment variables
    ///
    /// The LLM credential comes from `GOOGLE_API_KEY` only; startup fails
    /// without it.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("PDFCHAT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;
        cfg.google_api_key = require_api_key(std::env::var(API_KEY_VAR).ok())?;

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing). The credential
    /// is left empty.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        ConfigLoader::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.max_upload_bytes", 20 * 1024 * 1024)?
            .set_default("cors.enabled", false)?
            .set_default("cors.origins", vec!["*"])?
            .set_default("llm.model", pdfchat_graph::config::DEFAULT_MODEL)?
            .set_default("llm.base_url", pdfchat_llm::GEMINI_OPENAI_BASE)?
            .set_default("llm.temperature", 0.0)?
            .set_default("llm.excerpt_chars", 3000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")
    }
}

fn require_api_key(value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ConfigError::Message(format!(
            "{} environment variable is required",
            API_KEY_VAR
        ))),
    }
}
