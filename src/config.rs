// file: src/config.rs
// description: application configuration management with toml and environment layering
// reference: https://docs.rs/config

use crate::error::{Result, SyncError};
use dotenvy::dotenv;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub timeout_secs: f64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub page_size: usize,
    /// Store vectors under this name instead of the collection's default vector.
    pub vector_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Hash,
    Http,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub dimensions: usize,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub root: PathBuf,
    /// 0 = root only, 1 = root and its immediate subdirectories.
    pub max_depth: usize,
    pub extensions: Vec<String>,
    pub section_keywords: Vec<String>,
    pub default_trigger: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub match_dir: PathBuf,
    pub match_file_name: String,
    pub template_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "fabric_patterns".to_string(),
            timeout_secs: 10.0,
            max_retries: 3,
            retry_delay_ms: 1000,
            page_size: 256,
            vector_name: None,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Hash,
            dimensions: 384,
            endpoint: None,
            model: None,
            api_key: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./patterns"),
            max_depth: 1,
            extensions: vec!["md".to_string()],
            section_keywords: vec![
                "Identity".to_string(),
                "Purpose".to_string(),
                "Task".to_string(),
                "Goal".to_string(),
            ],
            default_trigger: ";;fab".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            match_dir: PathBuf::from("./espanso/match"),
            match_file_name: "fabric_patterns.yml".to_string(),
            template_dir: None,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl OutputConfig {
    pub fn match_file_path(&self) -> PathBuf {
        self.match_dir.join(&self.match_file_name)
    }
}

impl Config {
    /// Loads built-in defaults, then the TOML file, then `PATTERN_SYNC__*`
    /// environment variables. A missing file is only an error when the path
    /// was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let defaults = config::Config::try_from(&Self::default_config())
            .map_err(|e| SyncError::Configuration(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder
                .add_source(config::File::from(Path::new("config/default.toml")).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PATTERN_SYNC")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| SyncError::Configuration(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| SyncError::Configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            store: StoreConfig::default(),
            embedding: EmbeddingConfig::default(),
            source: SourceConfig::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.store.url).map_err(|e| {
            SyncError::Configuration(format!("Invalid store URL {}: {}", self.store.url, e))
        })?;
        if url.host_str().is_none() {
            return Err(SyncError::Configuration(format!(
                "Invalid store URL {}: missing host",
                self.store.url
            )));
        }

        if self.store.collection.trim().is_empty() {
            return Err(SyncError::Configuration(
                "collection name cannot be empty".to_string(),
            ));
        }

        if self.store.retry_delay_ms == 0 {
            return Err(SyncError::Configuration(
                "retry_delay_ms must be greater than 0".to_string(),
            ));
        }

        if !(self.store.timeout_secs.is_finite() && self.store.timeout_secs > 0.0) {
            return Err(SyncError::Configuration(format!(
                "timeout_secs must be greater than 0, got {}",
                self.store.timeout_secs
            )));
        }

        if self.store.page_size == 0 {
            return Err(SyncError::Configuration(
                "page_size must be greater than 0".to_string(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(SyncError::Configuration(
                "embedding dimensions must be greater than 0".to_string(),
            ));
        }

        if self.embedding.provider == EmbeddingProviderKind::Http
            && (self.embedding.endpoint.is_none() || self.embedding.model.is_none())
        {
            return Err(SyncError::Configuration(
                "the http embedding provider needs both endpoint and model".to_string(),
            ));
        }

        if self.source.default_trigger.trim().is_empty() {
            return Err(SyncError::Configuration(
                "the default trigger cannot be empty".to_string(),
            ));
        }

        if self.source.extensions.is_empty() {
            return Err(SyncError::Configuration(
                "at least one source extension is required".to_string(),
            ));
        }

        if self.output.match_file_name.trim().is_empty() {
            return Err(SyncError::Configuration(
                "match_file_name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
