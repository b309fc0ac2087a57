//! TOML configuration.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (e.g. `--config <path>`)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! Every key has a default, so an empty file is a valid configuration.
//! API keys never live in the file: `backend.api_key_env` names the
//! environment variable to read instead.
//!
//! ```toml
//! [cache]
//! similarity_threshold = 0.85
//! capacity = 10000
//! ttl_secs = 3600
//!
//! [classifier]
//! medium_words = 20
//! high_words = 50
//!
//! [router.fast]
//! model = "gemini-2.5-flash"
//!
//! [pipeline]
//! generation_timeout_secs = 30
//! output_policy = "log"
//!
//! [backend]
//! base_url = "http://localhost:11434/v1"
//! api_key_env = "OPENAI_API_KEY"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::embed::{DEFAULT_DIMENSIONS, DEFAULT_MAX_INPUT_CHARS};
use crate::guard::SafetyPatterns;
use crate::pipeline::{DEFAULT_REJECTION_MESSAGE, OutputPolicy, PipelineConfig};
use crate::providers::openai::DEFAULT_EMBEDDING_MODEL;
use crate::router::{ComplexityThresholds, RouterConfig};
use crate::{HuginnError, Result};

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub classifier: ComplexityThresholds,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub guard: SafetyPatterns,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub embedder: EmbedderSection,
    #[serde(default)]
    pub backend: BackendSection,
}

/// `[cache]`
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_embed_timeout_ms")]
    pub embed_timeout_ms: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            capacity: default_capacity(),
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            embed_timeout_ms: default_embed_timeout_ms(),
        }
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .similarity_threshold(self.similarity_threshold)
            .capacity(self.capacity)
            .ttl(Duration::from_secs(self.ttl_secs))
            .sweep_interval(Duration::from_secs(self.sweep_interval_secs))
            .embed_timeout(Duration::from_millis(self.embed_timeout_ms))
    }
}

fn default_similarity_threshold() -> f32 {
    0.85
}

fn default_capacity() -> usize {
    10_000
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_embed_timeout_ms() -> u64 {
    5_000
}

/// `[pipeline]`
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_rejection_message")]
    pub rejection_message: String,
    #[serde(default)]
    pub output_policy: OutputPolicy,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// JSON prompt library to load instead of the built-in template.
    #[serde(default)]
    pub templates_path: Option<PathBuf>,
    /// Template name within `templates_path`.
    #[serde(default)]
    pub template: Option<String>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            generation_timeout_secs: default_generation_timeout_secs(),
            max_concurrent: default_max_concurrent(),
            rejection_message: default_rejection_message(),
            output_policy: OutputPolicy::default(),
            temperature: None,
            templates_path: None,
            template: None,
        }
    }
}

impl PipelineSection {
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            generation_timeout: Duration::from_secs(self.generation_timeout_secs),
            max_concurrent: self.max_concurrent,
            rejection_message: self.rejection_message.clone(),
            output_policy: self.output_policy,
            temperature: self.temperature,
        }
    }
}

fn default_generation_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    8
}

fn default_rejection_message() -> String {
    DEFAULT_REJECTION_MESSAGE.to_string()
}

/// Which embedder backs the semantic cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Local [`HashingEmbedder`](crate::embed::HashingEmbedder).
    #[default]
    Hashing,
    /// `/embeddings` on an OpenAI-compatible server.
    Remote,
}

/// `[embedder]`
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedderSection {
    #[serde(default)]
    pub kind: EmbedderKind,
    /// Vector size for the hashing embedder.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Model for the remote embedder.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Base URL for the remote embedder; falls back to `backend.base_url`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Memoise embeddings in front of the embedder.
    #[serde(default = "default_memoize")]
    pub memoize: bool,
}

impl Default for EmbedderSection {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::default(),
            dimensions: default_dimensions(),
            max_input_chars: default_max_input_chars(),
            model: default_embedding_model(),
            base_url: None,
            memoize: default_memoize(),
        }
    }
}

fn default_dimensions() -> usize {
    DEFAULT_DIMENSIONS
}

fn default_max_input_chars() -> usize {
    DEFAULT_MAX_INPUT_CHARS
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_memoize() -> bool {
    true
}

/// `[backend]`
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    /// OpenAI-compatible base URL. Without it no backend is configured.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: None,
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BackendSection {
    /// API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?.ok_or_else(|| {
            HuginnError::Configuration(
                "No config file found. Create ~/.huginn/config.toml or /etc/huginn/config.toml"
                    .to_string(),
            )
        })?;
        Self::load_from_file(&path)
    }

    /// Like [`load`](Self::load), but falls back to defaults when no file
    /// exists in the standard locations. An explicit path must exist.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| HuginnError::Configuration(format!("Failed to parse config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path. `Ok(None)` when no standard file exists.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
