//! Builder for configuring pipeline instances

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{OutputPolicy, Pipeline, PipelineConfig, PipelineMetrics};
use crate::cache::{CacheConfig, CachingEmbedder, SemanticCache};
use crate::config::{Config, EmbedderKind};
use crate::embed::HashingEmbedder;
use crate::guard::{SafetyGate, SafetyPatterns, TextCheck};
use crate::prompt::{PromptLibrary, PromptTemplate, default_template};
use crate::providers::OpenAiCompatClient;
use crate::router::{ComplexityClassifier, ComplexityThresholds, Router, RouterConfig, TierConfig};
use crate::traits::{Embedder, GenerationBackend};
use crate::{HuginnError, Result};

/// Variables the pipeline can supply to a prompt template.
const PIPELINE_VARIABLES: [&str; 2] = ["query", "context"];

/// Main entry point for creating pipeline instances.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring the pipeline.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

/// Builder for configuring pipeline instances.
///
/// Only a generation backend is required; everything else has a default.
pub struct HuginnBuilder {
    cache: CacheConfig,
    thresholds: ComplexityThresholds,
    router: RouterConfig,
    patterns: SafetyPatterns,
    custom_input: Vec<Arc<dyn TextCheck>>,
    custom_output: Vec<Arc<dyn TextCheck>>,
    pipeline: PipelineConfig,
    template: Option<PromptTemplate>,
    embedder: Option<Arc<dyn Embedder>>,
    memoize_embeddings: bool,
    backend: Option<Arc<dyn GenerationBackend>>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            cache: CacheConfig::default(),
            thresholds: ComplexityThresholds::default(),
            router: RouterConfig::default(),
            patterns: SafetyPatterns::default(),
            custom_input: Vec::new(),
            custom_output: Vec::new(),
            pipeline: PipelineConfig::default(),
            template: None,
            embedder: None,
            memoize_embeddings: true,
            backend: None,
            metrics: None,
        }
    }

    /// Start from a loaded [`Config`].
    ///
    /// Creates an [`OpenAiCompatClient`] backend when `backend.base_url` is
    /// set, and a remote embedder when `embedder.kind = "remote"`. Loads the
    /// prompt library when `pipeline.templates_path` is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::new()
            .cache_config(config.cache.to_cache_config())
            .thresholds(config.classifier.clone())
            .router_config(config.router.clone())
            .safety_patterns(config.guard.clone())
            .pipeline_config(config.pipeline.to_pipeline_config())
            .memoize_embeddings(config.embedder.memoize);

        let api_key = config.backend.api_key();
        let client = |base_url: &str| -> Result<OpenAiCompatClient> {
            let client = OpenAiCompatClient::with_timeout(
                base_url,
                Duration::from_secs(config.backend.timeout_secs),
            )?
            .embedding_model(&config.embedder.model)
            .max_input_chars(config.embedder.max_input_chars);
            Ok(match &api_key {
                Some(key) => client.api_key(key),
                None => client,
            })
        };

        if let Some(base_url) = &config.backend.base_url {
            builder = builder.backend(Arc::new(client(base_url)?));
        }

        builder = match config.embedder.kind {
            EmbedderKind::Hashing => builder.embedder(Arc::new(
                HashingEmbedder::with_dimensions(config.embedder.dimensions)
                    .max_input_chars(config.embedder.max_input_chars),
            )),
            EmbedderKind::Remote => {
                let base_url = config
                    .embedder
                    .base_url
                    .as_deref()
                    .or(config.backend.base_url.as_deref())
                    .ok_or_else(|| {
                        HuginnError::Configuration(
                            "remote embedder needs embedder.base_url or backend.base_url"
                                .to_string(),
                        )
                    })?;
                builder.embedder(Arc::new(client(base_url)?))
            }
        };

        if let Some(path) = &config.pipeline.templates_path {
            let library = PromptLibrary::from_file(path)?;
            let name = config
                .pipeline
                .template
                .as_deref()
                .unwrap_or(crate::prompt::DEFAULT_TEMPLATE);
            builder = builder.template(library.get(name)?.clone());
        }

        Ok(builder)
    }

    /// Set the semantic cache configuration.
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Set the cache similarity threshold.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.cache.similarity_threshold = threshold;
        self
    }

    /// Set the cache capacity.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache.capacity = capacity;
        self
    }

    /// Set the cache entry time-to-live.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl = ttl;
        self
    }

    /// Set the complexity cutoffs.
    pub fn thresholds(mut self, thresholds: ComplexityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set both routing tiers.
    pub fn router_config(mut self, config: RouterConfig) -> Self {
        self.router = config;
        self
    }

    /// Set the fast tier.
    pub fn fast_tier(mut self, tier: TierConfig) -> Self {
        self.router.fast = tier;
        self
    }

    /// Set the smart tier.
    pub fn smart_tier(mut self, tier: TierConfig) -> Self {
        self.router.smart = tier;
        self
    }

    /// Set the safety gate rules.
    pub fn safety_patterns(mut self, patterns: SafetyPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    /// Restrict queries to these topic keywords.
    pub fn allowed_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.allowed_topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Require JSON replies carrying `fields`; see [`SafetyPatterns::json_output`].
    pub fn json_output<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.json_output = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Add a custom input check after the built-in ones.
    pub fn custom_input_check(mut self, check: Arc<dyn TextCheck>) -> Self {
        self.custom_input.push(check);
        self
    }

    /// Add a custom output check after the built-in ones.
    pub fn custom_output_check(mut self, check: Arc<dyn TextCheck>) -> Self {
        self.custom_output.push(check);
        self
    }

    /// Set all pipeline knobs at once.
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }

    /// Set the generation timeout.
    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline.generation_timeout = timeout;
        self
    }

    /// Set the worker count for batch processing.
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.pipeline.max_concurrent = max;
        self
    }

    /// Set what happens to flagged output.
    pub fn output_policy(mut self, policy: OutputPolicy) -> Self {
        self.pipeline.output_policy = policy;
        self
    }

    /// Set the canned reply for rejected queries.
    pub fn rejection_message(mut self, message: impl Into<String>) -> Self {
        self.pipeline.rejection_message = message.into();
        self
    }

    /// Set the sampling temperature passed to the backend.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.pipeline.temperature = Some(temperature);
        self
    }

    /// Set the prompt template (default: [`default_template`]).
    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Set the embedder (default: [`HashingEmbedder`]).
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Wrap the embedder in a [`CachingEmbedder`] (default: on).
    pub fn memoize_embeddings(mut self, enabled: bool) -> Self {
        self.memoize_embeddings = enabled;
        self
    }

    /// Set the generation backend. Required.
    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Share an existing metrics instance.
    pub fn metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the pipeline.
    ///
    /// Fails with [`HuginnError::NoBackend`] without a backend, and with
    /// [`HuginnError::Configuration`] for invalid rules, thresholds or
    /// template variables.
    pub fn build(self) -> Result<Pipeline> {
        let backend = self.backend.ok_or(HuginnError::NoBackend)?;

        if !(self.cache.similarity_threshold > 0.0 && self.cache.similarity_threshold <= 1.0) {
            return Err(HuginnError::Configuration(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.cache.similarity_threshold
            )));
        }
        if self.pipeline.max_concurrent == 0 {
            return Err(HuginnError::Configuration(
                "max_concurrent must be at least 1".to_string(),
            ));
        }

        let template = self.template.unwrap_or_else(default_template);
        let unknown: Vec<&str> = template
            .input_variables
            .iter()
            .map(String::as_str)
            .filter(|v| !PIPELINE_VARIABLES.contains(v))
            .collect();
        if !unknown.is_empty() {
            return Err(HuginnError::Configuration(format!(
                "template '{}' uses variables the pipeline cannot supply: {}",
                template.name,
                unknown.join(", ")
            )));
        }

        let mut gate = SafetyGate::new(self.patterns)?;
        for check in self.custom_input {
            gate = gate.custom_input(check);
        }
        for check in self.custom_output {
            gate = gate.custom_output(check);
        }

        let embedder = self
            .embedder
            .unwrap_or_else(|| Arc::new(HashingEmbedder::new()));
        let embedder: Arc<dyn Embedder> = if self.memoize_embeddings {
            Arc::new(CachingEmbedder::new(embedder))
        } else {
            embedder
        };

        let metrics = self.metrics.unwrap_or_default();
        let router = Router::new(self.router).with_metrics(Arc::clone(&metrics));

        info!(
            backend = backend.name(),
            embedder = embedder.name(),
            threshold = self.cache.similarity_threshold,
            capacity = self.cache.capacity,
            template = %template.name,
            "pipeline built"
        );

        Ok(Pipeline {
            config: self.pipeline,
            gate,
            cache: SemanticCache::new(self.cache, embedder),
            classifier: ComplexityClassifier::new(self.thresholds),
            router,
            template,
            backend,
            metrics,
        })
    }
}
