//! Complexity scoring and tier routing.
//!
//! [`ComplexityClassifier`] turns a query into a [`ComplexityScore`];
//! [`Router`] turns the score into a [`RoutingDecision`] naming the
//! generation tier, model and estimated cost.

pub mod classifier;

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

pub use classifier::{ComplexityClassifier, ComplexityThresholds, estimate_tokens};

use crate::pipeline::PipelineMetrics;
use crate::telemetry;
use crate::types::{ComplexityScore, ComplexityTier, GenerationTier, RoutingDecision};

/// Sampling preset for a tier.
///
/// | preset   | temperature | max tokens |
/// |----------|-------------|------------|
/// | factual  | 0.0         | 500        |
/// | balanced | 0.7         | 1000       |
/// | creative | 1.0         | 1500       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationPreset {
    Factual,
    Balanced,
    Creative,
}

impl GenerationPreset {
    pub fn temperature(self) -> f32 {
        match self {
            Self::Factual => 0.0,
            Self::Balanced => 0.7,
            Self::Creative => 1.0,
        }
    }

    pub fn max_tokens(self) -> usize {
        match self {
            Self::Factual => 500,
            Self::Balanced => 1000,
            Self::Creative => 1500,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Factual => "Deterministic, factual responses",
            Self::Balanced => "Balanced creativity and consistency",
            Self::Creative => "Maximum creativity",
        }
    }
}

/// Model, pricing and sampling for one generation tier.
///
/// In TOML, `preset` fills `temperature` and `max_tokens`; explicit keys
/// override it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "TierSection")]
pub struct TierConfig {
    /// Model identifier sent to the backend.
    pub model: String,
    /// Cost per token in dollars, for estimates only.
    pub cost_per_token: f64,
    /// Completion budget for this tier.
    pub max_tokens: usize,
    /// Sampling temperature; `None` leaves it to the pipeline or backend.
    pub temperature: Option<f32>,
}

#[derive(Deserialize)]
struct TierSection {
    model: String,
    #[serde(default)]
    cost_per_token: f64,
    #[serde(default)]
    preset: Option<GenerationPreset>,
    #[serde(default)]
    max_tokens: Option<usize>,
    #[serde(default)]
    temperature: Option<f32>,
}

impl From<TierSection> for TierConfig {
    fn from(raw: TierSection) -> Self {
        let mut tier = TierConfig::new(raw.model).cost_per_token(raw.cost_per_token);
        if let Some(preset) = raw.preset {
            tier = tier.preset(preset);
        }
        if let Some(max_tokens) = raw.max_tokens {
            tier.max_tokens = max_tokens;
        }
        if raw.temperature.is_some() {
            tier.temperature = raw.temperature;
        }
        tier
    }
}

fn default_max_tokens() -> usize {
    1024
}

impl TierConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            cost_per_token: 0.0,
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }

    pub fn cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = cost;
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Apply a preset's temperature and completion budget.
    pub fn preset(self, preset: GenerationPreset) -> Self {
        self.temperature(preset.temperature())
            .max_tokens(preset.max_tokens())
    }

    /// Default fast tier.
    pub fn fast() -> Self {
        Self::new("gemini-2.5-flash")
            .cost_per_token(0.000_000_3)
            .max_tokens(1024)
    }

    /// Default smart tier.
    pub fn smart() -> Self {
        Self::new("gemini-2.5-pro")
            .cost_per_token(0.000_001_25)
            .max_tokens(4096)
    }
}

/// Tier table for the router.
///
/// ```toml
/// [router.fast]
/// model = "gemini-2.5-flash"
/// max_tokens = 1024
///
/// [router.smart]
/// model = "gemini-2.5-pro"
/// preset = "balanced"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub fast: TierConfig,
    pub smart: TierConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            fast: TierConfig::fast(),
            smart: TierConfig::smart(),
        }
    }
}

impl RouterConfig {
    pub fn tier(&self, tier: GenerationTier) -> &TierConfig {
        match tier {
            GenerationTier::Fast => &self.fast,
            GenerationTier::Smart => &self.smart,
        }
    }
}

/// Maps complexity to a generation tier.
///
/// LOW goes to the fast tier; MEDIUM and HIGH go to the smart tier. Routing
/// never fails. When a [`PipelineMetrics`] is attached, every decision bumps
/// that tier's counter.
#[derive(Debug, Clone, Default)]
pub struct Router {
    config: RouterConfig,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Count routing decisions in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Pick a tier for `score`.
    pub fn route(&self, score: &ComplexityScore) -> RoutingDecision {
        let tier = match score.tier {
            ComplexityTier::Low => GenerationTier::Fast,
            ComplexityTier::Medium | ComplexityTier::High => GenerationTier::Smart,
        };
        let tier_config = self.config.tier(tier);

        // Roughly four tokens per three words.
        let query_tokens = (score.word_count * 4).div_ceil(3);
        let estimated_tokens = query_tokens + score.context_tokens + tier_config.max_tokens;
        let estimated_cost = estimated_tokens as f64 * tier_config.cost_per_token;

        let reason = format!(
            "{} complexity ({} words, {} context tokens, score {})",
            score.tier, score.word_count, score.context_tokens, score.score
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_route(tier);
        }
        metrics::counter!(telemetry::ROUTES_TOTAL, "tier" => tier.as_str()).increment(1);
        debug!(%tier, model = %tier_config.model, estimated_tokens, "routed query");

        RoutingDecision {
            tier,
            model: tier_config.model.clone(),
            max_tokens: tier_config.max_tokens,
            temperature: tier_config.temperature,
            estimated_tokens,
            estimated_cost,
            reason,
        }
    }
}
