//! Routing decisions

use std::fmt;

use serde::{Deserialize, Serialize};

/// Generation-quality/cost class selected per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationTier {
    /// Fast, cheap model for simple queries.
    Fast,
    /// Higher-quality model for medium and high complexity.
    Smart,
}

impl GenerationTier {
    /// All tiers, in counter order.
    pub const ALL: [GenerationTier; 2] = [GenerationTier::Fast, GenerationTier::Smart];

    /// Label used in metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Smart => "smart",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Fast => 0,
            Self::Smart => 1,
        }
    }
}

impl fmt::Display for GenerationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tier selection for one query, with an informational cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub tier: GenerationTier,
    /// Model configured for the tier.
    pub model: String,
    /// Output token budget passed to the backend.
    pub max_tokens: usize,
    /// Tier sampling temperature, if the tier sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub estimated_tokens: usize,
    pub estimated_cost: f64,
    /// Human-readable explanation, for logs.
    pub reason: String,
}
