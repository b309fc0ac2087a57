//! Query lifecycle types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::guard::parse_json_output;
use crate::types::{GuardrailVerdict, RoutingDecision};

/// Canned reply for queries and responses withheld by the safety gate.
pub const DEFAULT_REJECTION_MESSAGE: &str =
    "I can't help with that request. Please rephrase your question.";

/// A user query with optional supporting context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    /// Extra material (e.g. retrieved documents) sent along with the query.
    /// Its size feeds the complexity score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// States a query moves through.
///
/// ```text
/// Received → InputChecked → CacheChecked → Resolved                 (hit)
///                                        → Classified → Routed
///                                          → Generated → OutputChecked → Resolved
/// InputChecked → Rejected                                        (unsafe input)
/// OutputChecked → Rejected                          (unsafe output, Block policy)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    Received,
    InputChecked,
    Rejected,
    CacheChecked,
    Classified,
    Routed,
    Generated,
    OutputChecked,
    Resolved,
}

impl QueryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::InputChecked => "input_checked",
            Self::Rejected => "rejected",
            Self::CacheChecked => "cache_checked",
            Self::Classified => "classified",
            Self::Routed => "routed",
            Self::Generated => "generated",
            Self::OutputChecked => "output_checked",
            Self::Resolved => "resolved",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Resolved)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the response content came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseSource {
    /// Served from the semantic cache.
    Cache { similarity: f32 },
    /// Produced by the generation backend.
    Generated,
    /// Replaced by the canned rejection message.
    Guardrail,
}

/// What to do when the output check finds issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPolicy {
    /// Return the response, marked `flagged`.
    #[default]
    Log,
    /// Replace the response with the rejection message.
    Block,
}

/// Result of one pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResponse {
    pub content: String,
    /// Terminal state: `Resolved` or `Rejected`.
    pub state: QueryState,
    pub source: ResponseSource,
    pub input_verdict: GuardrailVerdict,
    /// Present only when the response was generated.
    pub output_verdict: Option<GuardrailVerdict>,
    /// Present only on a cache miss.
    pub routing: Option<RoutingDecision>,
    /// Every state visited, in order.
    pub trace: Vec<QueryState>,
    pub latency: Duration,
    /// The output check found issues.
    pub flagged: bool,
}

impl PipelineResponse {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.source, ResponseSource::Cache { .. })
    }

    pub fn is_rejected(&self) -> bool {
        self.state == QueryState::Rejected
    }

    /// Parse the content as JSON, tolerating Markdown code fences.
    pub fn json(&self) -> Result<serde_json::Value> {
        parse_json_output(&self.content, &[])
    }
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on one generation call. Default: 30s.
    pub generation_timeout: Duration,
    /// Workers used by [`Pipeline::process_all`](super::Pipeline::process_all). Default: 8.
    pub max_concurrent: usize,
    pub rejection_message: String,
    pub output_policy: OutputPolicy,
    pub temperature: Option<f32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(30),
            max_concurrent: 8,
            rejection_message: DEFAULT_REJECTION_MESSAGE.to_string(),
            output_policy: OutputPolicy::default(),
            temperature: None,
        }
    }
}
