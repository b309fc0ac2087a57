//! Backend call options and replies.

use serde::{Deserialize, Serialize};

use super::RoutingDecision;

/// What the pipeline asks of the generation backend for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub model: String,
    /// Completion budget; `None` leaves it to the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl GenerateOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Options for the tier picked by the router.
    pub fn for_route(routing: &RoutingDecision) -> Self {
        Self {
            model: routing.model.clone(),
            max_tokens: Some(routing.max_tokens),
            temperature: routing.temperature,
        }
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Backend reply.
///
/// Only `text` flows into the pipeline response and the cache; the rest is
/// for callers driving a backend directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Model the backend reports having used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub finish_reason: FinishReason,
}

impl GenerateResponse {
    /// A plain text reply with no usage data.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
            model: None,
            finish_reason: FinishReason::Stop,
        }
    }
}

/// Token counts reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Why the backend stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    /// Hit the tier's `max_tokens`.
    Length,
    ContentFilter,
}
