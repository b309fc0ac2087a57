//! Huginn error types

use std::time::Duration;

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Pipeline outcomes surfaced to callers
    #[error("input rejected by safety gate: {}", .0.join("; "))]
    InputRejected(Vec<String>),

    #[error("output withheld by safety gate: {}", .0.join("; "))]
    OutputFlagged(Vec<String>),

    #[error("generation timed out after {0:?}")]
    GenerationTimeout(Duration),

    #[error("generation failed: {message}")]
    GenerationFailed {
        message: String,
        /// The backend error, when there is one.
        #[source]
        source: Option<Box<HuginnError>>,
    },

    #[error("request cancelled")]
    Cancelled,

    // Embedding errors
    #[error("input too long: {len} characters (max {max})")]
    InputTooLong { len: usize, max: usize },

    #[error("embedding service unavailable: {0}")]
    EmbeddingServiceUnavailable(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("empty response from model")]
    EmptyResponse,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    // Prompt templates
    #[error("template '{name}' not found (available: {})", .available.join(", "))]
    TemplateNotFound { name: String, available: Vec<String> },

    #[error("template '{template}' missing variables: {}", .missing.join(", "))]
    MissingVariables {
        template: String,
        missing: Vec<String>,
    },

    // Guardrail checker failures (swallowed by the gate, see `guard`)
    #[error("checker error: {0}")]
    Checker(String),

    // Configuration errors
    #[error("no generation backend configured")]
    NoBackend,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HuginnError {
    /// Wrap an error returned by the generation backend named `backend`.
    pub fn generation(backend: &str, source: HuginnError) -> Self {
        HuginnError::GenerationFailed {
            message: format!("{backend}: {source}"),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the caller may reasonably retry the same request.
    ///
    /// The pipeline never retries on its own; this is a hint for the
    /// request handler sitting in front of it.
    pub fn is_transient(&self) -> bool {
        match self {
            HuginnError::GenerationFailed {
                source: Some(source),
                ..
            } => source.is_transient(),
            HuginnError::EmbeddingServiceUnavailable(_)
            | HuginnError::GenerationTimeout(_)
            | HuginnError::GenerationFailed { source: None, .. }
            | HuginnError::Http(_)
            | HuginnError::RateLimited { .. } => true,
            HuginnError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            HuginnError::RateLimited { retry_after } => *retry_after,
            HuginnError::GenerationFailed {
                source: Some(source),
                ..
            } => source.retry_after(),
            _ => None,
        }
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
