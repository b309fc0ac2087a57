//! Huginn - query intake pipeline for LLM requests
//!
//! Every query passes a safety gate, then a semantic cache keyed on
//! embedding similarity. On a miss, a structural complexity score routes the
//! query to a fast or a smart generation tier; the response is checked again
//! on the way out and cached for the next similar query.
//!
//! ```text
//! query ─▶ input check ─▶ cache ─hit──────────────────────────────────▶ response
//!                           │
//!                          miss ─▶ classify ─▶ route ─▶ generate ─▶ output check ─▶ cache insert
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use huginn::{Huginn, providers::OpenAiCompatClient};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let backend = OpenAiCompatClient::new("http://localhost:11434/v1")?;
//!     let pipeline = Huginn::builder()
//!         .backend(Arc::new(backend))
//!         .build()?;
//!
//!     let response = pipeline.process("What is 2+2?").await?;
//!     println!("{} ({:?})", response.content, response.source);
//!
//!     // A near-duplicate is served from the cache.
//!     let again = pipeline.process("what is 2+2").await?;
//!     assert!(again.is_cache_hit());
//!
//!     println!("{:?}", pipeline.metrics().snapshot());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod embed;
pub mod error;
pub mod guard;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod router;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheHit, SemanticCache, cosine_similarity};
pub use config::Config;
pub use embed::HashingEmbedder;
pub use error::{HuginnError, Result};
pub use guard::{Checker, SafetyGate, SafetyPatterns, TextCheck};
pub use pipeline::{
    Huginn, HuginnBuilder, MetricsSnapshot, OutputPolicy, Pipeline, PipelineConfig,
    PipelineMetrics, PipelineResponse, Query, QueryState, ResponseSource,
};
pub use prompt::{PromptLibrary, PromptTemplate};
pub use router::{
    ComplexityClassifier, ComplexityThresholds, GenerationPreset, Router, RouterConfig, TierConfig,
};
pub use traits::{Embedder, GenerationBackend};

// Re-export all types
pub use types::{
    CheckCategory, ComplexityScore, ComplexityTier, Embedding, FinishReason, GenerateOptions,
    GenerateResponse, GenerationTier, GuardrailIssue, GuardrailVerdict, Message, Role,
    RoutingDecision, Usage,
};

// Re-export the cancellation token accepted by `Pipeline::process_with_cancel`
pub use tokio_util::sync::CancellationToken;
