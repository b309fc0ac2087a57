//! Public types for the Huginn API.

mod complexity;
mod embedding;
mod generate;
mod message;
mod routing;
mod verdict;

pub use complexity::{ComplexityScore, ComplexityTier};
pub use embedding::Embedding;
pub use generate::{FinishReason, GenerateOptions, GenerateResponse, Usage};
pub use message::{Message, Role};
pub use routing::{GenerationTier, RoutingDecision};
pub use verdict::{CheckCategory, GuardrailIssue, GuardrailVerdict};
