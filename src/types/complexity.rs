//! Query complexity scores

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete complexity tier. Ordered: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A tier plus the raw signals that produced it.
///
/// Computed fresh per query; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityScore {
    pub tier: ComplexityTier,
    pub word_count: usize,
    pub question_marks: usize,
    pub context_tokens: usize,
    /// Escalation points accumulated from question marks.
    pub score: u32,
}
