//! Structural complexity scoring.
//!
//! The classifier never looks at meaning, only at shape: how many words the
//! query has, how many questions it asks, and how much context travels with
//! it. Cheap and deterministic, so it can run on every cache miss.

use serde::Deserialize;

use crate::types::{ComplexityScore, ComplexityTier};

/// Characters per token used by [`estimate_tokens`].
const CHARS_PER_TOKEN: usize = 4;

/// Points added to the escalation score per question mark.
const QUESTION_MARK_POINTS: u32 = 1;

/// Cutoffs for the complexity tiers.
///
/// Used by both the builder (programmatic) and the TOML config:
///
/// ```toml
/// [classifier]
/// medium_words = 20
/// high_words = 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ComplexityThresholds {
    /// Word count at which a query becomes MEDIUM. Default: 20.
    pub medium_words: usize,
    /// Word count above which a query becomes HIGH. Default: 50.
    pub high_words: usize,
    /// Context tokens at which a query becomes MEDIUM. Default: 1000.
    pub medium_context_tokens: usize,
    /// Context tokens above which a query becomes HIGH. Default: 3000.
    pub high_context_tokens: usize,
    /// Escalation score that lifts LOW to MEDIUM. Default: 2 (two question marks).
    pub question_escalation: u32,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            medium_words: 20,
            high_words: 50,
            medium_context_tokens: 1000,
            high_context_tokens: 3000,
            question_escalation: 2,
        }
    }
}

/// Scores a query into a [`ComplexityTier`].
#[derive(Debug, Clone, Default)]
pub struct ComplexityClassifier {
    thresholds: ComplexityThresholds,
}

impl ComplexityClassifier {
    /// Create a classifier with the given cutoffs.
    pub fn new(thresholds: ComplexityThresholds) -> Self {
        Self { thresholds }
    }

    /// The configured cutoffs.
    pub fn thresholds(&self) -> &ComplexityThresholds {
        &self.thresholds
    }

    /// Classify `text` given the size of the context sent along with it.
    ///
    /// - more than `high_words` words or `high_context_tokens` context → HIGH
    /// - at least `medium_words` words or `medium_context_tokens` context → MEDIUM
    /// - otherwise LOW, unless question marks push the score to
    ///   `question_escalation`, which makes it MEDIUM
    ///
    /// For a fixed question-mark count the tier never decreases as the word
    /// count grows.
    pub fn classify(&self, text: &str, context_tokens: usize) -> ComplexityScore {
        let t = &self.thresholds;
        let word_count = text.split_whitespace().count();
        let question_marks = text.matches('?').count();
        let score = question_marks as u32 * QUESTION_MARK_POINTS;

        let base = if word_count > t.high_words || context_tokens > t.high_context_tokens {
            ComplexityTier::High
        } else if word_count >= t.medium_words || context_tokens >= t.medium_context_tokens {
            ComplexityTier::Medium
        } else {
            ComplexityTier::Low
        };

        let tier = if base == ComplexityTier::Low && score >= t.question_escalation {
            ComplexityTier::Medium
        } else {
            base
        };

        ComplexityScore {
            tier,
            word_count,
            question_marks,
            context_tokens,
            score,
        }
    }
}

/// Rough token count for `text`: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn short_query_is_low() {
        let score = ComplexityClassifier::default().classify("What is 2+2?", 0);
        assert_eq!(score.tier, ComplexityTier::Low);
        assert_eq!(score.word_count, 3);
        assert_eq!(score.question_marks, 1);
        assert_eq!(score.score, 1);
    }

    #[test]
    fn word_boundaries() {
        let c = ComplexityClassifier::default();
        assert_eq!(c.classify(&words(19), 0).tier, ComplexityTier::Low);
        assert_eq!(c.classify(&words(20), 0).tier, ComplexityTier::Medium);
        assert_eq!(c.classify(&words(50), 0).tier, ComplexityTier::Medium);
        assert_eq!(c.classify(&words(51), 0).tier, ComplexityTier::High);
    }

    #[test]
    fn context_boundaries() {
        let c = ComplexityClassifier::default();
        assert_eq!(c.classify("hi", 999).tier, ComplexityTier::Low);
        assert_eq!(c.classify("hi", 1000).tier, ComplexityTier::Medium);
        assert_eq!(c.classify("hi", 3000).tier, ComplexityTier::Medium);
        assert_eq!(c.classify("hi", 3001).tier, ComplexityTier::High);
    }

    #[test]
    fn question_marks_escalate_low_only() {
        let c = ComplexityClassifier::default();
        assert_eq!(c.classify("why? how?", 0).tier, ComplexityTier::Medium);
        assert_eq!(c.classify("why?", 0).tier, ComplexityTier::Low);

        let many = format!("{} ? ? ?", words(60));
        assert_eq!(c.classify(&many, 0).tier, ComplexityTier::High);
    }

    #[test]
    fn estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
