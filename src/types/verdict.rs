//! Guardrail verdicts

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a guardrail check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Injection,
    Toxicity,
    Pii,
    Topic,
    Leakage,
    /// Output not in the required structured format.
    Format,
    Custom,
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Injection => write!(f, "prompt injection"),
            Self::Toxicity => write!(f, "toxicity"),
            Self::Pii => write!(f, "PII"),
            Self::Topic => write!(f, "off-topic"),
            Self::Leakage => write!(f, "instruction leakage"),
            Self::Format => write!(f, "output format"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// One issue found by a checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailIssue {
    pub category: CheckCategory,
    /// Name of the rule that matched.
    pub rule: String,
    pub message: String,
}

impl fmt::Display for GuardrailIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.rule)
    }
}

/// Result of running the safety gate over a text.
///
/// `passed` is true iff `issues` is empty. Issues keep checker order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    pub passed: bool,
    pub issues: Vec<GuardrailIssue>,
}

impl Default for GuardrailVerdict {
    fn default() -> Self {
        Self::pass()
    }
}

impl GuardrailVerdict {
    /// A verdict with no issues.
    pub fn pass() -> Self {
        Self::from_issues(Vec::new())
    }

    /// Build a verdict from the collected issues.
    pub fn from_issues(issues: Vec<GuardrailIssue>) -> Self {
        Self {
            passed: issues.is_empty(),
            issues,
        }
    }

    /// Issue descriptions, in order.
    pub fn descriptions(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    /// Whether any issue belongs to `category`.
    pub fn has(&self, category: CheckCategory) -> bool {
        self.issues.iter().any(|i| i.category == category)
    }
}
