//! Regex rule sets for the safety gate.

use regex::Regex;
use serde::Deserialize;

use crate::types::CheckCategory;
use crate::{HuginnError, Result};

/// One named regex rule.
///
/// ```toml
/// [[guard.injection]]
/// name = "role-override"
/// pattern = '(?i)you\s+are\s+now'
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PatternRule {
    pub name: String,
    pub pattern: String,
    /// Text reported when the rule matches. Defaults to a message derived
    /// from the category.
    #[serde(default)]
    pub message: Option<String>,
}

impl PatternRule {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            message: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Rule lists per category, plus the topic allow-list and the structured
/// output requirement.
///
/// Every list replaces its default when present in configuration; an empty
/// `allowed_topics` disables the topic check.
///
/// ```toml
/// [guard]
/// json_output = ["sentiment", "confidence"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SafetyPatterns {
    pub injection: Vec<PatternRule>,
    pub toxicity: Vec<PatternRule>,
    pub pii: Vec<PatternRule>,
    pub leakage: Vec<PatternRule>,
    /// Keywords a query must mention at least one of (case-insensitive).
    pub allowed_topics: Vec<String>,
    /// When set, replies must be JSON (fences allowed) with these fields.
    /// An empty list accepts any JSON value.
    pub json_output: Option<Vec<String>>,
}

impl Default for SafetyPatterns {
    fn default() -> Self {
        Self {
            injection: vec![
                PatternRule::new(
                    "ignore-instructions",
                    r"(?i)ignore\s+(all\s+)?(the\s+)?(previous|prior|above)\s+(instructions|prompts|rules)",
                )
                .message("attempt to override instructions"),
                PatternRule::new(
                    "special-token",
                    r"(?i)<\|?(system|im_start|im_end|im_sep|endoftext)\|?>",
                )
                .message("model control token in input"),
                PatternRule::new("delimiter", r"(\[INST\]|\[/INST\]|<<SYS>>|<</SYS>>)")
                    .message("instruction delimiter in input"),
                PatternRule::new(
                    "jailbreak",
                    r"(?i)(do\s+anything\s+now|DAN\s+mode|jailbreak|bypass\s+(safety|filter|guard))",
                )
                .message("jailbreak attempt"),
                PatternRule::new(
                    "prompt-leak",
                    r"(?i)(show|reveal|print|output|repeat)\s+(me\s+)?(your|the)\s+(system\s+)?(prompt|instructions|rules)",
                )
                .message("request to reveal instructions"),
            ],
            toxicity: vec![
                PatternRule::new(
                    "insult",
                    r"(?i)\b(idiot|stupid|moron|dumb\s*ass|imbecile)\b",
                )
                .message("insulting language"),
                PatternRule::new("threat", r"(?i)\b(kill\s+yourself|i\s+will\s+hurt\s+you)\b")
                    .message("threatening language"),
                PatternRule::new("hostility", r"(?i)\b(i\s+hate\s+you|shut\s+up)\b")
                    .message("hostile language"),
            ],
            pii: vec![
                PatternRule::new("card-number", r"\b(?:\d{4}[- ]?){3}\d{4}\b")
                    .message("possible payment card number"),
                PatternRule::new("ssn", r"\b\d{3}-\d{2}-\d{4}\b")
                    .message("possible social security number"),
                PatternRule::new(
                    "email",
                    r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
                )
                .message("email address"),
            ],
            leakage: vec![
                PatternRule::new(
                    "system-marker",
                    r"(?i)(<\|?(system|im_start)\|?>|<<SYS>>|\[INST\])",
                )
                .message("internal prompt marker in output"),
                PatternRule::new(
                    "system-prompt-echo",
                    r"(?i)\b(my|the)\s+system\s+prompt\s+(is|says)\b",
                )
                .message("output discloses the system prompt"),
            ],
            allowed_topics: Vec::new(),
            json_output: None,
        }
    }
}

/// A rule compiled for matching.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub category: CheckCategory,
    pub name: String,
    pub message: String,
    pub regex: Regex,
}

/// Compile a rule list, failing on the first invalid pattern.
pub(crate) fn compile(category: CheckCategory, rules: &[PatternRule]) -> Result<Vec<CompiledRule>> {
    rules
        .iter()
        .map(|rule| {
            let regex = Regex::new(&rule.pattern).map_err(|e| {
                HuginnError::Configuration(format!(
                    "invalid {category} rule '{}': {e}",
                    rule.name
                ))
            })?;
            Ok(CompiledRule {
                category,
                name: rule.name.clone(),
                message: rule
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{category} detected")),
                regex,
            })
        })
        .collect()
}
