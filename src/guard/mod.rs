//! Input and output safety checks.
//!
//! The [`SafetyGate`] runs an ordered list of [`Checker`]s over a text and
//! collects every issue into a [`GuardrailVerdict`]. The gate itself never
//! fails: a custom checker that errors is logged and skipped.
//!
//! Default checker lists:
//!
//! | direction | checkers                           |
//! |-----------|------------------------------------|
//! | input     | injection, toxicity, PII, topic    |
//! | output    | toxicity, PII, leakage             |
//!
//! Configuring `json_output` appends a [`Checker::Json`] to the output list.

pub mod json;
mod patterns;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

pub use json::{clean_json_response, parse_json_output};
pub use patterns::{PatternRule, SafetyPatterns};

use self::patterns::{CompiledRule, compile};
use crate::Result;
use crate::telemetry;
use crate::types::{CheckCategory, GuardrailIssue, GuardrailVerdict};

/// User-supplied check, run as [`Checker::Custom`].
pub trait TextCheck: Send + Sync {
    /// Rule name reported in issues and logs.
    fn name(&self) -> &str;

    /// Inspect `text`, returning issue messages. An `Err` is treated as
    /// "no issues".
    fn check(&self, text: &str) -> Result<Vec<String>>;
}

/// One step of a checker list.
#[derive(Clone)]
pub enum Checker {
    Injection,
    Toxicity,
    Pii,
    /// Keyword allow-list; passes everything when the list is empty.
    Topic,
    Leakage,
    /// Reply must parse as JSON carrying these fields.
    Json(Vec<String>),
    Custom(Arc<dyn TextCheck>),
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Injection => f.write_str("Injection"),
            Self::Toxicity => f.write_str("Toxicity"),
            Self::Pii => f.write_str("Pii"),
            Self::Topic => f.write_str("Topic"),
            Self::Leakage => f.write_str("Leakage"),
            Self::Json(fields) => f.debug_tuple("Json").field(fields).finish(),
            Self::Custom(c) => f.debug_tuple("Custom").field(&c.name()).finish(),
        }
    }
}

impl Checker {
    /// Input checkers, in order.
    pub fn input_defaults() -> Vec<Checker> {
        vec![Self::Injection, Self::Toxicity, Self::Pii, Self::Topic]
    }

    /// Output checkers, in order.
    pub fn output_defaults() -> Vec<Checker> {
        vec![Self::Toxicity, Self::Pii, Self::Leakage]
    }
}

/// Which side of generation a text comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// Rule-based safety gate.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    injection: Vec<CompiledRule>,
    toxicity: Vec<CompiledRule>,
    pii: Vec<CompiledRule>,
    leakage: Vec<CompiledRule>,
    allowed_topics: Vec<String>,
    input: Vec<Checker>,
    output: Vec<Checker>,
}

impl SafetyGate {
    /// Compile `patterns` into a gate with the default checker lists.
    ///
    /// Fails with [`HuginnError::Configuration`](crate::HuginnError::Configuration)
    /// on the first invalid regex.
    pub fn new(patterns: SafetyPatterns) -> Result<Self> {
        let mut output = Checker::output_defaults();
        if let Some(fields) = patterns.json_output {
            output.push(Checker::Json(fields));
        }
        Ok(Self {
            injection: compile(CheckCategory::Injection, &patterns.injection)?,
            toxicity: compile(CheckCategory::Toxicity, &patterns.toxicity)?,
            pii: compile(CheckCategory::Pii, &patterns.pii)?,
            leakage: compile(CheckCategory::Leakage, &patterns.leakage)?,
            allowed_topics: patterns
                .allowed_topics
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
            input: Checker::input_defaults(),
            output,
        })
    }

    /// Gate with the built-in rules.
    pub fn with_defaults() -> Result<Self> {
        Self::new(SafetyPatterns::default())
    }

    /// Replace the input checker list.
    pub fn input_checkers(mut self, checkers: Vec<Checker>) -> Self {
        self.input = checkers;
        self
    }

    /// Replace the output checker list.
    pub fn output_checkers(mut self, checkers: Vec<Checker>) -> Self {
        self.output = checkers;
        self
    }

    /// Append a custom check to the input list.
    pub fn custom_input(mut self, check: Arc<dyn TextCheck>) -> Self {
        self.input.push(Checker::Custom(check));
        self
    }

    /// Append a custom check to the output list.
    pub fn custom_output(mut self, check: Arc<dyn TextCheck>) -> Self {
        self.output.push(Checker::Custom(check));
        self
    }

    /// Run the input checkers over a user query.
    pub fn check_input(&self, text: &str) -> GuardrailVerdict {
        self.run(&self.input, text, Direction::Input)
    }

    /// Run the output checkers over a generated response.
    pub fn check_output(&self, text: &str) -> GuardrailVerdict {
        self.run(&self.output, text, Direction::Output)
    }

    fn run(&self, checkers: &[Checker], text: &str, direction: Direction) -> GuardrailVerdict {
        let mut issues = Vec::new();
        for checker in checkers {
            match checker {
                Checker::Injection => match_rules(&self.injection, text, &mut issues),
                Checker::Toxicity => match_rules(&self.toxicity, text, &mut issues),
                Checker::Pii => match_rules(&self.pii, text, &mut issues),
                Checker::Leakage => match_rules(&self.leakage, text, &mut issues),
                Checker::Topic => self.check_topic(text, &mut issues),
                Checker::Json(fields) => {
                    if let Err(e) = parse_json_output(text, fields) {
                        issues.push(GuardrailIssue {
                            category: CheckCategory::Format,
                            rule: "json-output".to_string(),
                            message: e.to_string(),
                        });
                    }
                }
                Checker::Custom(check) => match check.check(text) {
                    Ok(messages) => issues.extend(messages.into_iter().map(|message| {
                        GuardrailIssue {
                            category: CheckCategory::Custom,
                            rule: check.name().to_string(),
                            message,
                        }
                    })),
                    Err(e) => {
                        warn!(checker = check.name(), error = %e, "custom checker failed, skipping");
                    }
                },
            }
        }

        let verdict = GuardrailVerdict::from_issues(issues);
        if !verdict.passed {
            debug!(
                direction = direction.as_str(),
                issues = ?verdict.descriptions(),
                "guardrail triggered"
            );
            metrics::counter!(
                telemetry::GUARDRAIL_TRIGGERS_TOTAL,
                "direction" => direction.as_str()
            )
            .increment(1);
        }
        verdict
    }

    fn check_topic(&self, text: &str, issues: &mut Vec<GuardrailIssue>) {
        if self.allowed_topics.is_empty() {
            return;
        }
        let lower = text.to_lowercase();
        if !self.allowed_topics.iter().any(|t| lower.contains(t.as_str())) {
            issues.push(GuardrailIssue {
                category: CheckCategory::Topic,
                rule: "allowed-topics".to_string(),
                message: "query is outside the supported topics".to_string(),
            });
        }
    }
}

fn match_rules(rules: &[CompiledRule], text: &str, issues: &mut Vec<GuardrailIssue>) {
    issues.extend(
        rules
            .iter()
            .filter(|rule| rule.regex.is_match(text))
            .map(|rule| GuardrailIssue {
                category: rule.category,
                rule: rule.name.clone(),
                message: rule.message.clone(),
            }),
    );
}
