//! A single chat prompt template.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

use crate::types::{Message, Role};
use crate::{HuginnError, Result};

/// Message content as stored on disk: one string or a list of lines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Lines(Vec<String>),
}

impl Content {
    fn into_text(self) -> String {
        match self {
            Content::Text(text) => text,
            Content::Lines(lines) => lines.join("\n"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    role: Role,
    content: Content,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTemplate {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_variables: Vec<String>,
    messages: Vec<RawMessage>,
}

/// Chat template: role-tagged messages with `{variable}` placeholders.
///
/// `{{` and `}}` render as literal braces.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub name: String,
    /// Prompting pattern label, e.g. "Zero-Shot" or "Few-Shot".
    pub pattern: String,
    pub description: String,
    /// Variables a caller must supply.
    pub input_variables: Vec<String>,
    pub messages: Vec<Message>,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, messages: Vec<Message>) -> Self {
        let input_variables = messages
            .iter()
            .flat_map(|m| placeholders(&m.content))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            name: name.into(),
            pattern: "Unknown".to_string(),
            description: String::new(),
            input_variables,
            messages,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn from_raw(name: &str, raw: RawTemplate) -> Result<Self> {
        if raw.messages.is_empty() {
            return Err(HuginnError::Configuration(format!(
                "template '{name}' has no messages"
            )));
        }
        let messages: Vec<Message> = raw
            .messages
            .into_iter()
            .map(|m| Message {
                role: m.role,
                content: m.content.into_text(),
            })
            .collect();

        // Placeholders in the text are required whether declared or not.
        let mut input_variables = raw.input_variables;
        let undeclared: BTreeSet<String> = messages
            .iter()
            .flat_map(|m| placeholders(&m.content))
            .filter(|v| !input_variables.contains(v))
            .collect();
        input_variables.extend(undeclared);

        Ok(Self {
            name: name.to_string(),
            pattern: raw.pattern.unwrap_or_else(|| "Unknown".to_string()),
            description: raw.description.unwrap_or_default(),
            input_variables,
            messages,
        })
    }

    /// Declared variables missing from `vars`, sorted.
    pub fn missing_variables(&self, vars: &HashMap<String, String>) -> Vec<String> {
        let mut missing: Vec<String> = self
            .input_variables
            .iter()
            .filter(|v| !vars.contains_key(*v))
            .cloned()
            .collect();
        missing.sort();
        missing
    }

    /// Substitute `vars` into every message.
    ///
    /// Fails with [`HuginnError::MissingVariables`] if a declared variable or
    /// any placeholder in the text has no value.
    pub fn render(&self, vars: &HashMap<String, String>) -> Result<Vec<Message>> {
        let mut missing: BTreeSet<String> = self.missing_variables(vars).into_iter().collect();
        let mut rendered = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            match substitute(&message.content, vars) {
                Ok(content) => rendered.push(Message {
                    role: message.role,
                    content,
                }),
                Err(names) => missing.extend(names),
            }
        }

        if !missing.is_empty() {
            return Err(HuginnError::MissingVariables {
                template: self.name.clone(),
                missing: missing.into_iter().collect(),
            });
        }
        Ok(rendered)
    }
}

/// Placeholder names in `text`, in order of appearance.
fn placeholders(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    scan(text, |piece| {
        if let Piece::Var(name) = piece {
            names.push(name.to_string());
        }
    });
    names
}

/// Render `text`, or return the names that had no value.
fn substitute(text: &str, vars: &HashMap<String, String>) -> std::result::Result<String, Vec<String>> {
    let mut out = String::with_capacity(text.len());
    let mut missing = Vec::new();
    scan(text, |piece| match piece {
        Piece::Literal(s) => out.push_str(s),
        Piece::Var(name) => match vars.get(name) {
            Some(value) => out.push_str(value),
            None => missing.push(name.to_string()),
        },
    });
    if missing.is_empty() { Ok(out) } else { Err(missing) }
}

enum Piece<'a> {
    Literal(&'a str),
    Var(&'a str),
}

fn is_var_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn scan<'a>(text: &'a str, mut emit: impl FnMut(Piece<'a>)) {
    let mut rest = text;
    while let Some(pos) = rest.find(['{', '}']) {
        emit(Piece::Literal(&rest[..pos]));
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            emit(Piece::Literal("{"));
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            emit(Piece::Literal("}"));
            rest = &tail[2..];
        } else if tail.starts_with('{')
            && let Some(end) = tail.find('}')
            && is_var_name(&tail[1..end])
        {
            emit(Piece::Var(&tail[1..end]));
            rest = &tail[end + 1..];
        } else {
            emit(Piece::Literal(&tail[..1]));
            rest = &tail[1..];
        }
    }
    emit(Piece::Literal(rest));
}
