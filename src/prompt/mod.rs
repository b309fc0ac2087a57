//! Prompt templates.
//!
//! Templates live in a JSON document keyed by name, so prompt text can be
//! edited and reloaded without touching code:
//!
//! ```json
//! {
//!   "support_v1": {
//!     "pattern": "Zero-Shot",
//!     "description": "Customer support answer",
//!     "input_variables": ["query", "context"],
//!     "messages": [
//!       { "role": "system", "content": ["You are a support assistant.", "Context: {context}"] },
//!       { "role": "user", "content": "{query}" }
//!     ]
//!   }
//! }
//! ```
//!
//! Names are grouped into categories by the prefix before the first `_`.
//! Versioned variants follow `{base}_{version}` (e.g. `support_v2`) and can
//! be split between users with [`PromptLibrary::variant_for`].

mod template;

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use template::PromptTemplate;

use self::template::RawTemplate;
use crate::types::Message;
use crate::{HuginnError, Result};

/// Name of the built-in template used by the pipeline.
pub const DEFAULT_TEMPLATE: &str = "support_default";

/// Built-in support assistant template with `{query}` and `{context}`.
pub fn default_template() -> PromptTemplate {
    PromptTemplate::new(
        DEFAULT_TEMPLATE,
        vec![
            Message::system(
                "You are a concise, accurate support assistant.\n\
                 Answer using the context when it is relevant. If you do not know, say so.\n\
                 Context:\n{context}",
            ),
            Message::user("{query}"),
        ],
    )
    .description("Default support assistant")
}

/// Named collection of templates.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    templates: BTreeMap<String, PromptTemplate>,
    source: Option<PathBuf>,
}

impl PromptLibrary {
    /// Empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding only [`default_template`].
    pub fn with_default() -> Self {
        let mut lib = Self::new();
        lib.add(default_template());
        lib
    }

    /// Parse a JSON document of templates.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self {
            templates: parse(json)?,
            source: None,
        })
    }

    /// Load templates from a JSON file. The path is remembered for [`reload`](Self::reload).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let templates = read(path)?;
        info!(path = %path.display(), count = templates.len(), "loaded prompt templates");
        Ok(Self {
            templates,
            source: Some(path.to_path_buf()),
        })
    }

    /// Re-read the source file, replacing every template.
    ///
    /// On error the current templates are kept. A library not loaded from a
    /// file has nothing to reload and is left unchanged.
    pub fn reload(&mut self) -> Result<usize> {
        let Some(path) = &self.source else {
            return Ok(self.templates.len());
        };
        let templates = read(path)?;
        info!(path = %path.display(), count = templates.len(), "reloaded prompt templates");
        self.templates = templates;
        Ok(self.templates.len())
    }

    /// Add or replace a template.
    pub fn add(&mut self, template: PromptTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Template by name.
    pub fn get(&self, name: &str) -> Result<&PromptTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| HuginnError::TemplateNotFound {
                name: name.to_string(),
                available: self.templates.keys().cloned().collect(),
            })
    }

    /// Pick one of `versions` of `base` for `user_id`.
    ///
    /// The same user always lands on the same version (stable within a
    /// build), so an A/B split stays consistent across requests. Resolves
    /// to the template `{base}_{version}`.
    pub fn variant_for(
        &self,
        base: &str,
        versions: &[&str],
        user_id: &str,
    ) -> Result<&PromptTemplate> {
        if versions.is_empty() {
            return Err(HuginnError::InvalidInput(format!(
                "no versions given for template '{base}'"
            )));
        }
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        let version = versions[(hasher.finish() % versions.len() as u64) as usize];
        debug!(user_id, base, version, "assigned template variant");
        self.get(&format!("{base}_{version}"))
    }

    /// Sorted template names, optionally only those starting with `category`.
    pub fn list(&self, category: Option<&str>) -> Vec<String> {
        let prefix = category.map(str::to_lowercase);
        self.templates
            .keys()
            .filter(|name| prefix.as_deref().is_none_or(|p| name.starts_with(p)))
            .cloned()
            .collect()
    }

    /// Template names grouped by the prefix before the first `_`.
    pub fn categories(&self) -> BTreeMap<String, Vec<String>> {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in self.templates.keys() {
            let category = name.split('_').next().unwrap_or(name.as_str());
            groups
                .entry(category.to_string())
                .or_default()
                .push(name.clone());
        }
        groups
    }

    /// Declared variables of a template.
    pub fn input_variables(&self, name: &str) -> Result<&[String]> {
        Ok(&self.get(name)?.input_variables)
    }

    /// Check that `vars` covers every declared variable of `name`.
    pub fn validate_variables(&self, name: &str, vars: &HashMap<String, String>) -> Result<()> {
        let missing = self.get(name)?.missing_variables(vars);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HuginnError::MissingVariables {
                template: name.to_string(),
                missing,
            })
        }
    }

    /// Render a template by name.
    pub fn render(&self, name: &str, vars: &HashMap<String, String>) -> Result<Vec<Message>> {
        self.get(name)?.render(vars)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn read(path: &Path) -> Result<BTreeMap<String, PromptTemplate>> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        HuginnError::Configuration(format!("failed to read {}: {e}", path.display()))
    })?;
    parse(&json)
}

fn parse(json: &str) -> Result<BTreeMap<String, PromptTemplate>> {
    let raw: BTreeMap<String, RawTemplate> = serde_json::from_str(json)?;
    raw.into_iter()
        .map(|(name, raw)| Ok((name.clone(), PromptTemplate::from_raw(&name, raw)?)))
        .collect()
}
