//! Context files: extra documentation fields splayed onto tools, resources
//! and prompts after extraction.
//!
//! ```yaml
//! tools:
//!   search:
//!     usage: |
//!       Pass a query string.
//! resources:
//!   "file://*":
//!     access: read-only
//! prompts:
//!   greet:
//!     tone: friendly
//! ```

mod loader;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde_yaml::Value as YamlValue;

use crate::document::{ContextFields, ServerDoc};

pub use loader::{load_context_file, load_context_files, resolve_within_root, ContextLoad};

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is outside the allowed directory {root}")]
    OutsideRoot { path: String, root: String },
    #[error("invalid {format}: {message}")]
    Parse { format: ContextFormat, message: String },
    #[error("invalid context file: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFormat {
    Json,
    Yaml,
}

impl ContextFormat {
    /// `.json` files and documents starting with `{` are JSON; everything
    /// else is read as YAML.
    pub fn detect(path: &Path, content: &str) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Self::Json,
            Some("yaml" | "yml") => Self::Yaml,
            _ if content.trim_start().starts_with('{') => Self::Json,
            _ => Self::Yaml,
        }
    }
}

impl fmt::Display for ContextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        })
    }
}

/// A resource URI pattern with the fields it contributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePattern {
    pub pattern: String,
    matcher: glob::Pattern,
    pub fields: ContextFields,
}

impl ResourcePattern {
    pub fn new(pattern: impl Into<String>, fields: ContextFields) -> Result<Self, glob::PatternError> {
        let pattern = pattern.into();
        let matcher = glob::Pattern::new(&pattern)?;
        Ok(Self { pattern, matcher, fields })
    }

    /// Exact equality, or a shell-glob match where `*` also spans `/`.
    pub fn matches(&self, uri: &str) -> bool {
        self.pattern == uri || self.matcher.matches(uri)
    }
}

/// One parsed context file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextConfig {
    pub tools: BTreeMap<String, ContextFields>,
    /// Patterns in file order; the first match wins within one file.
    pub resources: Vec<ResourcePattern>,
    pub prompts: BTreeMap<String, ContextFields>,
}

impl ContextConfig {
    pub fn parse(text: &str, format: ContextFormat) -> Result<Self, ContextError> {
        let root: YamlValue = match format {
            ContextFormat::Yaml => serde_yaml::from_str(text).map_err(|e| ContextError::Parse {
                format,
                message: e.to_string(),
            })?,
            ContextFormat::Json => {
                let json: serde_json::Value =
                    serde_json::from_str(text).map_err(|e| ContextError::Parse {
                        format,
                        message: e.to_string(),
                    })?;
                serde_yaml::to_value(json).map_err(|e| ContextError::Parse {
                    format,
                    message: e.to_string(),
                })?
            }
        };

        Self::from_value(root)
    }

    fn from_value(root: YamlValue) -> Result<Self, ContextError> {
        let mut config = Self::default();
        let sections = match root {
            YamlValue::Null => return Ok(config),
            YamlValue::Mapping(map) => map,
            _ => return Err(ContextError::Invalid("top level must be a mapping".into())),
        };

        for (key, value) in sections {
            let section = scalar_to_string(&key);
            match section.as_str() {
                "tools" => config.tools = named_entries(&section, value)?.into_iter().collect(),
                "prompts" => config.prompts = named_entries(&section, value)?.into_iter().collect(),
                "resources" => {
                    for (pattern, fields) in named_entries(&section, value)? {
                        match ResourcePattern::new(pattern.as_str(), fields) {
                            Ok(p) => config.resources.push(p),
                            Err(e) => {
                                tracing::warn!(name: "context.pattern.invalid", pattern = %pattern, error = %e, "Skipping invalid resource pattern");
                            }
                        }
                    }
                }
                other => {
                    tracing::warn!(name: "context.section.unknown", section = %other, "Ignoring unknown context section");
                }
            }
        }

        Ok(config)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty() && self.prompts.is_empty()
    }
}

/// Read `key: {field: value, ...}` entries of one section, keeping order.
fn named_entries(section: &str, value: YamlValue) -> Result<Vec<(String, ContextFields)>, ContextError> {
    let map = match value {
        YamlValue::Null => return Ok(Vec::new()),
        YamlValue::Mapping(map) => map,
        _ => return Err(ContextError::Invalid(format!("`{section}` must be a mapping"))),
    };

    let mut entries = Vec::with_capacity(map.len());
    for (key, fields) in map {
        let name = scalar_to_string(&key);
        let fields = match fields {
            YamlValue::Null => ContextFields::new(),
            YamlValue::Mapping(fields) => fields
                .iter()
                .map(|(k, v)| (scalar_to_string(k), scalar_to_string(v)))
                .collect(),
            _ => {
                return Err(ContextError::Invalid(format!(
                    "`{section}.{name}` must be a mapping of fields"
                )))
            }
        };
        entries.push((name, fields));
    }
    Ok(entries)
}

/// Flatten a value to the string stored in a context field. Nested values
/// are kept as compact JSON.
fn scalar_to_string(value: &YamlValue) -> String {
    match value {
        YamlValue::Null => String::new(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::String(s) => s.clone(),
        YamlValue::Tagged(tagged) => scalar_to_string(&tagged.value),
        other => serde_json::to_string(other)
            .or_else(|_| serde_yaml::to_string(other).map(|s| s.trim_end().to_string()))
            .unwrap_or_default(),
    }
}

/// Context files in load order. Later layers override earlier ones field
/// by field.
#[derive(Debug, Clone, Default)]
pub struct ContextStack {
    layers: Vec<ContextConfig>,
}

impl ContextStack {
    pub fn new(layers: Vec<ContextConfig>) -> Self {
        Self { layers }
    }

    pub fn push(&mut self, layer: ContextConfig) {
        self.layers.push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(ContextConfig::is_empty)
    }

    pub fn tool_fields(&self, name: &str) -> ContextFields {
        self.collect(|layer| layer.tools.get(name))
    }

    pub fn prompt_fields(&self, name: &str) -> ContextFields {
        self.collect(|layer| layer.prompts.get(name))
    }

    pub fn resource_fields(&self, uri: &str) -> ContextFields {
        self.collect(|layer| {
            layer
                .resources
                .iter()
                .find(|p| p.matches(uri))
                .map(|p| &p.fields)
        })
    }

    fn collect<'a>(&'a self, pick: impl Fn(&'a ContextConfig) -> Option<&'a ContextFields>) -> ContextFields {
        let mut merged = ContextFields::new();
        for fields in self.layers.iter().filter_map(pick) {
            merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged
    }

    /// Annotate every matching entity. Returns how many were touched.
    pub fn apply(&self, doc: &mut ServerDoc) -> usize {
        let mut annotated = 0;

        for tool in &mut doc.tools {
            annotated += splay(&mut tool.context, self.tool_fields(&tool.name));
        }
        for resource in &mut doc.resources {
            annotated += splay(&mut resource.context, self.resource_fields(&resource.uri));
        }
        for prompt in &mut doc.prompts {
            annotated += splay(&mut prompt.context, self.prompt_fields(&prompt.name));
        }

        tracing::info!(name: "context.applied", layers = self.layers.len(), annotated, "Context applied");
        annotated
    }
}

fn splay(target: &mut ContextFields, fields: ContextFields) -> usize {
    if fields.is_empty() {
        return 0;
    }
    target.extend(fields);
    1
}
