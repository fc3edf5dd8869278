//! Server settings and symbol configuration sources
//!
//! Symbols reach the server through three channels, in decreasing priority:
//! 1. An inline `symbols` object in the initialization options or in a
//!    `workspace/didChangeConfiguration` payload
//! 2. A `configPath` setting pointing at a JSON file
//! 3. The `--config` command line argument (or `MARKDOC_LS_CONFIG`)
//!
//! Two JSON shapes are accepted for a symbol source: a flat list form
//! (`{"tags": [..], "functions": [..], "attributes": {"tag": [..]}}`) and the
//! Markdoc schema form, where tags and functions are objects keyed by name.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::lsp::models::CompletionType;

/// Settings section name used by clients that namespace their configuration
pub const SETTINGS_SECTION: &str = "markdoc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {kind} name {name:?}: names may only contain ASCII letters, digits, '_' and '-'")]
    InvalidName { kind: CompletionType, name: String },

    #[error("malformed symbol configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("failed to read symbol configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Symbols as plain name lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlatSymbols {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, Vec<String>>,
}

/// Symbols in the shape of a Markdoc schema configuration
///
/// Only names and descriptions are read; render targets, validation rules and
/// other schema fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaSymbols {
    #[serde(default)]
    pub tags: IndexMap<String, TagSchema>,
    #[serde(default)]
    pub functions: IndexMap<String, FunctionSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TagSchema {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AttributeSchema {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FunctionSchema {
    #[serde(default)]
    pub description: Option<String>,
}

/// A symbol source in either accepted shape
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SymbolSource {
    Flat(FlatSymbols),
    Schema(SchemaSymbols),
}

impl SymbolSource {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a symbol source from a JSON file.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Read symbol configuration from {}", path.display());
        Self::from_json(&text)
    }
}

/// Everything needed to build a registry snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolsConfig {
    /// Merge the Markdoc built-in tags and functions in front of `source`
    pub include_builtins: bool,
    pub source: Option<SymbolSource>,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self { include_builtins: true, source: None }
    }
}

/// Client-provided settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    #[serde(default = "default_include_builtins")]
    pub include_builtins: bool,
    #[serde(default)]
    pub config_path: Option<PathBuf>,
    #[serde(default)]
    pub symbols: Option<SymbolSource>,
}

fn default_include_builtins() -> bool {
    true
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            include_builtins: default_include_builtins(),
            config_path: None,
            symbols: None,
        }
    }
}

impl ServerSettings {
    /// Parses settings from initialization options or a configuration change
    /// payload. The `markdoc` wrapper object is optional; `null` yields the
    /// defaults.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let value = value.get(SETTINGS_SECTION).unwrap_or(value);
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(ServerSettings::deserialize(value)?)
    }

    /// Resolves the settings into a registry configuration, reading
    /// `config_path` (or `fallback_path`) when no inline symbols are given.
    pub fn resolve(&self, fallback_path: Option<&Path>) -> Result<SymbolsConfig, ConfigError> {
        let source = match (&self.symbols, &self.config_path, fallback_path) {
            (Some(symbols), _, _) => Some(symbols.clone()),
            (None, Some(path), _) => Some(SymbolSource::read(path)?),
            (None, None, Some(path)) => Some(SymbolSource::read(path)?),
            (None, None, None) => None,
        };
        Ok(SymbolsConfig {
            include_builtins: self.include_builtins,
            source,
        })
    }
}
