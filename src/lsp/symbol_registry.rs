//! Registry of the tags, functions and attributes known to the server
//!
//! A [`Symbols`] value is an immutable snapshot built once per configuration
//! load. Request handlers share it through an `Arc` and never mutate it; a
//! configuration change builds a fresh snapshot that replaces the old one.
//!
//! All lookups are case-sensitive exact membership tests. Prefix filtering
//! for completion lives in the resolver.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tracing::debug;

use crate::lsp::config::{ConfigError, SymbolSource, SymbolsConfig};
use crate::lsp::models::CompletionType;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Markdoc built-in tags and the attributes each one declares
pub(crate) const BUILTIN_TAGS: &[(&str, &str, &[&str])] = &[
    ("if", "Conditionally render the enclosed content", &[]),
    ("else", "Fallback branch of an `if` tag", &[]),
    ("table", "Render a list of lists as a table", &[]),
    ("partial", "Render the contents of another file", &["file", "variables"]),
    ("slot", "Named content slot passed to a parent tag", &["name"]),
];

/// Markdoc built-in functions
pub(crate) const BUILTIN_FUNCTIONS: &[(&str, &str)] = &[
    ("and", "`true` when every argument is truthy"),
    ("or", "`true` when any argument is truthy"),
    ("not", "Negate a boolean value"),
    ("equals", "`true` when all arguments are equal"),
    ("default", "Return the second argument when the first is undefined"),
    ("debug", "Serialize the value as JSON for inspection"),
];

/// Returns true for characters allowed in tag, function and attribute names
pub fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Returns true if `name` is a well-formed symbol name
pub fn is_symbol_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_symbol_char)
}

/// Per-symbol payload kept alongside each registered name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolInfo {
    /// Human-readable description shown in completion documentation
    pub description: Option<String>,
}

/// Immutable snapshot of every known symbol
///
/// Iteration follows insertion order, so completion candidates come out in
/// the order the configuration declared them.
#[derive(Debug, Clone, Default)]
pub struct Symbols {
    tags: FxIndexMap<String, SymbolInfo>,
    functions: FxIndexMap<String, SymbolInfo>,
    attributes: FxIndexMap<String, FxIndexMap<String, SymbolInfo>>,
}

impl Symbols {
    /// Builds a snapshot from configuration, merging the Markdoc builtins in
    /// front of the configured symbols when requested.
    pub fn load(config: &SymbolsConfig) -> Result<Self, ConfigError> {
        let mut builder = SymbolsBuilder::default();

        if config.include_builtins {
            for (tag, description, attributes) in BUILTIN_TAGS {
                builder.tag(tag, Some(*description))?;
                for attribute in attributes.iter() {
                    builder.attribute(tag, attribute, None)?;
                }
            }
            for (function, description) in BUILTIN_FUNCTIONS {
                builder.function(function, Some(*description))?;
            }
        }

        if let Some(source) = &config.source {
            builder.extend(source)?;
        }

        let symbols = builder.build();
        debug!(
            "Loaded symbol registry: {} tags, {} functions, {} tags with attributes",
            symbols.tags.len(),
            symbols.functions.len(),
            symbols.attributes.len()
        );
        Ok(symbols)
    }

    /// Builds a snapshot from a single source without any builtins.
    pub fn from_source(source: &SymbolSource) -> Result<Self, ConfigError> {
        Self::load(&SymbolsConfig {
            include_builtins: false,
            source: Some(source.clone()),
        })
    }

    pub fn lookup_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn lookup_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn lookup_attribute(&self, tag: &str, name: &str) -> bool {
        self.attributes
            .get(tag)
            .is_some_and(|attributes| attributes.contains_key(name))
    }

    /// Attributes declared for `tag`; empty when the tag declares none or is unknown.
    pub fn attributes_for<'a>(&'a self, tag: &str) -> impl Iterator<Item = (&'a str, &'a SymbolInfo)> + use<'a> {
        self.attributes
            .get(tag)
            .into_iter()
            .flat_map(|attributes| attributes.iter().map(|(name, info)| (name.as_str(), info)))
    }

    pub fn tags(&self) -> impl Iterator<Item = (&str, &SymbolInfo)> {
        self.tags.iter().map(|(name, info)| (name.as_str(), info))
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &SymbolInfo)> {
        self.functions.iter().map(|(name, info)| (name.as_str(), info))
    }

    /// Looks up the payload of a symbol by completion category.
    ///
    /// Attributes are keyed per tag, so `tag` is required for
    /// [`CompletionType::Attribute`] and ignored otherwise.
    pub fn info(&self, kind: CompletionType, name: &str, tag: Option<&str>) -> Option<&SymbolInfo> {
        match kind {
            CompletionType::Tag => self.tags.get(name),
            CompletionType::Function => self.functions.get(name),
            CompletionType::Attribute => self.attributes.get(tag?)?.get(name),
        }
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

/// Accumulates validated names before freezing them into a [`Symbols`]
#[derive(Debug, Default)]
struct SymbolsBuilder {
    symbols: Symbols,
}

impl SymbolsBuilder {
    fn tag(&mut self, name: &str, description: Option<&str>) -> Result<(), ConfigError> {
        check_name(CompletionType::Tag, name)?;
        insert_first(&mut self.symbols.tags, name, description);
        Ok(())
    }

    fn function(&mut self, name: &str, description: Option<&str>) -> Result<(), ConfigError> {
        check_name(CompletionType::Function, name)?;
        insert_first(&mut self.symbols.functions, name, description);
        Ok(())
    }

    fn attribute(&mut self, tag: &str, name: &str, description: Option<&str>) -> Result<(), ConfigError> {
        check_name(CompletionType::Tag, tag)?;
        check_name(CompletionType::Attribute, name)?;
        let attributes = self.symbols.attributes.entry(tag.to_string()).or_default();
        insert_first(attributes, name, description);
        Ok(())
    }

    fn extend(&mut self, source: &SymbolSource) -> Result<(), ConfigError> {
        match source {
            SymbolSource::Flat(flat) => {
                for tag in &flat.tags {
                    self.tag(tag, None)?;
                }
                for function in &flat.functions {
                    self.function(function, None)?;
                }
                for (tag, attributes) in &flat.attributes {
                    for attribute in attributes {
                        self.attribute(tag, attribute, None)?;
                    }
                }
            }
            SymbolSource::Schema(schema) => {
                for (tag, tag_schema) in &schema.tags {
                    self.tag(tag, tag_schema.description.as_deref())?;
                    for (attribute, attribute_schema) in &tag_schema.attributes {
                        self.attribute(tag, attribute, attribute_schema.description.as_deref())?;
                    }
                }
                for (function, function_schema) in &schema.functions {
                    self.function(function, function_schema.description.as_deref())?;
                }
            }
        }
        Ok(())
    }

    fn build(self) -> Symbols {
        self.symbols
    }
}

fn check_name(kind: CompletionType, name: &str) -> Result<(), ConfigError> {
    if is_symbol_name(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidName { kind, name: name.to_string() })
    }
}

/// Set semantics: the first declaration of a name keeps its position, a later
/// one only fills in a missing description.
fn insert_first(map: &mut FxIndexMap<String, SymbolInfo>, name: &str, description: Option<&str>) {
    let info = map.entry(name.to_string()).or_default();
    if info.description.is_none() {
        info.description = description.map(str::to_string);
    }
}
