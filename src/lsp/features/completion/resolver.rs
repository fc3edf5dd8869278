//! Resolution of a classified completion context against the symbol registry

use thiserror::Error;

use crate::lsp::models::{CompletionType, ErrorType};
use crate::lsp::symbol_registry::{is_symbol_char, is_symbol_name, SymbolInfo, Symbols};

use super::context::CompletionContext;

/// A registry entry matching the typed prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub completion_type: CompletionType,
    pub description: Option<String>,
}

impl Candidate {
    fn new(label: &str, completion_type: CompletionType, info: &SymbolInfo) -> Self {
        Self {
            label: label.to_string(),
            completion_type,
            description: info.description.clone(),
        }
    }
}

/// Why a context could not be resolved to any symbol
///
/// The `Display` text is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    /// No tag matches, or the tag enclosing an attribute list is unknown
    #[error("{}", tag_missing_message(.name, *.as_attribute_host))]
    TagMissing { name: String, as_attribute_host: bool },

    #[error("No matching attribute for this tag: `{tag}` declares no attribute `{partial}`")]
    AttributeMissing { tag: String, partial: String },

    /// No function matches. Shared with attribute misses in positions where a
    /// bareword could be either.
    #[error("{}", with_token("No matching attribute or function", .partial))]
    AttributeOrFunctionMissing { partial: String },

    /// Reserved for a validation pass that checks required values; never
    /// produced by [`resolve`].
    #[error("{}", with_token("Missing value", .name))]
    ValueMissing { name: String },

    /// Internal invariant violation
    #[error("Unable to resolve symbol: {reason}")]
    Unknown { reason: String },
}

impl ResolutionFailure {
    pub fn error_type(&self) -> ErrorType {
        match self {
            ResolutionFailure::TagMissing { .. } => ErrorType::TagMissing,
            ResolutionFailure::AttributeMissing { .. } => ErrorType::AttributeMissing,
            ResolutionFailure::AttributeOrFunctionMissing { .. } => ErrorType::AttributeOrFnMissing,
            ResolutionFailure::ValueMissing { .. } => ErrorType::ValueMissing,
            ResolutionFailure::Unknown { .. } => ErrorType::UnknownError,
        }
    }
}

fn tag_missing_message(name: &str, as_attribute_host: bool) -> String {
    if as_attribute_host {
        with_token("Enclosing tag for this attribute does not exist", name)
    } else {
        with_token("Unknown tag", name)
    }
}

fn with_token(message: &str, token: &str) -> String {
    if token.is_empty() {
        message.to_string()
    } else {
        format!("{}: `{}`", message, token)
    }
}

/// Resolve a completion context to the registry entries starting with the
/// typed prefix, in registry order.
///
/// Matching is a case-sensitive prefix test. The function is pure: the same
/// context and snapshot always produce the same result.
pub fn resolve(context: &CompletionContext, symbols: &Symbols) -> Result<Vec<Candidate>, ResolutionFailure> {
    let partial = context.partial();
    if !partial.chars().all(is_symbol_char) {
        return Err(ResolutionFailure::Unknown {
            reason: format!("partial token {:?} contains non-symbol characters", partial),
        });
    }

    match context {
        CompletionContext::Tag { partial } => {
            let candidates = prefixed(symbols.tags(), partial, CompletionType::Tag);
            if candidates.is_empty() {
                return Err(ResolutionFailure::TagMissing {
                    name: partial.clone(),
                    as_attribute_host: false,
                });
            }
            Ok(candidates)
        }
        CompletionContext::Function { partial } => {
            let candidates = prefixed(symbols.functions(), partial, CompletionType::Function);
            if candidates.is_empty() {
                return Err(ResolutionFailure::AttributeOrFunctionMissing { partial: partial.clone() });
            }
            Ok(candidates)
        }
        CompletionContext::Attribute { tag, partial } => {
            if !is_symbol_name(tag) {
                return Err(ResolutionFailure::Unknown {
                    reason: format!("enclosing tag name {:?} is not a symbol name", tag),
                });
            }
            if !symbols.lookup_tag(tag) {
                return Err(ResolutionFailure::TagMissing {
                    name: tag.clone(),
                    as_attribute_host: true,
                });
            }
            let candidates = prefixed(symbols.attributes_for(tag), partial, CompletionType::Attribute);
            if candidates.is_empty() {
                return Err(ResolutionFailure::AttributeMissing {
                    tag: tag.clone(),
                    partial: partial.clone(),
                });
            }
            Ok(candidates)
        }
    }
}

fn prefixed<'a>(
    names: impl Iterator<Item = (&'a str, &'a SymbolInfo)>,
    partial: &str,
    completion_type: CompletionType,
) -> Vec<Candidate> {
    names
        .filter(|(name, _)| name.starts_with(partial))
        .map(|(name, info)| Candidate::new(name, completion_type, info))
        .collect()
}
