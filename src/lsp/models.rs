use std::fmt;

use ropey::Rope;
use serde::{Deserialize, Serialize};

use tower_lsp::lsp_types::{ClientCapabilities, CompletionItemKind, MarkupKind, Url};

/// Category of a completion candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionType {
    Function,
    Tag,
    Attribute,
}

impl CompletionType {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionType::Function => "function",
            CompletionType::Tag => "tag",
            CompletionType::Attribute => "attribute",
        }
    }

    /// LSP item kind used to render candidates of this category
    pub fn item_kind(self) -> CompletionItemKind {
        match self {
            CompletionType::Function => CompletionItemKind::FUNCTION,
            CompletionType::Tag => CompletionItemKind::KEYWORD,
            CompletionType::Attribute => CompletionItemKind::PROPERTY,
        }
    }
}

impl fmt::Display for CompletionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload attached to every completion item so a later resolve step knows
/// which registry category the label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionData {
    #[serde(rename = "type")]
    pub completion_type: CompletionType,
}

/// Closed set of reasons a symbol could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    ValueMissing,
    AttributeOrFnMissing,
    AttributeMissing,
    TagMissing,
    UnknownError,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::ValueMissing => "value_missing",
            ErrorType::AttributeOrFnMissing => "attribute_or_fn_missing",
            ErrorType::AttributeMissing => "attribute_missing",
            ErrorType::TagMissing => "tag_missing",
            ErrorType::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How completion documentation is rendered for the connected client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentationFormat {
    Markdown,
    #[default]
    PlainText,
}

impl DocumentationFormat {
    /// Markdown when the client lists it among its completion documentation formats.
    pub fn from_capabilities(capabilities: &ClientCapabilities) -> Self {
        let supports_markdown = capabilities
            .text_document
            .as_ref()
            .and_then(|text_document| text_document.completion.as_ref())
            .and_then(|completion| completion.completion_item.as_ref())
            .and_then(|item| item.documentation_format.as_ref())
            .is_some_and(|formats| formats.contains(&MarkupKind::Markdown));

        if supports_markdown {
            DocumentationFormat::Markdown
        } else {
            DocumentationFormat::PlainText
        }
    }
}

/// An open text document tracked by the server.
#[derive(Debug, Clone)]
pub struct LspDocument {
    pub uri: Url,
    pub version: i32,
    pub text: Rope,
}
