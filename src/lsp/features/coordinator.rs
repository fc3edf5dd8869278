//! Request coordination: classifier → resolver → diagnostic mapper
//!
//! Everything here is a pure function of the document text, the cursor and
//! the registry snapshot, so a response superseded by a newer edit can simply
//! be dropped by the caller.

use std::ops::Range;

use ropey::Rope;
use tracing::debug;

use tower_lsp::lsp_types::{
    CompletionItem, Diagnostic, Documentation, MarkupContent, MarkupKind, Position,
};

use crate::lsp::document::position_to_offset;
use crate::lsp::features::completion::context::floor_char_boundary;
use crate::lsp::features::completion::{classify, resolve, Candidate, ResolutionFailure};
use crate::lsp::features::diagnostics::{to_diagnostic, to_lsp_range};
use crate::lsp::models::{CompletionData, DocumentationFormat};
use crate::lsp::symbol_registry::Symbols;

/// Outcome of resolving the symbol at a cursor offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The cursor is not where a symbol name can appear
    NoContext,
    Candidates(Vec<Candidate>),
    Failure {
        /// Byte range of the partial token under the cursor
        span: Range<usize>,
        failure: ResolutionFailure,
    },
}

/// Completion items and cursor diagnostics for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub items: Vec<CompletionItem>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Classify and resolve the symbol at a byte offset of `text`.
pub fn resolve_at(text: &str, offset: usize, symbols: &Symbols) -> Resolution {
    let offset = floor_char_boundary(text, offset);
    let Some(context) = classify(text, offset) else {
        return Resolution::NoContext;
    };

    match resolve(&context, symbols) {
        Ok(candidates) => {
            debug!("{} {} candidates for {:?}", candidates.len(), context.completion_type(), context.partial());
            Resolution::Candidates(candidates)
        }
        Err(failure) => Resolution::Failure {
            span: offset - context.partial().len()..offset,
            failure,
        },
    }
}

/// Build the full response for a cursor position.
pub fn respond(text: &Rope, position: &Position, symbols: &Symbols, format: DocumentationFormat) -> Response {
    let source = text.to_string();
    let offset = position_to_offset(text, position);

    match resolve_at(&source, offset, symbols) {
        Resolution::NoContext => Response::default(),
        Resolution::Candidates(candidates) => Response {
            items: candidates.iter().map(|candidate| completion_item(candidate, format)).collect(),
            diagnostics: Vec::new(),
        },
        Resolution::Failure { span, failure } => Response {
            items: Vec::new(),
            diagnostics: vec![to_diagnostic(&failure, to_lsp_range(text, &span))],
        },
    }
}

/// Completion candidates at `position`; empty when there is no context or
/// nothing matches.
pub fn provide_completions(
    text: &Rope,
    position: &Position,
    symbols: &Symbols,
    format: DocumentationFormat,
) -> Vec<CompletionItem> {
    respond(text, position, symbols, format).items
}

/// The diagnostic explaining why nothing matches at `position`; empty when
/// there is no context or resolution succeeds.
pub fn provide_diagnostics(text: &Rope, position: &Position, symbols: &Symbols) -> Vec<Diagnostic> {
    respond(text, position, symbols, DocumentationFormat::default()).diagnostics
}

/// Convert a candidate to an LSP completion item.
pub fn completion_item(candidate: &Candidate, format: DocumentationFormat) -> CompletionItem {
    let data = CompletionData { completion_type: candidate.completion_type };
    let documentation = candidate.description.as_ref().map(|description| match format {
        DocumentationFormat::Markdown => Documentation::MarkupContent(MarkupContent {
            kind: MarkupKind::Markdown,
            value: description.clone(),
        }),
        DocumentationFormat::PlainText => Documentation::String(description.clone()),
    });

    CompletionItem {
        label: candidate.label.clone(),
        kind: Some(candidate.completion_type.item_kind()),
        detail: Some(candidate.completion_type.to_string()),
        documentation,
        data: serde_json::to_value(data).ok(),
        ..Default::default()
    }
}
