//! Diagnostics for symbols that cannot be resolved
//!
//! Two producers feed the same mapper:
//! - the completion path, when the token under the cursor matches nothing
//! - document validation, which checks every complete tag, attribute and
//!   function name in closed `{% ... %}` constructs with exact lookups
//!
//! Every diagnostic is a warning: an unknown name in a document being edited
//! is expected and never blocks anything.

use std::ops::Range;

use ropey::Rope;
use tracing::{debug, error};

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Range as LspRange};

use crate::lsp::document::offset_to_position;
use crate::lsp::features::completion::context::{tag_bodies, Slot, TagScan};
use crate::lsp::features::completion::ResolutionFailure;
use crate::lsp::models::ErrorType;
use crate::lsp::symbol_registry::Symbols;

/// Value of `Diagnostic::source` for everything this server reports
pub const DIAGNOSTIC_SOURCE: &str = "markdoc";

/// Build the editor diagnostic for a resolution failure.
pub fn to_diagnostic(failure: &ResolutionFailure, range: LspRange) -> Diagnostic {
    let error_type = failure.error_type();
    match error_type {
        ErrorType::UnknownError => error!("Internal resolution error at {:?}: {}", range, failure),
        _ => debug!("Unresolved symbol ({}) at {:?}: {}", error_type, range, failure),
    }

    Diagnostic {
        range,
        severity: Some(DiagnosticSeverity::WARNING),
        code: Some(NumberOrString::String(error_type.as_str().to_string())),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: failure.to_string(),
        ..Default::default()
    }
}

/// Converts a byte range of `text` into an LSP range.
pub fn to_lsp_range(text: &Rope, range: &Range<usize>) -> LspRange {
    LspRange::new(offset_to_position(text, range.start), offset_to_position(text, range.end))
}

/// Find every complete symbol name in closed constructs of `text` that the
/// registry does not know, with its byte range.
///
/// Only names that are unambiguous are checked: tag names, attribute names
/// followed by `=`, and any name followed by `(`, which is a function call.
/// Barewords in value or primary positions (`{% if true %}`) are left alone.
/// Attributes of an unknown tag are not reported separately.
pub fn find_unresolved(text: &str, symbols: &Symbols) -> Vec<(Range<usize>, ResolutionFailure)> {
    let mut unresolved = Vec::new();

    for (body_start, body) in tag_bodies(text) {
        let scan = TagScan::new(body);
        let host_known = scan.tag.is_some_and(|tag| symbols.lookup_tag(tag));

        for token in &scan.tokens {
            let name = &body[token.range.clone()];
            let next = body[token.range.end..].chars().next();
            let range = body_start + token.range.start..body_start + token.range.end;

            let failure = match (token.slot, next) {
                (Slot::TagName | Slot::AttributeName | Slot::Value, Some('(')) if !symbols.lookup_function(name) => {
                    ResolutionFailure::AttributeOrFunctionMissing { partial: name.to_string() }
                }
                (Slot::TagName, next) if next != Some('(') && !symbols.lookup_tag(name) => {
                    ResolutionFailure::TagMissing { name: name.to_string(), as_attribute_host: false }
                }
                (Slot::AttributeName, Some('=')) if host_known => match scan.tag {
                    Some(tag) if !symbols.lookup_attribute(tag, name) => ResolutionFailure::AttributeMissing {
                        tag: tag.to_string(),
                        partial: name.to_string(),
                    },
                    _ => continue,
                },
                _ => continue,
            };
            unresolved.push((range, failure));
        }
    }

    unresolved
}

/// Validate a whole document and return its diagnostics.
pub fn validate_document(text: &Rope, symbols: &Symbols) -> Vec<Diagnostic> {
    let source = text.to_string();
    find_unresolved(&source, symbols)
        .iter()
        .map(|(range, failure)| to_diagnostic(failure, to_lsp_range(text, range)))
        .collect()
}
