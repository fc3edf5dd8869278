//! Context detection for code completion
//!
//! This module determines what kind of symbol is being typed at a cursor
//! offset. Markdoc embeds its constructs in `{% ... %}` delimiters:
//!
//! ```text
//! {% callout type="note" title=upper($title) %}
//!    ^^^^^^^ ^^^^        ^^^^^ ^^^^^
//!    tag     attribute   attr  function
//! ```
//!
//! Three completion contexts exist:
//! 1. Tag name: right after `{%` (or `{% /` for a closing tag)
//! 2. Function name: at a value position (after `=`, or at an argument slot
//!    of an open function call or array)
//! 3. Attribute name: at a whitespace-separated slot of a tag's attribute list
//!
//! Everything else (plain Markdown, strings, `$variables`, `.class` and `#id`
//! shorthands, numbers) has no completion context.

use std::ops::Range;

use tracing::trace;

use crate::lsp::models::CompletionType;
use crate::lsp::symbol_registry::is_symbol_char;

/// Opens a Markdoc tag
pub const TAG_OPEN: &str = "{%";
/// Closes a Markdoc tag
pub const TAG_CLOSE: &str = "%}";

/// Completion context at a cursor position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// Typing a tag name
    Tag { partial: String },

    /// Typing a function name in a value position
    Function { partial: String },

    /// Typing an attribute name inside the attribute list of `tag`
    Attribute {
        /// Enclosing tag whose attributes are searched
        tag: String,
        partial: String,
    },
}

impl CompletionContext {
    /// Characters already typed at the cursor, used as a prefix filter
    pub fn partial(&self) -> &str {
        match self {
            CompletionContext::Tag { partial }
            | CompletionContext::Function { partial }
            | CompletionContext::Attribute { partial, .. } => partial,
        }
    }

    pub fn completion_type(&self) -> CompletionType {
        match self {
            CompletionContext::Tag { .. } => CompletionType::Tag,
            CompletionContext::Function { .. } => CompletionType::Function,
            CompletionContext::Attribute { .. } => CompletionType::Attribute,
        }
    }
}

/// Classify the editing context at `offset` (a byte offset into `text`).
///
/// Returns `None` when the cursor is not inside an open tag, or sits somewhere
/// inside it where no symbol name can appear. Offsets past the end of the text
/// or inside a multi-byte character are moved back to the nearest boundary.
pub fn classify(text: &str, offset: usize) -> Option<CompletionContext> {
    let offset = floor_char_boundary(text, offset);
    let before = &text[..offset];
    let open = find_open_tag(before)?;
    let body = &before[open + TAG_OPEN.len()..];

    let scan = TagScan::new(body);
    if scan.in_string {
        trace!("Cursor at {} is inside a string literal", offset);
        return None;
    }

    let (slot, partial) = match scan.tokens.last() {
        Some(token) if token.range.end == body.len() => (token.slot, &body[token.range.clone()]),
        _ => (scan.end_slot, ""),
    };
    let partial = partial.to_string();

    let context = match slot {
        Slot::TagName => Some(CompletionContext::Tag { partial }),
        Slot::Value => Some(CompletionContext::Function { partial }),
        Slot::AttributeName => scan
            .tag
            .map(|tag| CompletionContext::Attribute { tag: tag.to_string(), partial }),
        Slot::Other => None,
    };
    trace!("Classified offset {} as {:?}", offset, context);
    context
}

/// Largest char boundary not greater than `offset`
pub(crate) fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Byte index of the nearest `{%` before the end of `before` that no `%}`
/// has closed yet.
fn find_open_tag(before: &str) -> Option<usize> {
    let open = before.rfind(TAG_OPEN)?;
    if before[open + TAG_OPEN.len()..].contains(TAG_CLOSE) {
        return None;
    }
    Some(open)
}

/// Iterates over the bodies of every closed `{% ... %}` construct in `text`,
/// yielding the byte offset of each body alongside it. An unterminated
/// construct at the end of the text is skipped.
pub(crate) fn tag_bodies(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        let open = cursor + text[cursor..].find(TAG_OPEN)?;
        let body_start = open + TAG_OPEN.len();
        let close = body_start + text[body_start..].find(TAG_CLOSE)?;
        cursor = close + TAG_CLOSE.len();
        Some((body_start, &text[body_start..close]))
    })
}

/// Syntactic role of a position inside a tag body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    TagName,
    AttributeName,
    Value,
    Other,
}

/// Nesting construct opened inside a tag body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Call,
    Array,
    Object,
}

/// A maximal run of symbol characters and the slot it starts in
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScannedToken {
    pub range: Range<usize>,
    pub slot: Slot,
}

/// Single forward pass over the body of a tag (the text after `{%`).
#[derive(Debug, Clone)]
pub(crate) struct TagScan<'a> {
    /// Tag whose attribute list this body is; `None` for closing tags,
    /// function calls in tag position and bodies without a name
    pub tag: Option<&'a str>,
    pub tokens: Vec<ScannedToken>,
    /// Slot a token starting at the end of the body would occupy
    pub end_slot: Slot,
    /// Whether the body ends inside an unterminated string literal
    pub in_string: bool,
}

impl<'a> TagScan<'a> {
    pub fn new(body: &'a str) -> Self {
        let mut pos = body.len() - body.trim_start().len();
        let closing = body[pos..].starts_with('/');
        if closing {
            pos += 1;
        }

        let name_len = body[pos..].find(|c: char| !is_symbol_char(c)).unwrap_or(body.len() - pos);
        let name_range = pos..pos + name_len;
        let rest = &body[name_range.end..];

        let mut scan = TagScan {
            tag: None,
            tokens: Vec::new(),
            end_slot: Slot::Other,
            in_string: false,
        };

        if rest.is_empty() {
            if name_len == 0 {
                scan.end_slot = Slot::TagName;
            } else {
                scan.tokens.push(ScannedToken { range: name_range, slot: Slot::TagName });
            }
            return scan;
        }

        let is_call = rest.starts_with('(');
        let separated = rest.starts_with(char::is_whitespace);
        if name_len == 0 || !(is_call || separated) {
            // `{% $variable %}`, `{% "text" %}` and other bodies without a
            // leading name never name a symbol
            return scan;
        }

        scan.tokens.push(ScannedToken { range: name_range.clone(), slot: Slot::TagName });
        if !closing && !is_call {
            scan.tag = Some(&body[name_range.clone()]);
        }
        scan.scan_attributes(body, name_range.end);
        scan
    }

    fn scan_attributes(&mut self, body: &str, start: usize) {
        let has_host = self.tag.is_some();
        let mut frames: Vec<Frame> = Vec::new();
        let mut escaped = false;
        // Last character seen, whitespace included
        let mut prev = body[..start].chars().next_back();
        // Last non-whitespace character outside of strings; 'a' stands for
        // "an identifier ended here"
        let mut significant = Some('a');
        let mut token: Option<(usize, Slot)> = None;

        for (i, c) in body[start..].char_indices().map(|(i, c)| (i + start, c)) {
            if self.in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                    significant = Some('"');
                }
                prev = Some(c);
                continue;
            }

            if is_symbol_char(c) {
                if token.is_none() {
                    let slot = if c.is_ascii_digit() || c == '-' {
                        Slot::Other
                    } else {
                        slot_for(prev, significant, &frames, has_host)
                    };
                    token = Some((i, slot));
                }
                prev = Some(c);
                continue;
            }

            if let Some((token_start, slot)) = token.take() {
                self.tokens.push(ScannedToken { range: token_start..i, slot });
                significant = Some('a');
            }

            match c {
                '"' => self.in_string = true,
                '(' => frames.push(Frame::Call),
                '[' => frames.push(Frame::Array),
                '{' => frames.push(Frame::Object),
                // Mismatched closers are tolerated; the innermost frame is
                // popped whatever it was
                ')' | ']' | '}' => {
                    frames.pop();
                }
                _ => {}
            }
            if !c.is_whitespace() {
                significant = Some(c);
            }
            prev = Some(c);
        }

        match token {
            Some((token_start, slot)) => {
                self.tokens.push(ScannedToken { range: token_start..body.len(), slot });
            }
            None if !self.in_string => {
                self.end_slot = slot_for(prev, significant, &frames, has_host);
            }
            None => {}
        }
    }
}

/// Decide the slot of a token from its surroundings.
///
/// * `prev` - the character immediately before the token
/// * `significant` - the last non-whitespace character before the token
/// * `frames` - open calls, arrays and objects, innermost last
/// * `has_host` - whether the body belongs to an opening tag with a name
fn slot_for(prev: Option<char>, significant: Option<char>, frames: &[Frame], has_host: bool) -> Slot {
    if matches!(prev, Some('$' | '.' | '#')) {
        return Slot::Other;
    }
    let separated = prev.is_some_and(char::is_whitespace);

    match (frames.last(), significant) {
        (None, Some('=')) => Slot::Value,
        (None, _) if separated && has_host => Slot::AttributeName,
        (Some(Frame::Call | Frame::Array), Some('(' | '[' | ',')) => Slot::Value,
        (Some(Frame::Object), Some(':')) => Slot::Value,
        _ => Slot::Other,
    }
}
