use ropey::Rope;
use thiserror::Error;

use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, Url};

pub use crate::lsp::models::LspDocument;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("version {received} is not newer than {current}")]
    StaleVersion { current: i32, received: i32 },
}

/// Converts an LSP position to a char index in the Rope.
///
/// The line is clamped to the last line and the character to the end of its
/// line (excluding the line break), so positions past the end never panic.
fn position_to_char(text: &Rope, position: &Position) -> usize {
    let line = position.line as usize;
    if line >= text.len_lines() {
        return text.len_chars();
    }
    let line_start = text.line_to_char(line);
    let line_slice = text.line(line);
    let mut line_len = line_slice.len_chars();
    while line_len > 0 && matches!(line_slice.char(line_len - 1), '\n' | '\r') {
        line_len -= 1;
    }
    line_start + (position.character as usize).min(line_len)
}

/// Converts an LSP position to a byte offset in the Rope.
pub fn position_to_offset(text: &Rope, position: &Position) -> usize {
    text.char_to_byte(position_to_char(text, position))
}

/// Converts a byte offset into an LSP position.
///
/// Offsets inside a multi-byte character resolve to that character.
pub fn offset_to_position(text: &Rope, offset: usize) -> Position {
    let char_idx = text.byte_to_char(offset.min(text.len_bytes()));
    let line = text.char_to_line(char_idx);
    let character = char_idx - text.line_to_char(line);
    Position::new(line as u32, character as u32)
}

impl LspDocument {
    pub fn new(uri: Url, version: i32, text: &str) -> Self {
        Self {
            uri,
            version,
            text: Rope::from_str(text),
        }
    }

    /// Returns the current text of the document as a string.
    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// Returns the byte offset of `position` within the document.
    pub fn offset_at(&self, position: &Position) -> usize {
        position_to_offset(&self.text, position)
    }

    /// Returns the LSP position of a byte offset within the document.
    pub fn position_at(&self, offset: usize) -> Position {
        offset_to_position(&self.text, offset)
    }

    /// Applies a list of content changes, in order, if `version` is newer
    /// than the current one.
    pub fn apply(
        &mut self,
        changes: Vec<TextDocumentContentChangeEvent>,
        version: i32,
    ) -> Result<(), DocumentError> {
        if version <= self.version {
            return Err(DocumentError::StaleVersion { current: self.version, received: version });
        }
        for change in changes {
            if let Some(range) = change.range {
                let start = position_to_char(&self.text, &range.start);
                let end = position_to_char(&self.text, &range.end).max(start);
                self.text.remove(start..end);
                self.text.insert(start, &change.text);
            } else {
                self.text = Rope::from_str(&change.text);
            }
        }
        self.version = version;
        Ok(())
    }
}
