//! Backend state management
//!
//! This module defines the MarkdocBackend struct, which holds the open
//! documents, the active symbol registry snapshot and the negotiated client
//! preferences.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use tower_lsp::Client;
use tower_lsp::lsp_types::Url;

use crate::lsp::models::{DocumentationFormat, LspDocument};
use crate::lsp::symbol_registry::Symbols;

/// Configuration resolved before the server starts serving requests
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    /// Symbol file given on the command line, read again whenever client
    /// settings name no other source
    pub config_path: Option<PathBuf>,
    /// Registry served until the client sends settings
    pub symbols: Symbols,
}

/// The Markdoc language server backend, managing state and handling LSP requests.
#[derive(Clone)]
pub struct MarkdocBackend {
    pub(super) client: Client,
    pub(super) documents: Arc<DashMap<Url, LspDocument>>,
    /// Each request loads one snapshot; configuration reload swaps it.
    pub(super) symbols: Arc<ArcSwap<Symbols>>,
    pub(super) markdown_documentation: Arc<AtomicBool>,
    pub(super) config_path: Option<Arc<PathBuf>>,
}

impl MarkdocBackend {
    pub(super) fn documentation_format(&self) -> DocumentationFormat {
        if self.markdown_documentation.load(Ordering::Relaxed) {
            DocumentationFormat::Markdown
        } else {
            DocumentationFormat::PlainText
        }
    }

    pub(super) fn set_documentation_format(&self, format: DocumentationFormat) {
        self.markdown_documentation
            .store(format == DocumentationFormat::Markdown, Ordering::Relaxed);
    }
}

// Manual Debug implementation since Client doesn't implement a useful one
impl std::fmt::Debug for MarkdocBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbols = self.symbols.load();
        f.debug_struct("MarkdocBackend")
            .field("documents_count", &self.documents.len())
            .field("tags", &symbols.tag_count())
            .field("functions", &symbols.function_count())
            .field("config_path", &self.config_path)
            .finish()
    }
}
