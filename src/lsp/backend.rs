use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use ropey::Rope;
use serde_json::Value;

use tower_lsp::Client;
use tower_lsp::lsp_types::{CompletionItem, Diagnostic, MessageType, Position, Url};

use tracing::{debug, error, info, warn};

use crate::lsp::config::{ConfigError, ServerSettings};
use crate::lsp::features::coordinator::{self, Response};
use crate::lsp::features::diagnostics::validate_document;
use crate::lsp::symbol_registry::Symbols;

mod handlers;
mod state;

pub use state::{MarkdocBackend, StartupConfig};

impl MarkdocBackend {
    /// Creates a new backend serving `startup.symbols` until the client sends
    /// its own settings.
    pub fn new(client: Client, startup: StartupConfig) -> Self {
        info!(
            "Creating Markdoc backend: {} tags, {} functions",
            startup.symbols.tag_count(),
            startup.symbols.function_count()
        );
        Self {
            client,
            documents: Arc::new(DashMap::new()),
            symbols: Arc::new(ArcSwap::from_pointee(startup.symbols)),
            markdown_documentation: Arc::new(AtomicBool::new(false)),
            config_path: startup.config_path.map(Arc::new),
        }
    }

    /// The registry snapshot currently in effect.
    pub fn symbols(&self) -> Arc<Symbols> {
        self.symbols.load_full()
    }

    /// Completion items for the symbol at `position` in an open document.
    pub fn provide_completions(&self, uri: &Url, position: Position) -> Vec<CompletionItem> {
        self.respond(uri, position)
            .map(|response| response.items)
            .unwrap_or_default()
    }

    /// The diagnostic explaining why nothing resolves at `position` in an
    /// open document, if any.
    pub fn provide_diagnostics(&self, uri: &Url, position: Position) -> Vec<Diagnostic> {
        self.respond(uri, position)
            .map(|response| response.diagnostics)
            .unwrap_or_default()
    }

    /// Runs the coordinator against one registry snapshot. `None` when the
    /// document is not open.
    pub(super) fn respond(&self, uri: &Url, position: Position) -> Option<Response> {
        let Some(text) = self.document_text(uri) else {
            warn!("Failed to find document with URI={}", uri);
            return None;
        };
        let symbols = self.symbols.load_full();
        Some(coordinator::respond(&text, &position, &symbols, self.documentation_format()))
    }

    /// Clones the rope so no map guard is held across an await.
    pub(super) fn document_text(&self, uri: &Url) -> Option<Rope> {
        self.documents.get(uri).map(|document| document.text.clone())
    }

    /// Validates an open document and publishes the result, together with
    /// any extra diagnostics not already reported for the same range and code.
    pub(super) async fn publish_diagnostics(&self, uri: &Url, extra: Vec<Diagnostic>) {
        let Some((text, version)) = self
            .documents
            .get(uri)
            .map(|document| (document.text.clone(), document.version))
        else {
            debug!("Skipping diagnostics for closed document {}", uri);
            return;
        };

        let symbols = self.symbols.load_full();
        let diagnostics = merge_diagnostics(validate_document(&text, &symbols), extra);
        debug!("Publishing {} diagnostics for {} (version {})", diagnostics.len(), uri, version);
        self.client
            .publish_diagnostics(uri.clone(), diagnostics, Some(version))
            .await;
    }

    /// Replaces the registry snapshot from a settings payload.
    pub(super) fn apply_settings(&self, value: &Value) -> Result<(), ConfigError> {
        let settings = ServerSettings::from_value(value)?;
        let config = settings.resolve(self.config_path.as_deref().map(|path| path.as_path()))?;
        let symbols = Symbols::load(&config)?;
        info!(
            "Loaded symbol registry: {} tags, {} functions (builtins: {})",
            symbols.tag_count(),
            symbols.function_count(),
            config.include_builtins
        );
        self.symbols.store(Arc::new(symbols));
        Ok(())
    }

    /// Applies new settings, keeping the previous snapshot when they are
    /// invalid. Returns whether the registry changed.
    pub(super) async fn reload(&self, value: &Value) -> bool {
        match self.apply_settings(value) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to load Markdoc configuration: {}", e);
                self.client
                    .show_message(MessageType::ERROR, format!("Markdoc configuration error: {}", e))
                    .await;
                false
            }
        }
    }

    /// Re-validates every open document against the current snapshot.
    pub(super) async fn revalidate_all(&self) {
        let uris: Vec<Url> = self.documents.iter().map(|entry| entry.key().clone()).collect();
        for uri in uris {
            self.publish_diagnostics(&uri, Vec::new()).await;
        }
    }
}

/// Appends `extra` to `diagnostics`, skipping entries whose range and code
/// are already present.
pub(crate) fn merge_diagnostics(mut diagnostics: Vec<Diagnostic>, extra: Vec<Diagnostic>) -> Vec<Diagnostic> {
    for diagnostic in extra {
        let duplicate = diagnostics
            .iter()
            .any(|existing| existing.range == diagnostic.range && existing.code == diagnostic.code);
        if !duplicate {
            diagnostics.push(diagnostic);
        }
    }
    diagnostics
}
