//! LSP protocol handler implementations
//!
//! This module contains the `tower_lsp::LanguageServer` trait implementation
//! for the Markdoc backend:
//! - Lifecycle handlers (initialize, initialized, shutdown)
//! - Document lifecycle (did_open, did_change, did_close)
//! - Configuration changes (did_change_configuration)
//! - Completion

use tower_lsp::{LanguageServer, jsonrpc};
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeConfigurationParams,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    InitializeParams, InitializeResult, InitializedParams, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind,
};

use tracing::{debug, info, warn};

use super::state::MarkdocBackend;
use crate::lsp::models::{DocumentationFormat, LspDocument};

/// Characters after which the client should ask for completions: tag opening
/// and closing slash, call parentheses, attribute separators.
const TRIGGER_CHARACTERS: &[&str] = &["%", " ", "(", "=", "/"];

#[tower_lsp::async_trait]
impl LanguageServer for MarkdocBackend {
    /// Handles the LSP initialize request, negotiating capabilities and
    /// loading settings passed as initialization options.
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("Received initialize: client={:?}", params.client_info.as_ref().map(|info| &info.name));

        let format = DocumentationFormat::from_capabilities(&params.capabilities);
        debug!("Completion documentation format: {:?}", format);
        self.set_documentation_format(format);

        if let Some(options) = &params.initialization_options {
            self.reload(options).await;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::INCREMENTAL)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(TRIGGER_CHARACTERS.iter().map(|c| c.to_string()).collect()),
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    /// Handles the LSP initialized notification.
    async fn initialized(&self, _params: InitializedParams) {
        let symbols = self.symbols();
        info!(
            "Initialized with {} tags and {} functions",
            symbols.tag_count(),
            symbols.function_count()
        );
    }

    /// Handles the LSP shutdown request.
    async fn shutdown(&self) -> jsonrpc::Result<()> {
        info!("Received shutdown request");
        self.documents.clear();
        Ok(())
    }

    /// Handles opening a text document and publishes its validation diagnostics.
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        info!("Opening document: URI={}, version={}", document.uri, document.version);
        let uri = document.uri.clone();
        self.documents
            .insert(uri.clone(), LspDocument::new(document.uri, document.version, &document.text));
        self.publish_diagnostics(&uri, Vec::new()).await;
    }

    /// Handles changes to a text document, applying incremental updates and re-validating.
    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        debug!("textDocument/didChange: URI={}, version={}, {} changes", uri, version, params.content_changes.len());

        let applied = match self.documents.get_mut(&uri) {
            Some(mut document) => match document.apply(params.content_changes, version) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Ignoring change to {}: {}", uri, e);
                    false
                }
            },
            None => {
                warn!("Failed to find document with URI={}", uri);
                false
            }
        };

        if applied {
            self.publish_diagnostics(&uri, Vec::new()).await;
        }
    }

    /// Handles closing a text document, removing it from state and clearing diagnostics.
    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("Closing document: {}", uri);
        if self.documents.remove(&uri).is_none() {
            warn!("Failed to find document with URI={}", uri);
        }
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    /// Handles new client settings, swapping the registry and re-validating
    /// open documents when they load.
    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        info!("workspace/didChangeConfiguration");
        if self.reload(&params.settings).await {
            self.revalidate_all().await;
        }
    }

    /// Handles completion requests. A failed resolution yields an empty list
    /// and publishes the explaining diagnostic.
    async fn completion(&self, params: CompletionParams) -> jsonrpc::Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        debug!("Completion request at {}:{:?}", uri, position);

        let Some(response) = self.respond(&uri, position) else {
            return Ok(None);
        };

        if !response.diagnostics.is_empty() {
            self.publish_diagnostics(&uri, response.diagnostics).await;
            return Ok(Some(CompletionResponse::Array(Vec::new())));
        }
        if response.items.is_empty() {
            return Ok(None);
        }

        debug!("Returning {} completion items", response.items.len());
        Ok(Some(CompletionResponse::Array(response.items)))
    }
}
