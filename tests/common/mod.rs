//! In-process LSP harness shared by the integration tests
//!
//! Drives a `MarkdocBackend` through `tower_lsp::LspService` and collects the
//! notifications the server sends back to the client.

#![allow(dead_code)]

use std::time::Duration;

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::{Service, ServiceExt};
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::{PublishDiagnosticsParams, ShowMessageParams};
use tower_lsp::LspService;

use markdoc_language_server::lsp::backend::{MarkdocBackend, StartupConfig};

const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

pub const DOC_URI: &str = "file:///tmp/docs/index.md";

pub struct TestServer {
    service: LspService<MarkdocBackend>,
    notifications: mpsc::UnboundedReceiver<jsonrpc::Request>,
    next_id: i64,
}

impl TestServer {
    /// Builds a server with an empty startup registry.
    pub fn new() -> Self {
        Self::with_startup(StartupConfig::default())
    }

    pub fn with_startup(startup: StartupConfig) -> Self {
        let (service, mut socket) = LspService::new(|client| MarkdocBackend::new(client, startup));
        let (tx, notifications) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(message) = socket.next().await {
                if tx.send(message).is_err() {
                    break;
                }
            }
        });
        Self { service, notifications, next_id: 1 }
    }

    pub fn backend(&self) -> &MarkdocBackend {
        self.service.inner()
    }

    /// Sends a request and returns its `result` (or `error`) value.
    pub async fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let request: jsonrpc::Request = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .unwrap();

        let response = self.service.ready().await.unwrap().call(request).await.unwrap();
        let response = serde_json::to_value(response.expect("requests always get a response")).unwrap();
        response.get("result").or_else(|| response.get("error")).cloned().unwrap_or(Value::Null)
    }

    pub async fn notify(&mut self, method: &str, params: Value) {
        let request: jsonrpc::Request = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }))
        .unwrap();
        let _ = self.service.ready().await.unwrap().call(request).await;
    }

    /// `initialize` + `initialized` with the given client capabilities and
    /// initialization options.
    pub async fn initialize(&mut self, capabilities: Value, options: Value) -> Value {
        let result = self
            .request(
                "initialize",
                json!({
                    "processId": null,
                    "rootUri": null,
                    "capabilities": capabilities,
                    "initializationOptions": options,
                }),
            )
            .await;
        self.notify("initialized", json!({})).await;
        result
    }

    /// Initializes with the given inline symbols and no builtins.
    pub async fn initialize_with_symbols(&mut self, symbols: Value) {
        self.initialize(json!({}), json!({ "markdoc": { "includeBuiltins": false, "symbols": symbols } }))
            .await;
    }

    pub async fn open(&mut self, uri: &str, text: &str) {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": { "uri": uri, "languageId": "markdoc", "version": 1, "text": text }
            }),
        )
        .await;
    }

    pub async fn replace(&mut self, uri: &str, version: i32, text: &str) {
        self.notify(
            "textDocument/didChange",
            json!({
                "textDocument": { "uri": uri, "version": version },
                "contentChanges": [{ "text": text }],
            }),
        )
        .await;
    }

    pub async fn completion(&mut self, uri: &str, line: u32, character: u32) -> Value {
        self.request(
            "textDocument/completion",
            json!({
                "textDocument": { "uri": uri },
                "position": { "line": line, "character": character },
            }),
        )
        .await
    }

    async fn next_notification(&mut self, method: &str) -> jsonrpc::Request {
        loop {
            let message = tokio::time::timeout(NOTIFICATION_TIMEOUT, self.notifications.recv())
                .await
                .unwrap_or_else(|_| panic!("Timed out waiting for {}", method))
                .expect("server socket closed");
            if message.method() == method {
                return message;
            }
        }
    }

    /// Waits for the next `publishDiagnostics` notification.
    pub async fn diagnostics(&mut self) -> PublishDiagnosticsParams {
        let message = self.next_notification("textDocument/publishDiagnostics").await;
        serde_json::from_value(message.params().cloned().unwrap_or(Value::Null)).unwrap()
    }

    /// Waits for the next `window/showMessage` notification.
    pub async fn shown_message(&mut self) -> ShowMessageParams {
        let message = self.next_notification("window/showMessage").await;
        serde_json::from_value(message.params().cloned().unwrap_or(Value::Null)).unwrap()
    }
}

/// Labels of a completion result, in order; empty for `null`.
pub fn labels(result: &Value) -> Vec<String> {
    let items = match result {
        Value::Array(items) => items.as_slice(),
        Value::Object(list) => list.get("items").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[]),
        _ => &[],
    };
    items
        .iter()
        .filter_map(|item| item.get("label").and_then(Value::as_str).map(str::to_string))
        .collect()
}

/// Diagnostic codes of a publish notification, in order.
pub fn codes(params: &PublishDiagnosticsParams) -> Vec<String> {
    params
        .diagnostics
        .iter()
        .map(|diagnostic| match &diagnostic.code {
            Some(tower_lsp::lsp_types::NumberOrString::String(code)) => code.clone(),
            other => panic!("Unexpected diagnostic code {:?}", other),
        })
        .collect()
}
