//! Markdoc language server binary: speaks LSP over stdio

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::info;

use markdoc_language_server::logging::init_logger;
use markdoc_language_server::lsp::backend::{MarkdocBackend, StartupConfig};
use markdoc_language_server::lsp::config::{SymbolSource, SymbolsConfig};
use markdoc_language_server::lsp::symbol_registry::Symbols;

#[derive(Parser, Debug)]
#[command(name = "markdoc-language-server", version)]
#[command(about = "Language server for Markdoc documents", long_about = None)]
struct Args {
    /// Log level for stderr (e.g. "debug", "markdoc_language_server=trace"); defaults to RUST_LOG or "info"
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr output
    #[arg(long)]
    no_color: bool,

    /// Do not write a session log to the user cache directory
    #[arg(long)]
    no_file_logging: bool,

    /// JSON file declaring tags, functions and attributes (flat or Markdoc schema shape)
    #[arg(long, env = "MARKDOC_LS_CONFIG")]
    config: Option<PathBuf>,

    /// Serve only the configured symbols, without the Markdoc built-ins
    #[arg(long)]
    no_builtins: bool,
}

fn load_startup_config(args: &Args) -> anyhow::Result<StartupConfig> {
    let source = args
        .config
        .as_deref()
        .map(|path| {
            SymbolSource::read(path).with_context(|| format!("Failed to load symbol configuration {}", path.display()))
        })
        .transpose()?;

    let symbols = Symbols::load(&SymbolsConfig {
        include_builtins: !args.no_builtins,
        source,
    })
    .context("Invalid symbol configuration")?;

    Ok(StartupConfig {
        config_path: args.config.clone(),
        symbols,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_logger(args.no_color, args.log_level.as_deref(), !args.no_file_logging)
        .context("Failed to initialize logging")?;

    let startup = load_startup_config(&args)?;
    info!(
        "Starting Markdoc language server v{} ({} tags, {} functions)",
        env!("CARGO_PKG_VERSION"),
        startup.symbols.tag_count(),
        startup.symbols.function_count()
    );

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = LspService::new(|client| MarkdocBackend::new(client, startup));

    Server::new(stdin, stdout, socket).serve(service).await;
    info!("Markdoc language server stopped");
    Ok(())
}
