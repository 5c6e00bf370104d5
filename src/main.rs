//! folder-mcp binary — thin CLI shell over the [`folder_mcp`] library crate.
//!
//! Two subcommands: `index` runs a single incremental pass and exits,
//! `serve` runs the same pass once at startup, then watches the folder and
//! exposes it as an MCP tool server over stdio. There is no dynamic wiring
//! here — every component is constructed explicitly and handed to the next.

use clap::{Parser, Subcommand};
use folder_mcp::config::ConfigSnapshot;
use folder_mcp::embedding::{self, EmbeddingProvider};
use folder_mcp::{chunker, indexer, logging, protocol, store, tools, watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "folder-mcp", version, about = "Index and search a local folder of documents over MCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one incremental indexing pass over a folder and exit.
    Index {
        /// Folder to index.
        root: PathBuf,
        /// Embedding model name (defaults to the folder's config, then "minilm").
        #[arg(long)]
        model: Option<String>,
    },
    /// Serve a folder as an MCP tool server over stdio, watching for changes.
    Serve {
        /// Folder to index and serve.
        root: PathBuf,
        #[arg(long)]
        model: Option<String>,
        /// Disable the filesystem watcher; only the startup pass runs.
        #[arg(long)]
        no_watch: bool,
    },
}

fn resolve_root(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|e| {
        eprintln!("Error: path '{}' not found: {e}", root.display());
        std::process::exit(1);
    })
}

fn build_embedder(model_name: &str) -> Arc<dyn EmbeddingProvider> {
    let resolved = embedding::resolve_model(model_name);

    #[cfg(feature = "semantic")]
    {
        if resolved.model_id != "mock" {
            match embedding::FastEmbedProvider::new(&resolved) {
                Ok(provider) => return Arc::new(provider),
                Err(e) => {
                    warn!(error = %e, model = model_name, "failed to load embedding model, falling back to mock");
                }
            }
        }
    }

    Arc::new(embedding::MockEmbeddingProvider::new(resolved.dimension))
}

fn indexer_config_from(config: &ConfigSnapshot) -> indexer::IndexerConfig {
    indexer::IndexerConfig {
        batch_size: config.indexer_batch_size,
        max_in_flight: config.indexer_max_in_flight,
        ..indexer::IndexerConfig::default()
    }
}

fn chunker_config_from(config: &ConfigSnapshot) -> chunker::ChunkerConfig {
    chunker::ChunkerConfig {
        max_tokens: config.max_chunk_tokens,
        min_tokens: config.min_chunk_tokens,
        ..chunker::ChunkerConfig::default()
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let root = match &cli.command {
        Commands::Index { root, .. } => resolve_root(root),
        Commands::Serve { root, .. } => resolve_root(root),
    };

    let config = ConfigSnapshot::load(&root);
    let _log_guard = logging::init(&root, &config.log_level);

    match cli.command {
        Commands::Index { model, .. } => run_index(&root, &config, model),
        Commands::Serve { model, no_watch, .. } => run_serve(&root, &config, model, no_watch),
    }
}

fn run_index(root: &Path, config: &ConfigSnapshot, model: Option<String>) {
    let model_name = model.unwrap_or_else(|| config.embedding_model.clone());
    let embedder = build_embedder(&model_name);

    let db_path = ConfigSnapshot::vectors_db_path(root);
    let mut vector_store = store::VectorStore::open(&db_path, embedder.model_id(), embedder.dimension())
        .unwrap_or_else(|e| {
            error!(error = %e, path = %db_path.display(), "failed to open vector store");
            std::process::exit(1);
        });

    let idx = indexer::Indexer::new(root, indexer_config_from(config), chunker_config_from(config));
    let control = indexer::IndexerControl::default();
    let session = Mutex::new(indexer::IndexingSession::default());

    match idx.run(&mut vector_store, embedder.as_ref(), &control, &session) {
        Ok(()) => {
            let s = session.lock().unwrap();
            info!(
                added = s.added,
                updated = s.updated,
                removed = s.removed,
                errors = s.errors.len(),
                "indexing complete"
            );
        }
        Err(e) => {
            error!(error = %e, "indexing failed");
            std::process::exit(1);
        }
    }
}

fn run_serve(root: &Path, config: &ConfigSnapshot, model: Option<String>, no_watch: bool) {
    let model_name = model.unwrap_or_else(|| config.embedding_model.clone());
    let embedder = build_embedder(&model_name);

    let db_path = ConfigSnapshot::vectors_db_path(root);
    let vector_store = store::VectorStore::open(&db_path, embedder.model_id(), embedder.dimension())
        .unwrap_or_else(|e| {
            error!(error = %e, path = %db_path.display(), "failed to open vector store");
            std::process::exit(1);
        });

    let ctx = Arc::new(tools::ToolContext {
        root: root.to_path_buf(),
        store: Mutex::new(vector_store),
        embedder: embedder.clone(),
        session: Arc::new(Mutex::new(indexer::IndexingSession::default())),
        control: Arc::new(indexer::IndexerControl::default()),
        server_name: "folder-mcp",
        server_version: env!("CARGO_PKG_VERSION"),
    });

    let indexer_config = indexer_config_from(config);
    let chunker_config = chunker_config_from(config);

    {
        let idx = indexer::Indexer::new(root, indexer_config, chunker_config);
        let mut vs = ctx.store.lock().unwrap();
        if let Err(e) = idx.run(&mut vs, ctx.embedder.as_ref(), &ctx.control, &ctx.session) {
            error!(error = %e, "startup indexing pass failed");
        }
    }

    let _watcher_handle = if no_watch {
        None
    } else {
        let (tx, rx) = std::sync::mpsc::channel();
        let debounce = std::time::Duration::from_millis(config.watcher_debounce_ms);
        match watcher::watch(root, debounce, tx) {
            Ok(handle) => {
                let ctx = ctx.clone();
                let root = root.to_path_buf();
                std::thread::spawn(move || {
                    let idx = indexer::Indexer::new(&root, indexer_config, chunker_config);
                    for first in rx.iter() {
                        let mut batch = vec![first];
                        batch.extend(rx.try_iter());
                        info!(changes = batch.len(), "filesystem change(s) detected, reindexing");
                        let mut vs = ctx.store.lock().unwrap();
                        if let Err(e) = idx.run(&mut vs, ctx.embedder.as_ref(), &ctx.control, &ctx.session) {
                            error!(error = %e, "incremental reindex failed");
                        }
                    }
                });
                Some(handle)
            }
            Err(e) => {
                error!(error = %e, "failed to start file watcher, continuing without live updates");
                None
            }
        }
    };

    protocol::run_stdio(ctx);
}
