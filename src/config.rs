//! Configuration snapshot — read once at startup and on explicit reload.
//!
//! There is no dynamic DI container: every component that needs configuration
//! is handed a `ConfigSnapshot` (or a field of it) at construction time.
//! Missing values fall back to documented defaults, never silent runtime
//! substitution of a different component.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Token budget defaults.
pub const DEFAULT_MAX_CHUNK_TOKENS: usize = 500;
pub const DEFAULT_MIN_CHUNK_TOKENS: usize = 100;
pub const DEFAULT_WATCHER_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_INDEXER_BATCH_SIZE: usize = 32;
pub const DEFAULT_INDEXER_MAX_IN_FLIGHT: usize = 4;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    pub max_chunk_tokens: usize,
    pub min_chunk_tokens: usize,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub watcher_debounce_ms: u64,
    pub indexer_batch_size: usize,
    pub indexer_max_in_flight: usize,
    pub log_level: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            max_chunk_tokens: DEFAULT_MAX_CHUNK_TOKENS,
            min_chunk_tokens: DEFAULT_MIN_CHUNK_TOKENS,
            embedding_model: "minilm".to_string(),
            embedding_dimension: 384,
            watcher_debounce_ms: DEFAULT_WATCHER_DEBOUNCE_MS,
            indexer_batch_size: DEFAULT_INDEXER_BATCH_SIZE,
            indexer_max_in_flight: DEFAULT_INDEXER_MAX_IN_FLIGHT,
            log_level: "info".to_string(),
            cache_dir: None,
        }
    }
}

impl ConfigSnapshot {
    /// Load from `<root>/.folder-mcp/config.toml` if present, else defaults.
    /// Values are read once at startup and only change on an explicit
    /// reload call.
    pub fn load(root: &Path) -> Self {
        let path = root.join(".folder-mcp").join("config.toml");
        match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "invalid config.toml, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn folder_mcp_dir(root: &Path) -> PathBuf {
        root.join(".folder-mcp")
    }

    pub fn vectors_db_path(root: &Path) -> PathBuf {
        Self::folder_mcp_dir(root).join("vectors.db")
    }

    pub fn logs_dir(root: &Path) -> PathBuf {
        Self::folder_mcp_dir(root).join("logs")
    }

    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| Self::folder_mcp_dir(root).join("cache"))
    }
}
