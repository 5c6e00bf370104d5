//! Structured logging, threaded as a value rather than a process-global.
//!
//! The protocol transport (C9) owns stdout/stdin exclusively for JSON-RPC
//! traffic, so diagnostics never go there: `init` installs a `tracing`
//! subscriber writing to a rotating file under `<root>/.folder-mcp/logs/`,
//! returning the `WorkerGuard` the caller must keep alive for the process
//! lifetime (dropping it stops the background flush thread).

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

/// Install the process-wide `tracing` subscriber. Must be called exactly
/// once, before any other component logs.
pub fn init(root: &Path, level: &str) -> WorkerGuard {
    let logs_dir = crate::config::ConfigSnapshot::logs_dir(root);
    let _ = std::fs::create_dir_all(&logs_dir);

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "folder-mcp.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    guard
}
