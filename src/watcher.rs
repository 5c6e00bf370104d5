//! File Watcher (C7).
//!
//! Watches the indexed folder for filesystem changes and emits debounced,
//! deduplicated `ChangeEvent`s to a channel the indexer drains. A debounce
//! thread buffers `(path, last_seen)` pairs and flushes whatever has gone
//! quiet long enough.
//!
//! `notify` delivers renames as a bare remove+create pair on most platforms
//! (no stable rename correlation across all backends), so we don't try to
//! special-case renames — a rename is a delete of the old path and a create
//! of the new one, deduplicated like any other event if both land in the
//! same debounce window.

use crate::fingerprint;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Upserted,
    Removed,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Owns the underlying OS watcher handle; dropping this stops watching.
pub struct FolderWatcher {
    _inner: RecommendedWatcher,
}

/// Start watching `root` recursively, running the debounce loop on a
/// dedicated thread and sending coalesced events to `tx`. Returns the
/// watcher handle the caller must keep alive.
pub fn watch(
    root: &Path,
    debounce: Duration,
    tx: mpsc::Sender<ChangeEvent>,
) -> notify::Result<FolderWatcher> {
    let (raw_tx, raw_rx) = mpsc::channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = raw_tx.send(event);
            }
        },
        notify::Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    tracing::info!(root = %root.display(), "watching folder for changes");

    let root = root.to_path_buf();
    std::thread::spawn(move || debounce_loop(raw_rx, tx, root, debounce));

    Ok(FolderWatcher { _inner: watcher })
}

fn debounce_loop(
    rx: mpsc::Receiver<Event>,
    tx: mpsc::Sender<ChangeEvent>,
    root: PathBuf,
    debounce: Duration,
) {
    let mut pending: HashMap<PathBuf, (Instant, bool)> = HashMap::new(); // path -> (last_seen, exists)

    loop {
        match rx.recv_timeout(debounce) {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    continue;
                }
                let now = Instant::now();
                for path in event.paths {
                    if path.is_dir() {
                        continue;
                    }
                    if fingerprint::to_relative(&root, &path).is_none() {
                        continue;
                    }
                    let exists = path.exists();
                    pending.insert(path, (now, exists));
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if pending.is_empty() {
                    continue;
                }
                let cutoff = Instant::now() - debounce;
                let ready: Vec<PathBuf> = pending
                    .iter()
                    .filter(|(_, (t, _))| *t <= cutoff)
                    .map(|(p, _)| p.clone())
                    .collect();

                for path in ready {
                    if let Some((_, exists)) = pending.remove(&path) {
                        let kind = if exists { ChangeKind::Upserted } else { ChangeKind::Removed };
                        if tx.send(ChangeEvent { path, kind }).is_err() {
                            return; // receiver dropped, shut the watcher thread down
                        }
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn upsert_then_delete_within_window_resolves_to_latest_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let (tx, rx) = mpsc::channel();
        let _watcher = watch(dir.path(), Duration::from_millis(80), tx).unwrap();

        std::thread::sleep(Duration::from_millis(30));
        fs::write(&path, "updated").unwrap();
        std::thread::sleep(Duration::from_millis(30));
        fs::remove_file(&path).unwrap();

        let event = rx.recv_timeout(Duration::from_secs(2)).expect("expected a debounced event");
        assert_eq!(event.kind, ChangeKind::Removed);
    }
}
