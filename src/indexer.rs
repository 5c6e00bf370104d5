//! Incremental Indexer (C6).
//!
//! Diffs the folder against the store, then parses/chunks/embeds whatever is
//! new or changed and removes whatever disappeared. CPU-bound parse/chunk/
//! embed work for a batch runs across a bounded `rayon` pool; the actual
//! store writes happen back on the calling thread since
//! `rusqlite::Connection` isn't `Sync`.

use crate::chunker::{self, ChunkerConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{CoreError, CoreResult};
use crate::fingerprint::{self, EnumeratedFile};
use crate::store::VectorStore;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct IndexingError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IndexingSession {
    pub state: SessionState,
    pub total_documents: usize,
    pub processed_documents: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub errors: Vec<IndexingError>,
}

impl Default for IndexingSession {
    fn default() -> Self {
        Self {
            state: SessionState::Pending,
            total_documents: 0,
            processed_documents: 0,
            added: 0,
            updated: 0,
            removed: 0,
            errors: Vec::new(),
        }
    }
}

/// Cooperative control channel: the run loop checks this between batches
/// (and between documents within a batch) rather than being preempted.
pub struct IndexerControl {
    state: AtomicU8,
}

const CTRL_RUN: u8 = 0;
const CTRL_PAUSE: u8 = 1;
const CTRL_CANCEL: u8 = 2;

impl Default for IndexerControl {
    fn default() -> Self {
        Self { state: AtomicU8::new(CTRL_RUN) }
    }
}

impl IndexerControl {
    pub fn pause(&self) {
        self.state.compare_exchange(CTRL_RUN, CTRL_PAUSE, Ordering::SeqCst, Ordering::SeqCst).ok();
    }

    pub fn resume(&self) {
        self.state.compare_exchange(CTRL_PAUSE, CTRL_RUN, Ordering::SeqCst, Ordering::SeqCst).ok();
    }

    pub fn cancel(&self) {
        self.state.store(CTRL_CANCEL, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CTRL_CANCEL
    }

    /// Block (with a short poll interval) while paused; returns immediately
    /// once resumed or cancelled.
    fn wait_while_paused(&self) {
        while self.state.load(Ordering::SeqCst) == CTRL_PAUSE {
            std::thread::sleep(Duration::from_millis(50));
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndexerConfig {
    pub batch_size: usize,
    pub max_in_flight: usize,
    pub max_retries: u32,
    pub retry_base: Duration,
    pub retry_factor: u32,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::config::DEFAULT_INDEXER_BATCH_SIZE,
            max_in_flight: crate::config::DEFAULT_INDEXER_MAX_IN_FLIGHT,
            max_retries: 5,
            retry_base: Duration::from_millis(200),
            retry_factor: 2,
        }
    }
}

#[derive(Debug, Default)]
struct Diff {
    new_or_changed: Vec<EnumeratedFile>,
    deleted: Vec<String>,
    unchanged: usize,
}

pub struct Indexer {
    root: PathBuf,
    config: IndexerConfig,
    chunker_config: ChunkerConfig,
}

impl Indexer {
    pub fn new(root: impl Into<PathBuf>, config: IndexerConfig, chunker_config: ChunkerConfig) -> Self {
        Self { root: root.into(), config, chunker_config }
    }

    fn diff(&self, store: &VectorStore) -> CoreResult<Diff> {
        let enumerated = fingerprint::enumerate(&self.root)?;
        let existing = store.list_documents()?;
        let existing_by_path: std::collections::HashMap<_, _> =
            existing.iter().map(|d| (d.path.clone(), d)).collect();
        let enumerated_paths: std::collections::HashSet<_> =
            enumerated.iter().map(|f| f.relative_path.clone()).collect();

        let mut diff = Diff::default();
        for file in enumerated {
            match existing_by_path.get(&file.relative_path) {
                Some(doc) if doc.size == file.size && doc.mtime == file.mtime => {
                    diff.unchanged += 1;
                }
                _ => diff.new_or_changed.push(file),
            }
        }
        for doc in &existing {
            if !enumerated_paths.contains(&doc.path) {
                diff.deleted.push(doc.path.clone());
            }
        }
        Ok(diff)
    }

    /// Run a full incremental pass: diff, then process adds/changes in
    /// batches and apply deletes. Progress is published into `session` as it
    /// goes so a concurrent `get_status` call sees live counters.
    pub fn run(
        &self,
        store: &mut VectorStore,
        embedder: &dyn EmbeddingProvider,
        control: &IndexerControl,
        session: &Mutex<IndexingSession>,
    ) -> CoreResult<()> {
        {
            let mut s = session.lock().unwrap();
            s.state = SessionState::Running;
        }

        let diff = self.diff(store)?;
        {
            let mut s = session.lock().unwrap();
            s.total_documents = diff.new_or_changed.len() + diff.deleted.len();
        }

        if !diff.deleted.is_empty() {
            store.delete_documents_batch(&diff.deleted)?;
            let mut s = session.lock().unwrap();
            s.removed += diff.deleted.len();
            s.processed_documents += diff.deleted.len();
        }

        for batch in diff.new_or_changed.chunks(self.config.batch_size) {
            control.wait_while_paused();
            if control.is_cancelled() {
                let mut s = session.lock().unwrap();
                s.state = SessionState::Failed;
                s.errors.push(IndexingError {
                    path: String::new(),
                    message: "indexing cancelled".to_string(),
                });
                return Err(CoreError::Cancelled);
            }

            let prepared = self.prepare_batch(batch, embedder, session);

            for outcome in prepared {
                control.wait_while_paused();
                if control.is_cancelled() {
                    let mut s = session.lock().unwrap();
                    s.state = SessionState::Failed;
                    return Err(CoreError::Cancelled);
                }

                match outcome {
                    Ok((file, fingerprint, chunks, embeddings)) => {
                        let was_present = store.get_document(&file.relative_path)?.is_some();
                        store.build_index(
                            &file.relative_path,
                            &fingerprint,
                            &chunks,
                            &embeddings,
                            None,
                        )?;
                        let mut s = session.lock().unwrap();
                        if was_present {
                            s.updated += 1;
                        } else {
                            s.added += 1;
                        }
                        s.processed_documents += 1;
                    }
                    Err((path, err)) => {
                        let mut s = session.lock().unwrap();
                        s.errors.push(IndexingError { path, message: err.to_string() });
                        s.processed_documents += 1;
                    }
                }
            }
        }

        let mut s = session.lock().unwrap();
        s.state = SessionState::Completed;
        Ok(())
    }

    /// Parse, chunk, and embed one batch of files. Bounded to
    /// `max_in_flight` concurrent workers via a scoped `rayon` pool so a
    /// slow parse on one file doesn't serialize the whole batch, without
    /// unbounded thread fan-out across batches.
    #[allow(clippy::type_complexity)]
    fn prepare_batch(
        &self,
        batch: &[EnumeratedFile],
        embedder: &dyn EmbeddingProvider,
        session: &Mutex<IndexingSession>,
    ) -> Vec<
        Result<
            (EnumeratedFile, crate::fingerprint::Fingerprint, Vec<crate::chunker::Chunk>, Vec<Vec<f32>>),
            (String, CoreError),
        >,
    > {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_in_flight.max(1))
            .build();
        let Ok(pool) = pool else {
            return batch
                .iter()
                .map(|f| {
                    self.process_one(f, embedder)
                        .map_err(|e| (f.relative_path.clone(), e))
                })
                .collect();
        };

        let _ = session; // reserved for future per-file progress ticks
        pool.install(|| {
            use rayon::prelude::*;
            batch
                .par_iter()
                .map(|f| self.process_one(f, embedder).map_err(|e| (f.relative_path.clone(), e)))
                .collect()
        })
    }

    fn process_one(
        &self,
        file: &EnumeratedFile,
        embedder: &dyn EmbeddingProvider,
    ) -> CoreResult<(EnumeratedFile, crate::fingerprint::Fingerprint, Vec<crate::chunker::Chunk>, Vec<Vec<f32>>)>
    {
        let abs_path = fingerprint::absolute_path(&self.root, &file.relative_path);
        let bytes = std::fs::read(&abs_path).map_err(|e| CoreError::io(&abs_path, e))?;
        let fp = fingerprint::fingerprint(&abs_path)?;
        let parsed = crate::parsers::parse_file(&abs_path, &bytes)?;
        let chunks = chunker::chunk(&parsed, self.chunker_config);

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embed_with_retry(embedder, &texts)?;

        Ok((file.clone(), fp, chunks, embeddings))
    }

    fn embed_with_retry(
        &self,
        embedder: &dyn EmbeddingProvider,
        texts: &[String],
    ) -> CoreResult<Vec<Vec<f32>>> {
        let mut attempt = 0u32;
        loop {
            match embedder.embed_batch(texts) {
                Ok(v) => return Ok(v),
                Err(CoreError::EmbeddingBackendError { reason, retryable: true })
                    if attempt < self.config.max_retries =>
                {
                    let backoff = self.config.retry_base
                        * self.config.retry_factor.saturating_pow(attempt).max(1);
                    tracing::warn!(attempt, %reason, ?backoff, "retrying embedding batch");
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::store::VectorStore;

    fn write_file(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn full_pass_adds_then_removes_on_delete() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.txt", "hello world, this is a document.");

        let embedder = MockEmbeddingProvider::new(8);
        let mut store = VectorStore::open_in_memory("mock", 8).unwrap();
        let indexer = Indexer::new(dir.path(), IndexerConfig::default(), ChunkerConfig::default());
        let control = IndexerControl::default();
        let session = Mutex::new(IndexingSession::default());

        indexer.run(&mut store, &embedder, &control, &session).unwrap();
        {
            let s = session.lock().unwrap();
            assert_eq!(s.added, 1);
            assert_eq!(s.state, SessionState::Completed);
        }
        assert_eq!(store.list_documents().unwrap().len(), 1);

        std::fs::remove_file(dir.path().join("a.txt")).unwrap();
        let session2 = Mutex::new(IndexingSession::default());
        indexer.run(&mut store, &embedder, &control, &session2).unwrap();
        assert_eq!(session2.lock().unwrap().removed, 1);
        assert!(store.list_documents().unwrap().is_empty());
    }

    #[test]
    fn cancel_stops_before_completion() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            write_file(dir.path(), &format!("f{i}.txt"), "some content to embed here");
        }
        let embedder = MockEmbeddingProvider::new(8);
        let mut store = VectorStore::open_in_memory("mock", 8).unwrap();
        let indexer = Indexer::new(
            dir.path(),
            IndexerConfig { batch_size: 1, max_in_flight: 1, ..IndexerConfig::default() },
            ChunkerConfig::default(),
        );
        let control = IndexerControl::default();
        control.cancel();
        let session = Mutex::new(IndexingSession::default());

        let result = indexer.run(&mut store, &embedder, &control, &session);
        assert!(result.is_err());
        assert_eq!(session.lock().unwrap().state, SessionState::Failed);
    }
}
