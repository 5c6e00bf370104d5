//! Vector Store (C5).
//!
//! Persists documents, chunks, and their embeddings in a single SQLite
//! database (`rusqlite`, bundled) under `.folder-mcp/vectors.db`. There is no
//! native vector extension in play: embeddings are stored as little-endian
//! `f32` BLOBs and compared with a plain dot product, since every vector
//! written here is already L2-normalized by the embedding provider.

use crate::chunker::{Chunk, ExtractionParams};
use crate::error::{CoreError, CoreResult};
use crate::fingerprint::Fingerprint;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA_VERSION: &str = "1";

pub struct VectorStore {
    conn: Connection,
}

#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub path: String,
    pub content_hash: String,
    pub size: u64,
    pub mtime: u64,
    pub needs_reindex: bool,
}

#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk_index: usize,
    pub content: String,
    pub token_count: usize,
    pub extraction_params: ExtractionParams,
    pub key_phrases: Vec<(String, f64)>,
    pub readability: f64,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub document_path: String,
    pub chunk_index: usize,
    pub content: String,
    pub similarity: f64,
    pub extraction_params: ExtractionParams,
}

#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub document_count: u64,
    pub chunk_count: u64,
    pub embedding_count: u64,
    pub documents_needing_reindex: u64,
}

impl VectorStore {
    /// Open (creating if absent) the store at `db_path`, guarding against a
    /// mismatched embedding model — switching models without a full reindex
    /// would silently corrupt similarity scores.
    pub fn open(db_path: &Path, model_id: &str, dimension: usize) -> CoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        let conn = Connection::open(db_path)
            .map_err(|e| CoreError::StoreError { reason: format!("failed to open db: {e}") })?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

        let store = Self { conn };
        store.create_schema()?;
        store.guard_model_identity(model_id, dimension)?;
        Ok(store)
    }

    /// An in-memory store, used by tests that don't need persistence across
    /// process restarts.
    pub fn open_in_memory(model_id: &str, dimension: usize) -> CoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let store = Self { conn };
        store.create_schema()?;
        store.guard_model_identity(model_id, dimension)?;
        Ok(store)
    }

    fn create_schema(&self) -> CoreResult<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS meta (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS documents (
                    path TEXT PRIMARY KEY,
                    content_hash TEXT NOT NULL,
                    size INTEGER NOT NULL,
                    mtime INTEGER NOT NULL,
                    needs_reindex INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS chunks (
                    document_path TEXT NOT NULL REFERENCES documents(path) ON DELETE CASCADE,
                    chunk_index INTEGER NOT NULL,
                    content TEXT NOT NULL,
                    token_count INTEGER NOT NULL,
                    extraction_params TEXT NOT NULL,
                    key_phrases TEXT NOT NULL,
                    readability REAL NOT NULL,
                    PRIMARY KEY (document_path, chunk_index)
                );

                CREATE TABLE IF NOT EXISTS chunk_embeddings (
                    document_path TEXT NOT NULL,
                    chunk_index INTEGER NOT NULL,
                    vector BLOB NOT NULL,
                    PRIMARY KEY (document_path, chunk_index),
                    FOREIGN KEY (document_path, chunk_index)
                        REFERENCES chunks(document_path, chunk_index) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS document_embeddings (
                    document_path TEXT PRIMARY KEY REFERENCES documents(path) ON DELETE CASCADE,
                    vector BLOB NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_path);
                CREATE INDEX IF NOT EXISTS idx_documents_needs_reindex ON documents(needs_reindex);",
            )
            .map_err(|e| CoreError::StoreError { reason: format!("schema init failed: {e}") })?;
        Ok(())
    }

    fn guard_model_identity(&self, model_id: &str, dimension: usize) -> CoreResult<()> {
        let stored_model: Option<String> = self.get_meta("embedding_model")?;
        let stored_dim: Option<String> = self.get_meta("embedding_dimension")?;
        let stored_schema: Option<String> = self.get_meta("schema_version")?;

        match (stored_model, stored_dim) {
            (Some(m), Some(d)) => {
                let expected = format!("{model_id}:{dimension}");
                let actual = format!("{m}:{d}");
                if expected != actual {
                    return Err(CoreError::ModelMismatch { expected, actual });
                }
            }
            _ => {
                self.set_meta("embedding_model", model_id)?;
                self.set_meta("embedding_dimension", &dimension.to_string())?;
            }
        }
        if stored_schema.is_none() {
            self.set_meta("schema_version", SCHEMA_VERSION)?;
        }
        Ok(())
    }

    fn get_meta(&self, key: &str) -> CoreResult<Option<String>> {
        self.conn
            .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |r| r.get(0))
            .optional()
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })
    }

    fn set_meta(&self, key: &str, value: &str) -> CoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        Ok(())
    }

    /// Insert or replace a document's fingerprint, its chunks, and per-chunk
    /// embeddings in a single transaction. `document_embedding` is the
    /// averaged/pooled whole-document vector used by `get_document_outline`
    /// style summaries.
    pub fn build_index(
        &mut self,
        path: &str,
        fingerprint: &Fingerprint,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
        document_embedding: Option<&[f32]>,
    ) -> CoreResult<()> {
        if chunks.len() != embeddings.len() {
            return Err(CoreError::StoreError {
                reason: format!(
                    "chunk/embedding count mismatch: {} chunks, {} embeddings",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        let tx = self
            .conn
            .transaction()
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

        tx.execute("DELETE FROM documents WHERE path = ?1", params![path])
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

        tx.execute(
            "INSERT INTO documents (path, content_hash, size, mtime, needs_reindex)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![path, fingerprint.content_hash, fingerprint.size, fingerprint.mtime],
        )
        .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

        for (chunk, vector) in chunks.iter().zip(embeddings.iter()) {
            let params_json = serde_json::to_string(&chunk.extraction_params)
                .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
            let phrases_json = serde_json::to_string(&chunk.key_phrases)
                .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

            tx.execute(
                "INSERT INTO chunks
                    (document_path, chunk_index, content, token_count, extraction_params, key_phrases, readability)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    path,
                    chunk.chunk_index as i64,
                    chunk.content,
                    chunk.token_count as i64,
                    params_json,
                    phrases_json,
                    chunk.readability,
                ],
            )
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

            tx.execute(
                "INSERT INTO chunk_embeddings (document_path, chunk_index, vector)
                 VALUES (?1, ?2, ?3)",
                params![path, chunk.chunk_index as i64, vector_to_blob(vector)],
            )
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        }

        if let Some(doc_vec) = document_embedding {
            tx.execute(
                "INSERT INTO document_embeddings (document_path, vector) VALUES (?1, ?2)",
                params![path, vector_to_blob(doc_vec)],
            )
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        }

        tx.commit().map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        Ok(())
    }

    /// Cascade-delete a document and everything derived from it.
    /// `ON DELETE CASCADE` handles `chunks`/`chunk_embeddings`/
    /// `document_embeddings`; this is still one statement inside one
    /// transaction so a partial failure can't leave orphans.
    pub fn delete_document(&mut self, path: &str) -> CoreResult<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM documents WHERE path = ?1", params![path])
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        Ok(affected > 0)
    }

    /// Cascade-delete a batch of documents atomically: either all listed
    /// paths disappear together or none do.
    pub fn delete_documents_batch(&mut self, paths: &[String]) -> CoreResult<usize> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let mut deleted = 0usize;
        for path in paths {
            let affected = tx
                .execute("DELETE FROM documents WHERE path = ?1", params![path])
                .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
            deleted += affected;
        }
        tx.commit().map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        Ok(deleted)
    }

    pub fn mark_for_reindex(&mut self, path: &str) -> CoreResult<()> {
        self.conn
            .execute(
                "UPDATE documents SET needs_reindex = 1 WHERE path = ?1",
                params![path],
            )
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        Ok(())
    }

    pub fn documents_needing_reindex(&self) -> CoreResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path FROM documents WHERE needs_reindex = 1 ORDER BY path")
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let rows = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| CoreError::StoreError { reason: e.to_string() })?);
        }
        Ok(out)
    }

    pub fn get_document(&self, path: &str) -> CoreResult<Option<DocumentRecord>> {
        self.conn
            .query_row(
                "SELECT path, content_hash, size, mtime, needs_reindex FROM documents WHERE path = ?1",
                params![path],
                |r| {
                    Ok(DocumentRecord {
                        path: r.get(0)?,
                        content_hash: r.get(1)?,
                        size: r.get::<_, i64>(2)? as u64,
                        mtime: r.get::<_, i64>(3)? as u64,
                        needs_reindex: r.get::<_, i64>(4)? != 0,
                    })
                },
            )
            .optional()
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })
    }

    pub fn list_documents(&self) -> CoreResult<Vec<DocumentRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT path, content_hash, size, mtime, needs_reindex FROM documents ORDER BY path",
            )
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let rows = stmt
            .query_map([], |r| {
                Ok(DocumentRecord {
                    path: r.get(0)?,
                    content_hash: r.get(1)?,
                    size: r.get::<_, i64>(2)? as u64,
                    mtime: r.get::<_, i64>(3)? as u64,
                    needs_reindex: r.get::<_, i64>(4)? != 0,
                })
            })
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| CoreError::StoreError { reason: e.to_string() })?);
        }
        Ok(out)
    }

    pub fn list_chunks(&self, path: &str) -> CoreResult<Vec<ChunkRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT chunk_index, content, token_count, extraction_params, key_phrases, readability
                 FROM chunks WHERE document_path = ?1 ORDER BY chunk_index",
            )
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let rows = stmt
            .query_map(params![path], |r| {
                let params_json: String = r.get(3)?;
                let phrases_json: String = r.get(4)?;
                Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, i64>(2)?, params_json, phrases_json, r.get::<_, f64>(5)?))
            })
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

        let mut out = Vec::new();
        for row in rows {
            let (chunk_index, content, token_count, params_json, phrases_json, readability) =
                row.map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
            let extraction_params: ExtractionParams = serde_json::from_str(&params_json)
                .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
            let key_phrases: Vec<(String, f64)> = serde_json::from_str(&phrases_json)
                .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
            out.push(ChunkRecord {
                chunk_index: chunk_index as usize,
                content,
                token_count: token_count as usize,
                extraction_params,
                key_phrases,
                readability,
            });
        }
        Ok(out)
    }

    pub fn get_chunk_embedding(&self, path: &str, chunk_index: usize) -> CoreResult<Option<Vec<f32>>> {
        self.conn
            .query_row(
                "SELECT vector FROM chunk_embeddings WHERE document_path = ?1 AND chunk_index = ?2",
                params![path, chunk_index as i64],
                |r| r.get::<_, Vec<u8>>(0),
            )
            .optional()
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })
            .map(|opt| opt.map(|blob| blob_to_vector(&blob)))
    }

    /// k-NN search by cosine similarity (a dot product, since every stored
    /// vector is pre-normalized). Ties break by `(document_path,
    /// chunk_index)` ascending so results are deterministic across runs.
    pub fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        min_similarity: f64,
    ) -> CoreResult<Vec<SearchHit>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT c.document_path, c.chunk_index, c.content, c.extraction_params, e.vector
                 FROM chunk_embeddings e
                 JOIN chunks c ON c.document_path = e.document_path AND c.chunk_index = e.chunk_index",
            )
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

        let rows = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, Vec<u8>>(4)?,
                ))
            })
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

        let mut scored: Vec<SearchHit> = Vec::new();
        for row in rows {
            let (document_path, chunk_index, content, params_json, blob) =
                row.map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
            let vector = blob_to_vector(&blob);
            let similarity = dot(query_vector, &vector) as f64;
            if similarity < min_similarity {
                continue;
            }
            let extraction_params: ExtractionParams = serde_json::from_str(&params_json)
                .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
            scored.push(SearchHit {
                document_path,
                chunk_index: chunk_index as usize,
                content,
                similarity,
                extraction_params,
            });
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document_path.cmp(&b.document_path))
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    pub fn get_stats(&self) -> CoreResult<StoreStats> {
        let document_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let chunk_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let embedding_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunk_embeddings", [], |r| r.get(0))
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;
        let documents_needing_reindex: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents WHERE needs_reindex = 1", [], |r| r.get(0))
            .map_err(|e| CoreError::StoreError { reason: e.to_string() })?;

        Ok(StoreStats {
            document_count: document_count as u64,
            chunk_count: chunk_count as u64,
            embedding_count: embedding_count as u64,
            documents_needing_reindex: documents_needing_reindex as u64,
        })
    }
}

fn vector_to_blob(v: &[f32]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(v.len() * 4);
    for x in v {
        buf.extend_from_slice(&x.to_le_bytes());
    }
    buf
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ExtractionParams;

    fn sample_chunk(idx: usize, content: &str) -> Chunk {
        Chunk {
            chunk_index: idx,
            start: 0,
            end: 1,
            token_count: content.len() / 4,
            content: content.to_string(),
            key_phrases: vec![("hello".to_string(), 1.0)],
            readability: 60.0,
            extraction_params: ExtractionParams::Text { start_line: 1, end_line: 1 },
        }
    }

    #[test]
    fn build_index_then_search_round_trips() {
        let mut store = VectorStore::open_in_memory("mock", 4).unwrap();
        let fp = Fingerprint { content_hash: "abc".into(), size: 10, mtime: 1 };
        let chunks = vec![sample_chunk(0, "hello world")];
        let embeddings = vec![vec![1.0, 0.0, 0.0, 0.0]];

        store.build_index("a.txt", &fp, &chunks, &embeddings, None).unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 5, 0.0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_path, "a.txt");
        assert!((hits[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn delete_document_cascades_to_chunks_and_embeddings() {
        let mut store = VectorStore::open_in_memory("mock", 4).unwrap();
        let fp = Fingerprint { content_hash: "abc".into(), size: 10, mtime: 1 };
        let chunks = vec![sample_chunk(0, "hello world")];
        let embeddings = vec![vec![1.0, 0.0, 0.0, 0.0]];
        store.build_index("a.txt", &fp, &chunks, &embeddings, None).unwrap();

        assert!(store.delete_document("a.txt").unwrap());
        assert!(store.list_chunks("a.txt").unwrap().is_empty());
        assert!(store.get_chunk_embedding("a.txt", 0).unwrap().is_none());

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.document_count, 0);
        assert_eq!(stats.chunk_count, 0);
        assert_eq!(stats.embedding_count, 0);
    }

    #[test]
    fn reopening_with_a_different_model_errors() {
        let mut store = VectorStore::open_in_memory("mock", 4).unwrap();
        let fp = Fingerprint { content_hash: "abc".into(), size: 10, mtime: 1 };
        store.build_index("a.txt", &fp, &[], &[], None).unwrap();

        let conn = std::mem::replace(&mut store.conn, Connection::open_in_memory().unwrap());
        let reopened = VectorStore { conn };
        let err = reopened.guard_model_identity("other-model", 8);
        assert!(err.is_err());
    }

    #[test]
    fn search_breaks_ties_by_path_then_chunk_index() {
        let mut store = VectorStore::open_in_memory("mock", 2).unwrap();
        let fp = Fingerprint { content_hash: "abc".into(), size: 10, mtime: 1 };
        store
            .build_index("b.txt", &fp, &[sample_chunk(0, "x")], &[vec![1.0, 0.0]], None)
            .unwrap();
        store
            .build_index("a.txt", &fp, &[sample_chunk(0, "x")], &[vec![1.0, 0.0]], None)
            .unwrap();

        let hits = store.search(&[1.0, 0.0], 10, 0.0).unwrap();
        assert_eq!(hits[0].document_path, "a.txt");
        assert_eq!(hits[1].document_path, "b.txt");
    }
}
