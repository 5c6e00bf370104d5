//! Embedding Provider (C4).
//!
//! Wraps whatever backend turns chunk text into fixed-width vectors behind a
//! small trait so the store and indexer never know which one is loaded.
//! Vectors are always returned L2-normalized so the store can use a plain
//! dot product as cosine similarity.

use crate::error::{CoreError, CoreResult};

/// Resolve a model name to its dimensionality and chunk-length ceiling, the
/// same role `semantic::resolve_model` played for the BERT/candle backend
/// this module replaces — only the defaults changed, not the shape.
pub struct ModelConfig {
    pub model_id: String,
    pub dimension: usize,
    pub max_input_chars: usize,
}

pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

pub fn resolve_model(name: &str) -> ModelConfig {
    match name {
        "all-MiniLM-L6-v2" | "minilm" => ModelConfig {
            model_id: "sentence-transformers/all-MiniLM-L6-v2".into(),
            dimension: 384,
            max_input_chars: 2000,
        },
        "mock" => ModelConfig { model_id: "mock".into(), dimension: 8, max_input_chars: 8000 },
        other => ModelConfig { model_id: other.to_string(), dimension: 384, max_input_chars: 2000 },
    }
}

/// Backend that turns text into vectors. Implementors must always return
/// L2-normalized rows so downstream cosine similarity is a dot product.
pub trait EmbeddingProvider: Send + Sync {
    fn model_id(&self) -> &str;
    fn dimension(&self) -> usize;

    /// Embed a batch of chunk texts, preserving input order. A failed batch
    /// is either retried by the caller (transient, `retryable=true`) or
    /// surfaced as a hard failure.
    fn embed_batch(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>>;

    /// Embed a single query string. Some backends prepend a query-specific
    /// prefix (e.g. `"query: "`); document chunks never get that prefix.
    fn embed_query(&self, text: &str) -> CoreResult<Vec<f32>> {
        Ok(self.embed_batch(std::slice::from_ref(&text.to_string()))?.remove(0))
    }
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

/// `fastembed`-backed provider (ONNX Runtime under the hood via `ort`).
/// Gated behind the `semantic` feature; see `Cargo.toml`.
#[cfg(feature = "semantic")]
pub struct FastEmbedProvider {
    model: std::sync::Mutex<fastembed::TextEmbedding>,
    model_id: String,
    dimension: usize,
}

#[cfg(feature = "semantic")]
impl FastEmbedProvider {
    pub fn new(config: &ModelConfig) -> CoreResult<Self> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        let model_kind = match config.model_id.as_str() {
            "sentence-transformers/all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
            other => {
                return Err(CoreError::EmbeddingBackendError {
                    reason: format!("unsupported embedding model '{other}'"),
                    retryable: false,
                })
            }
        };

        tracing::info!(model = %config.model_id, "loading embedding model");
        let model = TextEmbedding::try_new(InitOptions::new(model_kind).with_show_download_progress(false))
            .map_err(|e| CoreError::EmbeddingBackendError {
                reason: format!("failed to load embedding model: {e}"),
                retryable: true,
            })?;

        Ok(Self {
            model: std::sync::Mutex::new(model),
            model_id: config.model_id.clone(),
            dimension: config.dimension,
        })
    }
}

#[cfg(feature = "semantic")]
impl EmbeddingProvider for FastEmbedProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model.lock().map_err(|_| CoreError::EmbeddingBackendError {
            reason: "embedding model mutex poisoned".to_string(),
            retryable: false,
        })?;

        let refs: Vec<&str> = texts.iter().map(|t| t.as_str()).collect();
        let embeddings = model.embed(refs, None).map_err(|e| CoreError::EmbeddingBackendError {
            reason: format!("embedding inference failed: {e}"),
            retryable: true,
        })?;

        Ok(embeddings.into_iter().map(normalize).collect())
    }
}

/// Deterministic hash-based stand-in used by tests and by
/// `embedding_model = "mock"` in config, so the rest of the pipeline can run
/// without downloading model weights.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(resolve_model("mock").dimension)
    }
}

impl EmbeddingProvider for MockEmbeddingProvider {
    fn model_id(&self) -> &str {
        "mock"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[String]) -> CoreResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| normalize(hash_embedding(t, self.dimension))).collect())
    }
}

/// Maps a string to a pseudo-random but fully deterministic vector by
/// hashing `(text, dimension_index)` into each component. Not a semantic
/// embedding — just stable enough for store/search round-trip tests.
fn hash_embedding(text: &str, dimension: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    (0..dimension)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let bits = hasher.finish();
            ((bits % 2000) as f32 / 1000.0) - 1.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_embeddings_are_deterministic_and_normalized() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed_batch(&["hello world".to_string()]).unwrap();
        let b = provider.embed_batch(&["hello world".to_string()]).unwrap();
        assert_eq!(a, b);

        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
    }

    #[test]
    fn different_text_yields_different_vectors() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed_batch(&["alpha".to_string()]).unwrap();
        let b = provider.embed_batch(&["beta".to_string()]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_model_known_names() {
        let cfg = resolve_model("all-MiniLM-L6-v2");
        assert_eq!(cfg.dimension, 384);
        let mock = resolve_model("mock");
        assert_eq!(mock.dimension, 8);
    }
}
