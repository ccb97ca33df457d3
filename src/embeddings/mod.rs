// Embeddings module
// Word-window chunking, the Embedder seam, and the HTTP embedding client

pub mod chunking;
pub mod client;


use tracing::warn;

pub use chunking::{
    ChunkingConfig, ChunkingError, chunk_corpus_text, chunk_upload_text, chunk_words, word_count,
};
pub use client::EmbeddingClient;

/// Turns text into fixed-dimension `f32` vectors
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Embed several texts, preserving input order
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Number of texts the pipeline should hand to one `embed_batch` call
    #[inline]
    fn preferred_batch_size(&self) -> usize {
        16
    }

    /// Query-time embedding that never fails.
    ///
    /// Service errors and vectors of the wrong length degrade to a zero vector,
    /// reported as [`QueryEmbedding::Fallback`] so callers can tell it apart.
    #[inline]
    fn embed_query(&self, text: &str) -> QueryEmbedding {
        match self.embed(text) {
            Ok(vector) if vector.len() == self.dimension() => QueryEmbedding::Embedded(vector),
            Ok(vector) => {
                let reason = format!(
                    "expected {} dimensions, service returned {}",
                    self.dimension(),
                    vector.len()
                );
                warn!("Query embedding unusable ({}), using zero vector", reason);
                QueryEmbedding::fallback(self.dimension(), reason)
            }
            Err(e) => {
                warn!("Query embedding failed, using zero vector: {:#}", e);
                QueryEmbedding::fallback(self.dimension(), format!("{:#}", e))
            }
        }
    }
}

impl<E: Embedder + ?Sized> Embedder for &E {
    #[inline]
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    #[inline]
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        (**self).embed(text)
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }

    #[inline]
    fn preferred_batch_size(&self) -> usize {
        (**self).preferred_batch_size()
    }

    #[inline]
    fn embed_query(&self, text: &str) -> QueryEmbedding {
        (**self).embed_query(text)
    }
}

/// Outcome of embedding a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEmbedding {
    Embedded(Vec<f32>),
    /// Zero vector standing in for a failed embedding
    Fallback { vector: Vec<f32>, reason: String },
}

/// Whether a retrieval ran on a real query embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingStatus {
    Embedded,
    Fallback { reason: String },
}

impl QueryEmbedding {
    #[inline]
    pub fn fallback(dimension: usize, reason: impl Into<String>) -> Self {
        Self::Fallback {
            vector: vec![0.0; dimension],
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn vector(&self) -> &[f32] {
        match self {
            Self::Embedded(vector) | Self::Fallback { vector, .. } => vector,
        }
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    #[inline]
    pub fn into_parts(self) -> (Vec<f32>, EmbeddingStatus) {
        match self {
            Self::Embedded(vector) => (vector, EmbeddingStatus::Embedded),
            Self::Fallback { vector, reason } => (vector, EmbeddingStatus::Fallback { reason }),
        }
    }
}

impl EmbeddingStatus {
    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}
