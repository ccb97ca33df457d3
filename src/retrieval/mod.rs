// Retrieval orchestrator
// Embeds a query, searches the index and maps hits back to chunks and metadata

pub mod knowledge_base;
pub mod pipeline;

#[cfg(test)]
mod tests;

use thiserror::Error;
use tracing::{debug, warn};

use crate::embeddings::{Embedder, EmbeddingStatus};
use crate::index::{FlatIndex, IndexError};
use crate::store::{DocumentStore, Metadata};

pub use knowledge_base::{IndexManifest, KnowledgeBase};
pub use pipeline::{IndexPipeline, PipelineError, PipelineState};

pub use crate::config::settings::DEFAULT_MAX_CHUNK_CHARS;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error(
        "Document store holds {documents} chunks but the index holds {vectors} vectors; rebuild the index"
    )]
    Misaligned { documents: usize, vectors: usize },

    #[error("Index was built with {setting} {built} but {configured} is configured; rebuild the index")]
    StaleIndex {
        setting: &'static str,
        built: String,
        configured: String,
    },

    #[error("Index dimension {index} does not match embedder dimension {embedder}")]
    DimensionMismatch { index: usize, embedder: usize },

    #[error("Index search failed: {0}")]
    Index(#[from] IndexError),

    #[error("Index returned position {position} outside the document store")]
    PositionOutOfRange { position: usize },
}

/// A chunk returned for a query, ranked by `distance`
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: String,
    pub metadata: Metadata,
    pub distance: f32,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub hits: Vec<RetrievedChunk>,
    /// Whether the query was really embedded or searched with the zero vector
    pub embedding: EmbeddingStatus,
}

impl Retrieval {
    #[inline]
    pub fn used_fallback(&self) -> bool {
        self.embedding.is_fallback()
    }
}

/// Read-only query side over an aligned document store and index
#[derive(Debug)]
pub struct Retriever<E> {
    store: DocumentStore,
    index: FlatIndex,
    embedder: E,
    max_chunk_chars: usize,
}

impl<E: Embedder> Retriever<E> {
    #[inline]
    pub fn new(store: DocumentStore, index: FlatIndex, embedder: E) -> Result<Self, RetrievalError> {
        if store.len() != index.len() {
            return Err(RetrievalError::Misaligned {
                documents: store.len(),
                vectors: index.len(),
            });
        }
        if index.dimension() != embedder.dimension() {
            return Err(RetrievalError::DimensionMismatch {
                index: index.dimension(),
                embedder: embedder.dimension(),
            });
        }

        Ok(Self {
            store,
            index,
            embedder,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
        })
    }

    #[inline]
    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    /// Top `k` chunks for `query`, closest first.
    ///
    /// A query that cannot be embedded is searched with the zero vector and
    /// reported through [`Retrieval::embedding`].
    #[inline]
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Retrieval, RetrievalError> {
        let (vector, embedding) = self.embedder.embed_query(query).into_parts();
        if embedding.is_fallback() {
            warn!("Retrieving with fallback embedding; results are not meaningful");
        }

        let hits = self
            .index
            .search(&vector, k)?
            .into_iter()
            .map(|hit| -> Result<RetrievedChunk, RetrievalError> {
                let (chunk, metadata) = self.store.get(hit.position).ok_or(
                    RetrievalError::PositionOutOfRange {
                        position: hit.position,
                    },
                )?;
                Ok(RetrievedChunk {
                    chunk: truncate_chars(chunk, self.max_chunk_chars).to_string(),
                    metadata: metadata.clone(),
                    distance: hit.distance,
                    position: hit.position,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Retrieved {} chunks for query", hits.len());
        Ok(Retrieval { hits, embedding })
    }

    #[inline]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[inline]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    #[inline]
    pub fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }
}

/// The first `max_chars` characters of `text`, cut on a char boundary
#[inline]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_offset, _)) => text.get(..byte_offset).unwrap_or(text),
        None => text,
    }
}
