// Index build pipeline
// Empty -> Ingested -> Indexed, with out-of-order calls rejected


use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use super::{RetrievalError, Retriever};
use crate::embeddings::Embedder;
use crate::index::{FlatIndex, IndexError};
use crate::store::{CorpusRow, DocumentStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Empty,
    Ingested,
    Indexed,
}

impl fmt::Display for PipelineState {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Ingested => "ingested",
            Self::Indexed => "indexed",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot {operation} while the pipeline is {state}")]
    InvalidState {
        operation: &'static str,
        state: PipelineState,
    },

    #[error("Failed to embed chunks {start}..{end}")]
    Embedding {
        start: usize,
        end: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Embedder returned {actual} vectors for {expected} chunks starting at {start}")]
    EmbeddingCount {
        start: usize,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

#[derive(Debug)]
enum Stage {
    Empty,
    Ingested(DocumentStore),
    Indexed(DocumentStore, FlatIndex),
}

/// Builds a document store and its index in a fixed order
#[derive(Debug)]
pub struct IndexPipeline {
    chunk_size: usize,
    stage: Stage,
}

impl IndexPipeline {
    #[inline]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            stage: Stage::Empty,
        }
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        match self.stage {
            Stage::Empty => PipelineState::Empty,
            Stage::Ingested(_) => PipelineState::Ingested,
            Stage::Indexed(..) => PipelineState::Indexed,
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn store(&self) -> Option<&DocumentStore> {
        match &self.stage {
            Stage::Empty => None,
            Stage::Ingested(store) | Stage::Indexed(store, _) => Some(store),
        }
    }

    #[inline]
    pub fn index(&self) -> Option<&FlatIndex> {
        match &self.stage {
            Stage::Indexed(_, index) => Some(index),
            Stage::Empty | Stage::Ingested(_) => None,
        }
    }

    /// Load and chunk a CSV corpus. Returns the number of chunks.
    #[inline]
    pub fn ingest_path(&mut self, path: &Path) -> Result<usize, PipelineError> {
        self.require(PipelineState::Empty, "ingest a corpus")?;

        let mut store = DocumentStore::new();
        let chunks = store.ingest_path(path, self.chunk_size)?;
        self.stage = Stage::Ingested(store);
        Ok(chunks)
    }

    #[inline]
    pub fn ingest_rows(&mut self, rows: &[CorpusRow]) -> Result<usize, PipelineError> {
        self.require(PipelineState::Empty, "ingest a corpus")?;

        let mut store = DocumentStore::new();
        let chunks = store.ingest(rows, self.chunk_size)?;
        self.stage = Stage::Ingested(store);
        Ok(chunks)
    }

    /// Embed every chunk and build the index.
    ///
    /// Any embedding failure aborts the build and leaves the pipeline ingested.
    #[inline]
    pub fn build_index<E: Embedder>(&mut self, embedder: &E) -> Result<usize, PipelineError> {
        let Stage::Ingested(store) = &self.stage else {
            return Err(PipelineError::InvalidState {
                operation: "build the index",
                state: self.state(),
            });
        };

        let vectors = embed_documents(store.documents(), embedder)?;
        let index = FlatIndex::build(embedder.dimension(), &vectors)?;
        let count = index.len();

        if let Stage::Ingested(store) = std::mem::replace(&mut self.stage, Stage::Empty) {
            self.stage = Stage::Indexed(store, index);
        }

        info!("Built index over {} chunks", count);
        Ok(count)
    }

    #[inline]
    pub fn persist(&self, path: &Path) -> Result<(), PipelineError> {
        match &self.stage {
            Stage::Indexed(_, index) => Ok(index.persist(path)?),
            Stage::Empty | Stage::Ingested(_) => Err(PipelineError::InvalidState {
                operation: "persist the index",
                state: self.state(),
            }),
        }
    }

    #[inline]
    pub fn into_retriever<E: Embedder>(self, embedder: E) -> Result<Retriever<E>, PipelineError> {
        let state = self.state();
        match self.stage {
            Stage::Indexed(store, index) => Ok(Retriever::new(store, index, embedder)?),
            Stage::Empty | Stage::Ingested(_) => Err(PipelineError::InvalidState {
                operation: "open a retriever",
                state,
            }),
        }
    }

    fn require(&self, expected: PipelineState, operation: &'static str) -> Result<(), PipelineError> {
        let state = self.state();
        if state == expected {
            Ok(())
        } else {
            Err(PipelineError::InvalidState { operation, state })
        }
    }
}

fn embed_documents<E: Embedder>(
    documents: &[String],
    embedder: &E,
) -> Result<Vec<Vec<f32>>, PipelineError> {
    let batch_size = embedder.preferred_batch_size().max(1);

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(documents.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} chunks embedded")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut vectors = Vec::with_capacity(documents.len());
    for (batch_number, batch) in documents.chunks(batch_size).enumerate() {
        let start = batch_number * batch_size;
        let end = start + batch.len();

        let embedded = embedder.embed_batch(batch).map_err(|source| {
            warn!("Embedding chunks {}..{} failed, aborting build", start, end);
            bar.abandon();
            PipelineError::Embedding { start, end, source }
        })?;

        if embedded.len() != batch.len() {
            bar.abandon();
            return Err(PipelineError::EmbeddingCount {
                start,
                expected: batch.len(),
                actual: embedded.len(),
            });
        }

        vectors.extend(embedded);
        bar.inc(batch.len() as u64);
    }

    bar.finish_and_clear();
    Ok(vectors)
}
