// Document store
// Corpus chunks and their source metadata, kept position-aligned


use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::embeddings::{ChunkingError, chunk_corpus_text};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Corpus not found at {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Malformed corpus row {row} in {}: {source}", path.display())]
    MalformedRow {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read corpus {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chunking failed: {0}")]
    Chunking(#[from] ChunkingError),
}

/// Where a chunk came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub url: String,
}

/// One corpus entry as it appears in the CSV file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRow {
    pub title: String,
    pub url: String,
    #[serde(rename = "abstract")]
    pub body: String,
}

impl CorpusRow {
    #[inline]
    pub fn new(title: impl Into<String>, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            body: body.into(),
        }
    }

    fn metadata(&self) -> Metadata {
        Metadata {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// Chunks and metadata where position `i` of one describes position `i` of the other
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentStore {
    documents: Vec<String>,
    metadata: Vec<Metadata>,
}

impl DocumentStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunk every row body and append the chunks in row order.
    ///
    /// All rows are chunked before anything is appended, so on error the
    /// store is left as it was. Returns the number of chunks added.
    #[inline]
    pub fn ingest(&mut self, rows: &[CorpusRow], chunk_size: usize) -> Result<usize, StoreError> {
        let mut staged_documents = Vec::new();
        let mut staged_metadata = Vec::new();

        for row in rows {
            let chunks = chunk_corpus_text(&row.body, chunk_size)?;
            let metadata = row.metadata();
            staged_metadata.extend(std::iter::repeat_n(metadata, chunks.len()));
            staged_documents.extend(chunks);
        }

        let added = staged_documents.len();
        self.documents.append(&mut staged_documents);
        self.metadata.append(&mut staged_metadata);

        debug!(
            "Ingested {} rows into {} chunks (store now holds {})",
            rows.len(),
            added,
            self.documents.len()
        );
        Ok(added)
    }

    /// Read a CSV corpus with `title`, `url` and `abstract` columns and ingest it
    #[inline]
    pub fn ingest_path(&mut self, path: &Path, chunk_size: usize) -> Result<usize, StoreError> {
        let rows = read_corpus(path)?;
        let added = self.ingest(&rows, chunk_size)?;
        info!(
            "Loaded {} chunks from {} corpus rows in {}",
            added,
            rows.len(),
            path.display()
        );
        Ok(added)
    }

    #[inline]
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    #[inline]
    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    #[inline]
    pub fn get(&self, position: usize) -> Option<(&str, &Metadata)> {
        let document = self.documents.get(position)?;
        let metadata = self.metadata.get(position)?;
        Some((document.as_str(), metadata))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Parse every data row of a corpus file; `row` in errors counts from 1
#[inline]
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusRow>, StoreError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    csv::Reader::from_reader(file)
        .deserialize::<CorpusRow>()
        .enumerate()
        .map(|(index, record)| {
            record.map_err(|source| StoreError::MalformedRow {
                path: path.to_path_buf(),
                row: index + 1,
                source,
            })
        })
        .collect()
}
