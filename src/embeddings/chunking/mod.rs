
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CORPUS_CHUNK_SIZE: usize = 500;
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 300;
pub const DEFAULT_UPLOAD_OVERLAP: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("Chunk size must be greater than zero")]
    ZeroSize,
    #[error("Overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },
}

/// Word-window sizes used for corpus ingestion and uploaded documents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per chunk when ingesting the corpus (no overlap)
    pub corpus_chunk_size: usize,
    /// Words per section when splitting an uploaded document
    pub upload_chunk_size: usize,
    /// Words repeated between consecutive upload sections
    pub upload_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            corpus_chunk_size: DEFAULT_CORPUS_CHUNK_SIZE,
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
            upload_overlap: DEFAULT_UPLOAD_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ChunkingError> {
        validate_window(self.corpus_chunk_size, 0)?;
        validate_window(self.upload_chunk_size, self.upload_overlap)
    }
}

fn validate_window(size: usize, overlap: usize) -> Result<(), ChunkingError> {
    if size == 0 {
        return Err(ChunkingError::ZeroSize);
    }
    if overlap >= size {
        return Err(ChunkingError::OverlapTooLarge { overlap, size });
    }
    Ok(())
}

/// Split `text` into windows of at most `size` whitespace-separated words.
///
/// With `overlap > 0` each window after the first starts `size - overlap` words
/// after the previous one, so it repeats the previous window's last `overlap`
/// words. Windowing stops at the first window that reaches the end of the text.
/// Words inside a chunk are joined with a single space.
#[inline]
pub fn chunk_words(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, ChunkingError> {
    validate_window(size, overlap)?;

    let words = text.split_whitespace().collect::<Vec<_>>();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let step = size - overlap;
    let mut chunks = Vec::with_capacity(words.len().div_ceil(step));
    let mut start = 0;

    loop {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }

    debug!(
        "Chunked {} words into {} chunks (size {}, overlap {})",
        words.len(),
        chunks.len(),
        size,
        overlap
    );

    Ok(chunks)
}

/// Non-overlapping chunking used for corpus ingestion
#[inline]
pub fn chunk_corpus_text(text: &str, size: usize) -> Result<Vec<String>, ChunkingError> {
    chunk_words(text, size, 0)
}

/// Overlapping chunking used for uploaded documents
#[inline]
pub fn chunk_upload_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, ChunkingError> {
    chunk_words(text, config.upload_chunk_size, config.upload_overlap)
}

/// Count whitespace-separated words
#[inline]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
