// Deterministic embedders for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embeddings::Embedder;

/// One dimension per vocabulary word, valued by how often the word occurs
#[derive(Debug)]
pub(crate) struct KeywordEmbedder {
    vocabulary: Vec<String>,
    batch_size: usize,
    batch_calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub(crate) fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
            batch_size: 16,
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub(crate) fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }
}

impl Embedder for KeywordEmbedder {
    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let words = text
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .collect::<Vec<_>>();

        Ok(self
            .vocabulary
            .iter()
            .map(|term| words.iter().filter(|w| *w == term).count() as f32)
            .collect())
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|text| self.embed(text)).collect()
    }

    fn preferred_batch_size(&self) -> usize {
        self.batch_size
    }
}

/// Always fails, like an unreachable embedding service
#[derive(Debug)]
pub(crate) struct FailingEmbedder {
    pub(crate) dimension: usize,
}

impl Embedder for FailingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Err(anyhow::anyhow!("embedding service unavailable"))
    }
}
