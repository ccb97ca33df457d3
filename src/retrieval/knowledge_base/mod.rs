// Persisted knowledge base
// Builds the index from the configured corpus and reopens it with its document store


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use super::{IndexPipeline, Retrieval, RetrievalError, Retriever};
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::index::FlatIndex;
use crate::store::DocumentStore;
use crate::{KnowerError, Result};

const MANIFEST_SUFFIX: &str = ".manifest.json";

/// How a persisted index was built; stored next to the index file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub built_at: DateTime<Utc>,
    pub model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub corpus_path: PathBuf,
}

impl IndexManifest {
    /// `<index_path>.manifest.json`
    #[inline]
    pub fn path_for(index_path: &Path) -> PathBuf {
        let mut name = index_path.as_os_str().to_owned();
        name.push(MANIFEST_SUFFIX);
        PathBuf::from(name)
    }

    /// Read the manifest for `index_path`, if one was written
    #[inline]
    pub fn load(index_path: &Path) -> Result<Option<Self>> {
        let path = Self::path_for(index_path);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| KnowerError::Manifest { path, source })
    }

    fn remove(index_path: &Path) -> Result<()> {
        match fs::remove_file(Self::path_for(index_path)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn save(&self, index_path: &Path) -> Result<()> {
        let path = Self::path_for(index_path);
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let json = serde_json::to_string_pretty(self).map_err(|source| KnowerError::Manifest {
            path: path.clone(),
            source,
        })?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(json.as_bytes())?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// A loaded index, its document store and the embedder used to query it
#[derive(Debug)]
pub struct KnowledgeBase<E> {
    retriever: Retriever<E>,
    manifest: Option<IndexManifest>,
}

impl<E: Embedder> KnowledgeBase<E> {
    /// Ingest the configured corpus, embed it and persist the index with its manifest.
    ///
    /// Nothing is written unless every chunk was embedded.
    #[inline]
    pub fn build(config: &Config, embedder: E) -> Result<Self> {
        let corpus_path = config.dataset_path();
        let index_path = config.index_path();
        let chunk_size = config.chunking.corpus_chunk_size;

        info!(
            "Building index from {} (chunk size {})",
            corpus_path.display(),
            chunk_size
        );

        let mut pipeline = IndexPipeline::new(chunk_size);
        pipeline.ingest_path(&corpus_path)?;
        let chunk_count = pipeline.build_index(&embedder)?;

        // A stale manifest must never describe the new index
        IndexManifest::remove(&index_path)?;
        pipeline.persist(&index_path)?;

        let manifest = IndexManifest {
            built_at: Utc::now(),
            model: config.embedding.model.clone(),
            dimension: embedder.dimension(),
            chunk_count,
            chunk_size,
            corpus_path,
        };
        manifest.save(&index_path)?;

        info!(
            "Index with {} chunks written to {}",
            chunk_count,
            index_path.display()
        );

        let retriever = pipeline
            .into_retriever(embedder)?
            .with_max_chunk_chars(config.retrieval.max_chunk_chars);

        Ok(Self {
            retriever,
            manifest: Some(manifest),
        })
    }

    /// Load the persisted index and re-chunk the corpus it was built from.
    ///
    /// Fails if the index is missing, was built from another corpus or chunk
    /// size, or no longer lines up with the corpus.
    #[inline]
    pub fn open(config: &Config, embedder: E) -> Result<Self> {
        let index_path = config.index_path();
        let corpus_path = config.dataset_path();
        let chunk_size = config.chunking.corpus_chunk_size;

        let index = FlatIndex::load(&index_path)?;
        let manifest = IndexManifest::load(&index_path)?;

        match &manifest {
            Some(manifest) => {
                if manifest.dimension != embedder.dimension() {
                    return Err(KnowerError::Embedding(format!(
                        "index was built with {} ({} dimensions) but the embedder produces {} dimensions",
                        manifest.model,
                        manifest.dimension,
                        embedder.dimension()
                    )));
                }
                if manifest.model != config.embedding.model {
                    warn!(
                        "Index was built with model {} but {} is configured",
                        manifest.model, config.embedding.model
                    );
                }
                if manifest.chunk_size != chunk_size {
                    return Err(RetrievalError::StaleIndex {
                        setting: "chunk size",
                        built: manifest.chunk_size.to_string(),
                        configured: chunk_size.to_string(),
                    }
                    .into());
                }
                if manifest.corpus_path != corpus_path {
                    return Err(RetrievalError::StaleIndex {
                        setting: "corpus",
                        built: manifest.corpus_path.display().to_string(),
                        configured: corpus_path.display().to_string(),
                    }
                    .into());
                }
            }
            None => warn!(
                "No manifest found for {}, skipping build checks",
                index_path.display()
            ),
        }

        let mut store = DocumentStore::new();
        store.ingest_path(&corpus_path, chunk_size)?;

        let retriever = Retriever::new(store, index, embedder)?
            .with_max_chunk_chars(config.retrieval.max_chunk_chars);

        info!(
            "Opened knowledge base with {} chunks",
            retriever.store().len()
        );

        Ok(Self {
            retriever,
            manifest,
        })
    }

    #[inline]
    pub fn retrieve(&self, query: &str, k: usize) -> std::result::Result<Retrieval, RetrievalError> {
        self.retriever.retrieve(query, k)
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever<E> {
        &self.retriever
    }

    #[inline]
    pub fn manifest(&self) -> Option<&IndexManifest> {
        self.manifest.as_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.retriever.store().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.retriever.store().is_empty()
    }

    #[inline]
    pub fn into_retriever(self) -> Retriever<E> {
        self.retriever
    }
}
