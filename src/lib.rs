use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KnowerError>;

#[derive(Error, Debug)]
pub enum KnowerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Corpus error: {0}")]
    Corpus(#[from] store::StoreError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("Index build failed: {0}")]
    Pipeline(#[from] retrieval::PipelineError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] retrieval::RetrievalError),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Invalid index manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Upload error: {0}")]
    Upload(#[from] upload::UploadError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod http;
pub mod index;
pub mod retrieval;
pub mod store;
pub mod upload;

#[cfg(test)]
mod test_support;
