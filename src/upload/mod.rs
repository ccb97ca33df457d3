// Uploaded documents
// Plain-text extraction and overlapping sections a question can be anchored to


use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::embeddings::{ChunkingConfig, ChunkingError, chunk_upload_text};
use crate::generation::{ChatClient, Generated};

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Unsupported upload format: {} (only plain text files are supported)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Upload is not valid UTF-8 text: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    #[error("Failed to read upload {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload contains no text")]
    Empty,

    #[error("Section {requested} does not exist (document has {available} sections)")]
    SectionOutOfRange { requested: usize, available: usize },

    #[error("Chunking failed: {0}")]
    Chunking(#[from] ChunkingError),
}

/// A titled, selectable part of an uploaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// 1-based, as shown to the user
    pub number: usize,
    pub title: String,
    pub text: String,
}

/// Produces a display title for a section's text
pub trait SectionTitler {
    fn title(&self, text: &str) -> String;
}

impl SectionTitler for ChatClient {
    #[inline]
    fn title(&self, text: &str) -> String {
        section_title(self.generate_section_title(text))
    }
}

impl<F: Fn(&str) -> String> SectionTitler for F {
    #[inline]
    fn title(&self, text: &str) -> String {
        self(text)
    }
}

#[inline]
pub fn extract_text(bytes: Vec<u8>) -> Result<String, UploadError> {
    Ok(String::from_utf8(bytes)?)
}

/// Read a plain-text upload; PDFs are rejected
#[inline]
pub fn read_text_file(path: &Path) -> Result<String, UploadError> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        return Err(UploadError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let bytes = fs::read(path).map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    extract_text(bytes)
}

/// Split uploaded text into overlapping chunks using the upload settings
#[inline]
pub fn split_sections(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, UploadError> {
    let chunks = chunk_upload_text(text, config)?;
    if chunks.is_empty() {
        return Err(UploadError::Empty);
    }

    debug!("Split upload into {} sections", chunks.len());
    Ok(chunks)
}

/// Number and title each chunk
#[inline]
pub fn title_sections<T: SectionTitler + ?Sized>(chunks: Vec<String>, titler: &T) -> Vec<Section> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, text)| Section {
            number: i + 1,
            title: titler.title(&text),
            text,
        })
        .collect()
}

/// Pick a section by its 1-based number
#[inline]
pub fn select_section(sections: &[Section], number: usize) -> Result<&Section, UploadError> {
    number
        .checked_sub(1)
        .and_then(|i| sections.get(i))
        .ok_or(UploadError::SectionOutOfRange {
            requested: number,
            available: sections.len(),
        })
}

/// The text a retrieval runs on: the selected section followed by the question
#[inline]
pub fn compose_query(section: Option<&str>, question: &str) -> String {
    match section {
        Some(section) if !section.is_empty() => format!("{}\n{}", section, question),
        _ => question.to_string(),
    }
}

fn section_title(generated: Generated) -> String {
    if let Generated::Fallback { reason, .. } = &generated {
        debug!("Using truncated text as section title: {}", reason);
    }
    generated.into_text()
}
