// Exact nearest-neighbor index over embedding vectors
// Flat f32 storage, squared Euclidean distance, little-endian persistence


use std::cmp::Ordering;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

const MAGIC: &[u8; 4] = b"AKIX";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 4 + 2 + 4 + 8;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Vector index not found at {}. Run `ai-knower build` first to generate it.", path.display())]
    NotFound { path: PathBuf },

    #[error("Vector at position {position} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Query has {actual} dimensions, index expects {expected}")]
    QueryDimensionMismatch { expected: usize, actual: usize },

    #[error("Index dimension must be greater than 0")]
    ZeroDimension,

    #[error("Corrupt index file: {0}")]
    Corrupt(String),

    #[error("Failed to {operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One search result; `position` addresses the vector in insertion order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index whose position `i` is `vectors[i]`
    #[inline]
    pub fn build(dimension: usize, vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }

        let mut data = Vec::with_capacity(dimension * vectors.len());
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        debug!(
            "Built flat index with {} vectors of dimension {}",
            vectors.len(),
            dimension
        );
        Ok(Self { dimension, data })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.data.get(start..end)
    }

    /// The `k` closest vectors by squared Euclidean distance.
    ///
    /// Hits are ordered by ascending distance; equal distances keep the lower
    /// position first. `k` larger than the index returns every vector.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::QueryDimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, vector)| SearchHit {
                position,
                distance: squared_euclidean(query, vector),
            })
            .collect::<Vec<_>>();

        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, compare_hits);
            hits.truncate(k);
        }
        hits.sort_unstable_by(compare_hits);

        Ok(hits)
    }

    /// Write the index to `path`, replacing any previous file atomically
    #[inline]
    pub fn persist(&self, path: &Path) -> Result<(), IndexError> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| IndexError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;

        let io_error = |operation: &'static str| {
            move |source: std::io::Error| IndexError::Io {
                operation,
                path: path.to_path_buf(),
                source,
            }
        };

        let mut file = NamedTempFile::new_in(parent).map_err(io_error("create temporary file for"))?;
        file.write_all(&self.to_bytes())
            .map_err(io_error("write"))?;
        file.as_file().sync_all().map_err(io_error("sync"))?;
        file.persist(path)
            .map_err(|e| io_error("rename into")(e.error))?;

        info!(
            "Persisted index with {} vectors to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let bytes = fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                IndexError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                IndexError::Io {
                    operation: "read",
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let index = Self::from_bytes(&bytes)?;
        info!(
            "Loaded index with {} vectors (dimension {}) from {}",
            index.len(),
            index.dimension,
            path.display()
        );
        Ok(index)
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        let mut reader = Reader { bytes, offset: 0 };

        if &reader.take_array::<4>()? != MAGIC {
            return Err(IndexError::Corrupt("bad magic header".to_string()));
        }

        let version = u16::from_le_bytes(reader.take_array()?);
        if version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                version
            )));
        }

        let dimension = u32::from_le_bytes(reader.take_array()?) as usize;
        if dimension == 0 {
            return Err(IndexError::Corrupt("dimension is 0".to_string()));
        }
        let count = usize::try_from(u64::from_le_bytes(reader.take_array()?))
            .map_err(|_| IndexError::Corrupt("vector count overflows".to_string()))?;

        let expected_values = count
            .checked_mul(dimension)
            .ok_or_else(|| IndexError::Corrupt("vector count overflows".to_string()))?;
        if reader.remaining() != expected_values.saturating_mul(4) {
            return Err(IndexError::Corrupt(format!(
                "expected {} vectors of dimension {}, found {} trailing bytes",
                count,
                dimension,
                reader.remaining()
            )));
        }

        let mut data = Vec::with_capacity(expected_values);
        for _ in 0..expected_values {
            data.push(f32::from_le_bytes(reader.take_array()?));
        }

        Ok(Self { dimension, data })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], IndexError> {
        let end = self.offset + N;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or_else(|| IndexError::Corrupt("unexpected end of data".to_string()))?;
        let mut array = [0_u8; N];
        array.copy_from_slice(slice);
        self.offset = end;
        Ok(array)
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }
}

fn compare_hits(a: &SearchHit, b: &SearchHit) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.position.cmp(&b.position))
}

#[inline]
fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
