//! Chunk planning — how a file's bytes are divided into frames.
//!
//! The size policy is fixed by the protocol: `base = ceil(file_size /
//! chunk_count)` bytes per chunk, with the trailing remainder in the last
//! chunk. Both sides must agree on it, since the receiver sizes its chunk
//! table from the same request the planner runs on.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bytes::Bytes;

/// One contiguous byte range of the source file.
///
/// Owned by exactly one task at a time: planner → sender task on the
/// sending side, receive loop → writer phase on the receiving side.
#[derive(Debug, Clone)]
pub struct FileChunk {
    pub id: u32,
    pub payload: Bytes,
}

impl FileChunk {
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// Per-chunk sizes for one transfer. Built once, discarded after the load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    sizes: Vec<u64>,
}

impl ChunkPlan {
    /// Compute chunk sizes for `file_size` bytes split `chunk_count` ways.
    ///
    /// Every chunk gets `ceil(file_size / chunk_count)` bytes except the
    /// last, which gets the remainder. Counts that cannot produce a valid
    /// plan are rejected before any frame is sent: zero, counts larger
    /// than the file, and counts where the ceil policy leaves the last
    /// chunk empty (e.g. 5 bytes over 4 chunks).
    pub fn compute(file_size: u64, chunk_count: u32) -> Result<Self, PlanError> {
        if chunk_count == 0 {
            return Err(PlanError::ZeroChunkCount);
        }
        let count = chunk_count as u64;
        if count > file_size {
            return Err(PlanError::TooManyChunks {
                chunk_count,
                file_size,
            });
        }

        let base = file_size.div_ceil(count);
        let prefix = base * (count - 1);
        if prefix >= file_size {
            return Err(PlanError::DegenerateChunks {
                chunk_count,
                file_size,
            });
        }
        let last = file_size - prefix;

        let mut sizes = vec![base; chunk_count as usize];
        sizes[chunk_count as usize - 1] = last;
        Ok(Self { file_size, sizes })
    }

    pub fn chunk_count(&self) -> u32 {
        self.sizes.len() as u32
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Read the file sequentially into one buffer per planned chunk.
    ///
    /// The read is deliberately not parallelized; only transmission is.
    /// A short file (changed since planning) or any read error aborts the
    /// transfer here, before a single frame reaches the wire.
    pub fn load(&self, path: &Path) -> Result<Vec<FileChunk>, PlanError> {
        let mut file = File::open(path).map_err(|source| PlanError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut chunks = Vec::with_capacity(self.sizes.len());
        for (id, &size) in self.sizes.iter().enumerate() {
            let mut buf = vec![0u8; size as usize];
            file.read_exact(&mut buf).map_err(|source| PlanError::Read {
                path: path.display().to_string(),
                source,
            })?;
            chunks.push(FileChunk {
                id: id as u32,
                payload: Bytes::from(buf),
            });
        }
        Ok(chunks)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Planner failures — all fatal to the transfer, none reach the wire.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("chunk count must be non-zero")]
    ZeroChunkCount,

    #[error("chunk count {chunk_count} exceeds file size {file_size} — would produce empty chunks")]
    TooManyChunks { chunk_count: u32, file_size: u64 },

    #[error("chunk count {chunk_count} cannot evenly cover {file_size} bytes — last chunk would be empty")]
    DegenerateChunks { chunk_count: u32, file_size: u64 },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

// ── Tests ─────────────────────────────────────────────────────────────────────
