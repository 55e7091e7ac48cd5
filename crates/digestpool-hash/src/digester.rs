//! Streaming file digests.
//!
//! Files are read in fixed-size chunks and fed into an incremental hasher,
//! so memory use per file is bounded by the chunk size regardless of file
//! size. The cancellation flag is checked before every read.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::marker::PhantomData;
use std::path::Path;
use std::time::{Duration, Instant};

use md5::{Digest, Md5};

use digestpool_core::{ContentHash, DEFAULT_CHUNK_SIZE, HashError};

use crate::cancel::CancelFlag;

/// Digest of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Content hash.
    pub hash: ContentHash,
    /// Bytes read.
    pub size_bytes: u64,
    /// Wall time from open to the final chunk.
    pub duration: Duration,
}

impl FileDigest {
    /// Lowercase hex form of the hash.
    pub fn to_hex(&self) -> String {
        self.hash.to_hex()
    }
}

/// Hashes files with the digest function `D` (MD5 by default).
#[derive(Debug, Clone, Copy)]
pub struct Digester<D = Md5> {
    chunk_size: usize,
    _digest: PhantomData<fn() -> D>,
}

impl<D: Digest> Digester<D> {
    /// Create a digester with the default 128 KiB chunk size.
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    /// Create a digester with a custom chunk size (at least one byte).
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            _digest: PhantomData,
        }
    }

    /// Bytes read per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Hash a file, aborting with [`HashError::Cancelled`] once `cancel` is set.
    pub fn digest(&self, path: &Path, cancel: &CancelFlag) -> Result<FileDigest, HashError> {
        let start = Instant::now();
        let file = File::open(path).map_err(|e| HashError::io(path, e))?;
        let mut digest = self.digest_reader(path, file, cancel)?;
        digest.duration = start.elapsed();
        Ok(digest)
    }

    /// Hash everything `reader` yields; `path` is only used for error context.
    pub(crate) fn digest_reader<R: Read>(
        &self,
        path: &Path,
        mut reader: R,
        cancel: &CancelFlag,
    ) -> Result<FileDigest, HashError> {
        let start = Instant::now();
        let mut hasher = D::new();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut size_bytes: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(HashError::Cancelled);
            }

            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::io(path, e)),
            };

            hasher.update(&buffer[..bytes_read]);
            size_bytes += bytes_read as u64;
        }

        Ok(FileDigest {
            hash: ContentHash::new(hasher.finalize().to_vec()),
            size_bytes,
            duration: start.elapsed(),
        })
    }
}

impl<D: Digest> Default for Digester<D> {
    fn default() -> Self {
        Self::new()
    }
}
