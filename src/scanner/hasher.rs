//! BLAKE3 file hasher with streaming and memory-mapped support.
//!
//! # Overview
//!
//! Two fingerprints are computed per candidate file:
//!
//! - **Partial hash**: BLAKE3 over the first and last [`PARTIAL_CHUNK_SIZE`]
//!   bytes. Files no larger than two chunks are hashed whole, so the partial
//!   hash of a small file is its full content hash.
//! - **Full hash**: BLAKE3 over the whole file, streamed through a 1 MiB
//!   buffer. Files of [`MMAP_THRESHOLD`] bytes or more are memory-mapped.
//!
//! Equal full hashes are treated as equal content; there is no byte-for-byte
//! re-verification.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use super::HashError;

/// 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Bytes read from each end of a file for the partial hash (64 KiB).
pub const PARTIAL_CHUNK_SIZE: u64 = 64 * 1024;

/// Read buffer for streaming full hashes (1 MiB).
const FULL_HASH_BUFFER: usize = 1024 * 1024;

/// Files at or above this size are memory-mapped for the full hash (16 MiB).
pub const MMAP_THRESHOLD: u64 = 16 * 1024 * 1024;

/// Stateless BLAKE3 file hasher.
///
/// Cheap to share across rayon workers behind an `Arc` or by reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hasher;

impl Hasher {
    /// Create a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute the partial hash of a file.
    ///
    /// Reads the first and last 64 KiB; files of 128 KiB or less are read
    /// in full.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn partial_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let map_err = |e| HashError::from_io(path, e);
        let mut file = File::open(path).map_err(map_err)?;
        let len = file.metadata().map_err(map_err)?.len();

        let mut hasher = blake3::Hasher::new();
        if len <= PARTIAL_CHUNK_SIZE * 2 {
            io::copy(&mut file, &mut hasher).map_err(map_err)?;
            return Ok(*hasher.finalize().as_bytes());
        }

        let mut chunk = vec![0u8; PARTIAL_CHUNK_SIZE as usize];
        file.read_exact(&mut chunk).map_err(map_err)?;
        hasher.update(&chunk);

        file.seek(SeekFrom::End(-(PARTIAL_CHUNK_SIZE as i64)))
            .map_err(map_err)?;
        file.read_exact(&mut chunk).map_err(map_err)?;
        hasher.update(&chunk);

        Ok(*hasher.finalize().as_bytes())
    }

    /// Compute the full content hash of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened, mapped or read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let map_err = |e| HashError::from_io(path, e);
        let mut file = File::open(path).map_err(map_err)?;
        let len = file.metadata().map_err(map_err)?.len();

        let mut hasher = blake3::Hasher::new();
        if len >= MMAP_THRESHOLD {
            log::trace!("Memory-mapping {} ({} bytes)", path.display(), len);
            hasher.update_mmap(path).map_err(map_err)?;
            return Ok(*hasher.finalize().as_bytes());
        }

        let mut buffer = vec![0u8; FULL_HASH_BUFFER];
        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(map_err(e)),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(*hasher.finalize().as_bytes())
    }
}

/// Render a digest as lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from_bytes(*hash).to_hex().to_string()
}
