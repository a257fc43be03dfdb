//! Scanner module for directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk, with subtree pruning
//! - Partial and full content hashing with BLAKE3
//! - 64-bit perceptual signatures for image files
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 partial (head + tail) and full hashing
//! - [`perceptual`]: pHash signatures and Hamming-distance metric
//!
//! # Example
//!
//! ```no_run
//! use shadowwipe::scanner::{Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let config = WalkerConfig {
//!     min_size: 1024,
//!     skip_hidden: true,
//!     ..Default::default()
//! };
//!
//! let walker = Walker::new(vec![PathBuf::from(".")], config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod perceptual;
pub mod walker;

use std::collections::BTreeSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Serialize, Serializer};

pub use hasher::{hash_to_hex, Hash, Hasher, PARTIAL_CHUNK_SIZE};
pub use perceptual::{is_image_extension, PerceptualError, PerceptualHasher, IMAGE_EXTENSIONS};
pub use walker::Walker;

/// A discovered file and whatever fingerprints the pipeline attached to it.
///
/// The walker only fills in the stub fields (path, size, name, extension,
/// modified). Hashing stages attach their results as the file moves
/// through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Canonical path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Final path component
    pub name: String,
    /// Lower-cased extension without the dot, empty if none
    pub extension: String,
    /// Last modification time in Unix seconds
    pub modified: i64,
    /// BLAKE3 over the first and last 64 KiB
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_hash"
    )]
    pub partial_hash: Option<Hash>,
    /// BLAKE3 over the whole content
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_hash"
    )]
    pub full_hash: Option<Hash>,
    /// 64-bit perceptual signature (images only)
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_signature"
    )]
    pub perceptual_hash: Option<u64>,
}

impl FileRecord {
    /// Create a stub record with no fingerprints attached.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    /// * `modified` - Modification time in Unix seconds
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: i64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            path,
            size,
            name,
            extension,
            modified,
            partial_hash: None,
            full_hash: None,
            perceptual_hash: None,
        }
    }

    /// Build a stub from a path and its (symlink) metadata.
    #[must_use]
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
        Self::new(path, metadata.len(), modified)
    }

    /// Whether the extension marks this file for perceptual hashing.
    #[must_use]
    pub fn is_image(&self) -> bool {
        is_image_extension(&self.extension)
    }
}

fn serialize_hash<S: Serializer>(hash: &Option<Hash>, serializer: S) -> Result<S::Ok, S::Error> {
    match hash {
        Some(h) => serializer.serialize_str(&hash_to_hex(h)),
        None => serializer.serialize_none(),
    }
}

fn serialize_signature<S: Serializer>(
    signature: &Option<u64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match signature {
        Some(s) => serializer.serialize_str(&format!("{s:016x}")),
        None => serializer.serialize_none(),
    }
}

/// Configuration for directory walking.
///
/// Controls which entries are pruned or skipped before a stub is emitted.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Skip hidden files and prune hidden directories.
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    /// Files strictly smaller than this are skipped.
    pub min_size: u64,

    /// Directory names whose whole subtree is pruned.
    pub excluded_dir_names: BTreeSet<String>,
}

impl WalkerConfig {
    /// Whether a single path segment matches an excluded directory name.
    #[must_use]
    pub fn is_excluded_name(&self, name: &str) -> bool {
        self.excluded_dir_names.contains(name)
    }

    /// Whether any segment of `path` matches an excluded directory name.
    #[must_use]
    pub fn path_has_excluded_segment(&self, path: &Path) -> bool {
        path.components()
            .any(|c| self.is_excluded_name(&c.as_os_str().to_string_lossy()))
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission denied when accessing a file or directory.
    #[error("Permission denied: {}", path.display())]
    PermissionDenied {
        /// The path that could not be accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File or directory not found (may have been deleted during scan).
    #[error("Not found: {}", path.display())]
    NotFound {
        /// The path that was not found
        path: PathBuf,
    },

    /// Generic I/O error during scanning.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Map an I/O error onto the matching variant.
    #[must_use]
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors that can occur while hashing a file.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// File not found (may have been deleted after discovery).
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Permission denied when reading the file.
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    /// Generic I/O error while reading.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// The path being hashed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Map an I/O error onto the matching variant.
    #[must_use]
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}
