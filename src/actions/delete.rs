//! Batch move-to-trash with per-file failure isolation.
//!
//! # Overview
//!
//! [`DeleteExecutor`] applies a list of paths to a [`TrashBackend`]. Every
//! distinct input path ends up in exactly one of
//! [`DeleteOperation::deleted_paths`] or [`DeleteOperation::failed_paths`];
//! one failure never stops the rest of the batch.
//!
//! Checks per path, in order:
//! 1. the file must exist (`"file not found"`)
//! 2. when known group members were supplied, the path must be one of them
//!    (`"path is not part of any duplicate group"`)
//! 3. the backend must succeed (its message is the reason)
//!
//! # Example
//!
//! ```no_run
//! use shadowwipe::actions::delete::{DeleteExecutor, SystemTrash};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let executor = DeleteExecutor::new(Arc::new(SystemTrash));
//! let op = executor.execute(&[PathBuf::from("/path/to/duplicate.txt")]);
//! println!("{} moved, {} failed", op.deleted_paths.len(), op.failed_paths.len());
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::scanner::hash_to_hex;

/// Reason recorded for a path that does not exist.
pub const REASON_NOT_FOUND: &str = "file not found";

/// Reason recorded for a directory, symlink or other non-file path.
pub const REASON_NOT_A_FILE: &str = "not a regular file";

/// Reason recorded for a path outside every known group.
pub const REASON_NOT_IN_GROUP: &str = "path is not part of any duplicate group";

/// Error type for a single-path deletion.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Path exists but is not a regular file.
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    /// Path is not a member of any group the engine knows about.
    #[error("path is not part of any duplicate group: {}", .0.display())]
    NotInGroup(PathBuf),

    /// The trash backend refused the file.
    #[error("trash operation failed for {}: {message}", path.display())]
    TrashFailed {
        /// Path being trashed
        path: PathBuf,
        /// Backend message
        message: String,
    },

    /// The file could not be inspected.
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        /// Path being inspected
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// The reason string stored in [`FailedPath::reason`].
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::NotFound(_) => REASON_NOT_FOUND.to_string(),
            Self::NotAFile(_) => REASON_NOT_A_FILE.to_string(),
            Self::NotInGroup(_) => REASON_NOT_IN_GROUP.to_string(),
            Self::TrashFailed { message, .. } => message.clone(),
            Self::Io { source, .. } => source.to_string(),
        }
    }

    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::NotAFile(p)
            | Self::NotInGroup(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// The OS "move to trash" primitive.
pub trait TrashBackend: Send + Sync {
    /// Move one file to the trash.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message if the file could not be moved.
    fn move_to_trash(&self, path: &Path) -> Result<(), String>;
}

/// Trash backend using the platform recycle bin via the `trash` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl TrashBackend for SystemTrash {
    fn move_to_trash(&self, path: &Path) -> Result<(), String> {
        trash::delete(path).map_err(|e| e.to_string())
    }
}

/// One path that could not be trashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPath {
    /// Input path
    pub path: PathBuf,
    /// Why it failed
    pub reason: String,
}

/// Outcome of one delete request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOperation {
    /// Unique id for this operation
    pub id: String,
    /// Paths moved to the trash, in input order
    pub deleted_paths: Vec<PathBuf>,
    /// Paths that failed, in input order
    pub failed_paths: Vec<FailedPath>,
    /// Bytes moved to the trash
    pub bytes_freed: u64,
    /// When the operation ran (RFC 3339, UTC)
    pub timestamp: DateTime<Utc>,
}

impl DeleteOperation {
    /// Number of paths handled.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.deleted_paths.len() + self.failed_paths.len()
    }

    /// Check if every path was trashed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed_paths.is_empty()
    }

    /// Timestamp formatted as RFC 3339.
    #[must_use]
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let freed = bytesize::ByteSize::b(self.bytes_freed);
        if self.all_succeeded() {
            format!(
                "Moved {} file(s) to trash, freed {}",
                self.deleted_paths.len(),
                freed
            )
        } else {
            format!(
                "Moved {} file(s) to trash, {} failed, freed {}",
                self.deleted_paths.len(),
                self.failed_paths.len(),
                freed
            )
        }
    }
}

static OPERATION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn operation_id(timestamp: &DateTime<Utc>, paths: &[PathBuf]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true).as_bytes());
    hasher.update(&OPERATION_SEQUENCE.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    for path in paths {
        hasher.update(&[0]);
        hasher.update(path.as_os_str().as_encoded_bytes());
    }
    hash_to_hex(hasher.finalize().as_bytes())
}

/// Applies delete requests to a trash backend, one path at a time.
pub struct DeleteExecutor {
    backend: Arc<dyn TrashBackend>,
    known_paths: Option<HashSet<PathBuf>>,
}

impl DeleteExecutor {
    /// Create an executor without a group-membership check.
    #[must_use]
    pub fn new(backend: Arc<dyn TrashBackend>) -> Self {
        Self {
            backend,
            known_paths: None,
        }
    }

    /// Only allow paths from this set (members of the current groups).
    #[must_use]
    pub fn with_known_paths(mut self, paths: HashSet<PathBuf>) -> Self {
        self.known_paths = Some(paths);
        self
    }

    /// Try to move one path to the trash, returning its size on success.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteError`] describing why the path was not trashed.
    pub fn delete_one(&self, path: &Path) -> Result<u64, DeleteError> {
        let metadata = fs::symlink_metadata(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DeleteError::NotFound(path.to_path_buf()),
            _ => DeleteError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        if !metadata.is_file() {
            return Err(DeleteError::NotAFile(path.to_path_buf()));
        }

        if let Some(known) = &self.known_paths {
            if !known.contains(path) {
                return Err(DeleteError::NotInGroup(path.to_path_buf()));
            }
        }

        self.backend
            .move_to_trash(path)
            .map_err(|message| DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message,
            })?;
        Ok(metadata.len())
    }

    /// Run a batch. Duplicate input paths are handled once, at their first
    /// occurrence. An empty request yields an empty operation.
    #[must_use]
    pub fn execute(&self, paths: &[PathBuf]) -> DeleteOperation {
        let timestamp = Utc::now();
        let mut seen: HashSet<&Path> = HashSet::with_capacity(paths.len());
        let mut op = DeleteOperation {
            id: operation_id(&timestamp, paths),
            deleted_paths: Vec::new(),
            failed_paths: Vec::new(),
            bytes_freed: 0,
            timestamp,
        };

        for path in paths {
            if !seen.insert(path.as_path()) {
                log::debug!("Ignoring repeated path {}", path.display());
                continue;
            }
            match self.delete_one(path) {
                Ok(size) => {
                    log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
                    op.bytes_freed += size;
                    op.deleted_paths.push(path.clone());
                }
                Err(e) => {
                    log::warn!("Failed to trash {}: {}", path.display(), e);
                    op.failed_paths.push(FailedPath {
                        path: path.clone(),
                        reason: e.reason(),
                    });
                }
            }
        }

        log::info!("Delete operation {}: {}", op.id, op.summary());
        op
    }
}
