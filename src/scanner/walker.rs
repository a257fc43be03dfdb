//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing one or more
//! root directories and producing [`FileRecord`] stubs for the duplicate
//! pipeline. It uses [`jwalk`] for parallel directory reading.
//!
//! # Features
//!
//! - Excluded directory names prune the whole subtree
//! - Hidden entries skipped (and hidden directories pruned) on request
//! - Symlinks are never followed and never yielded
//! - Zero-byte and undersized files are dropped before a stub is built
//! - Overlapping roots are collapsed so no path is yielded twice
//! - Children are visited in name order for a deterministic discovery order
//! - Cooperative cancellation via [`CancellationToken`]
//!
//! # Example
//!
//! ```no_run
//! use shadowwipe::scanner::{Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let walker = Walker::new(vec![PathBuf::from("/home/user/Downloads")], WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::WalkDir;

use super::{FileRecord, ScanError, WalkerConfig};
use crate::signal::CancellationToken;

/// Directory walker for file discovery across several roots.
#[derive(Debug)]
pub struct Walker {
    /// Canonical, non-overlapping roots in walk order
    roots: Vec<PathBuf>,
    /// Walker configuration
    config: Arc<WalkerConfig>,
    /// Optional token for cooperative cancellation
    cancel_token: Option<CancellationToken>,
}

impl Walker {
    /// Create a new walker over the given roots.
    ///
    /// Roots are canonicalized. Roots that do not exist, are not
    /// directories, or contain an excluded segment are logged and skipped.
    /// A root nested inside another root is dropped.
    ///
    /// # Arguments
    ///
    /// * `roots` - Directories to scan
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, config: WalkerConfig) -> Self {
        let roots = normalize_roots(&roots, &config);
        Self {
            roots,
            config: Arc::new(config),
            cancel_token: None,
        }
    }

    /// Attach a cancellation token.
    ///
    /// Once the token is cancelled, iteration stops at the next entry
    /// without yielding an error.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// The roots that will actually be walked.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Walk every root, yielding file stubs in discovery order.
    ///
    /// Per-entry errors are yielded as [`ScanError`] values rather than
    /// stopping iteration; callers usually log and skip them.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        self.roots
            .iter()
            .take_while(move |_| !self.is_cancelled())
            .flat_map(move |root| self.walk_root(root))
    }

    fn walk_root<'a>(
        &'a self,
        root: &'a Path,
    ) -> impl Iterator<Item = Result<FileRecord, ScanError>> + 'a {
        let prune_config = Arc::clone(&self.config);

        let walk_dir = WalkDir::new(root)
            .follow_links(false)
            .skip_hidden(false)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        // The root itself comes through here at depth 0.
                        if entry.depth == 0 || !entry.file_type().is_dir() {
                            return true;
                        }
                        let name = entry.file_name();
                        if prune_config.is_excluded_name(&name.to_string_lossy()) {
                            log::trace!("Pruning excluded directory: {}", entry.path().display());
                            return false;
                        }
                        if prune_config.skip_hidden && is_hidden(name, &entry.path()) {
                            log::trace!("Pruning hidden directory: {}", entry.path().display());
                            return false;
                        }
                        true
                    }
                    Err(_) => true,
                });
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        walk_dir
            .into_iter()
            .take_while(move |_| {
                let cancelled = self.is_cancelled();
                if cancelled {
                    log::debug!("Walker: cancellation requested, stopping at {}", root.display());
                }
                !cancelled
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    if entry.depth == 0 {
                        return None;
                    }
                    let file_type = entry.file_type();
                    if file_type.is_dir() {
                        return None;
                    }
                    let path = entry.path();
                    if file_type.is_symlink() {
                        log::trace!("Skipping symlink: {}", path.display());
                        return None;
                    }
                    if self.config.skip_hidden && is_hidden(entry.file_name(), &path) {
                        log::trace!("Skipping hidden file: {}", path.display());
                        return None;
                    }
                    self.process_file(path)
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| root.to_path_buf(), std::borrow::ToOwned::to_owned);
                    log::warn!("Walker error for {}: {}", path.display(), e);
                    Some(Err(ScanError::Io {
                        path,
                        source: std::io::Error::other(e.to_string()),
                    }))
                }
            })
    }

    /// Stat a candidate file and build its stub if it passes the filters.
    fn process_file(&self, path: PathBuf) -> Option<Result<FileRecord, ScanError>> {
        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                let err = ScanError::from_io(path, e);
                match err {
                    ScanError::NotFound { .. } => log::debug!("{err} (removed during scan?)"),
                    _ => log::warn!("{err}"),
                }
                return Some(Err(err));
            }
        };

        if !metadata.is_file() {
            return None;
        }

        let size = metadata.len();
        if size == 0 {
            log::trace!("Skipping empty file: {}", path.display());
            return None;
        }
        if size < self.config.min_size {
            log::trace!(
                "Skipping file below minimum size ({} < {}): {}",
                size,
                self.config.min_size,
                path.display()
            );
            return None;
        }

        Some(Ok(FileRecord::from_metadata(path, &metadata)))
    }
}

/// Canonicalize roots, drop unusable ones and collapse nested roots.
fn normalize_roots(roots: &[PathBuf], config: &WalkerConfig) -> Vec<PathBuf> {
    let mut canonical: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        let path = match std::fs::canonicalize(root) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Skipping root {}: {}", root.display(), e);
                continue;
            }
        };
        if !path.is_dir() {
            log::warn!("Skipping root {}: not a directory", path.display());
            continue;
        }
        if config.path_has_excluded_segment(&path) {
            log::info!("Skipping root {}: inside an excluded directory", path.display());
            continue;
        }
        canonical.push(path);
    }

    // Ancestors sort before their descendants, so one pass is enough.
    canonical.sort();
    canonical.dedup();
    let mut kept: Vec<PathBuf> = Vec::with_capacity(canonical.len());
    for path in canonical {
        if let Some(parent) = kept.iter().find(|k| path.starts_with(k)) {
            log::debug!(
                "Root {} is already covered by {}",
                path.display(),
                parent.display()
            );
            continue;
        }
        kept.push(path);
    }
    kept
}

#[cfg(not(windows))]
fn is_hidden(name: &OsStr, _path: &Path) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(windows)]
fn is_hidden(name: &OsStr, path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    name.to_string_lossy().starts_with('.')
        || std::fs::symlink_metadata(path)
            .is_ok_and(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
}
