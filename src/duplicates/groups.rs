//! Size bucketing, duplicate groups and final group assembly.
//!
//! # Overview
//!
//! Size grouping is the first filter of the pipeline: files with different
//! sizes cannot be duplicates, so only buckets with two or more members go
//! on to hashing. [`SizeIndex`] builds the buckets incrementally as stubs
//! arrive from the walker; [`group_by_size`] is the batch form.
//!
//! At the other end, [`GroupAssembler`] turns exact-duplicate sets and
//! similar-image clusters into [`DuplicateGroup`]s with stable ids and
//! derived sizes, in canonical display order.
//!
//! # Example
//!
//! ```
//! use shadowwipe::scanner::FileRecord;
//! use shadowwipe::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024, 0),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024, 0),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048, 0),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(groups.len(), 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::{hash_to_hex, FileRecord};

/// Statistics from size grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files indexed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of distinct file sizes
    pub unique_sizes: usize,
    /// Number of files that could be duplicates (in buckets of 2+)
    pub potential_duplicates: usize,
    /// Number of files eliminated as unique (singleton buckets)
    pub eliminated_unique: usize,
    /// Number of buckets with 2+ files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Incremental size index fed by the walker.
///
/// Bucket members keep their insertion (discovery) order.
#[derive(Debug, Default)]
pub struct SizeIndex {
    buckets: HashMap<u64, Vec<FileRecord>>,
    total_files: usize,
    total_size: u64,
}

impl SizeIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one stub.
    pub fn insert(&mut self, file: FileRecord) {
        self.total_files += 1;
        self.total_size += file.size;
        self.buckets.entry(file.size).or_default().push(file);
    }

    /// Number of stubs indexed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.total_files
    }

    /// Whether nothing has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }

    /// Drop singleton buckets and return the candidates.
    #[must_use]
    pub fn into_candidates(self) -> (HashMap<u64, Vec<FileRecord>>, GroupingStats) {
        let mut stats = GroupingStats {
            total_files: self.total_files,
            total_size: self.total_size,
            unique_sizes: self.buckets.len(),
            ..Default::default()
        };

        let candidates: HashMap<u64, Vec<FileRecord>> = self
            .buckets
            .into_iter()
            .filter(|(size, files)| {
                if files.len() < 2 {
                    stats.eliminated_unique += files.len();
                    log::trace!("Eliminated unique size {}: {}", size, files[0].path.display());
                    false
                } else {
                    stats.potential_duplicates += files.len();
                    stats.duplicate_groups += 1;
                    true
                }
            })
            .collect();

        log::info!(
            "Size grouping: {} files → {} candidates ({:.1}% eliminated)",
            stats.total_files,
            stats.potential_duplicates,
            stats.elimination_rate()
        );

        (candidates, stats)
    }
}

/// Group files by exact size, discarding buckets with fewer than 2 members.
#[must_use]
pub fn group_by_size(
    files: impl IntoIterator<Item = FileRecord>,
) -> (HashMap<u64, Vec<FileRecord>>, GroupingStats) {
    let mut index = SizeIndex::new();
    for file in files {
        index.insert(file);
    }
    index.into_candidates()
}

/// How the members of a group relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    /// Byte-identical content
    Exact,
    /// Visually similar images
    Similar,
}

impl GroupKind {
    /// Lower-case name used in ids and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GroupKind::Exact => "exact",
            GroupKind::Similar => "similar",
        }
    }
}

impl std::fmt::Display for GroupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished group of duplicate or similar files.
///
/// Read-only once assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    /// Hex BLAKE3 of the kind and sorted member paths
    pub id: String,
    /// Exact or similar
    pub kind: GroupKind,
    /// 0 for exact groups; worst-pair Hamming distance for similar groups
    pub similarity: u32,
    /// Members in discovery order (at least two)
    pub files: Vec<FileRecord>,
    /// Sum of member sizes
    pub total_size: u64,
    /// `total_size` minus the size of the first member
    pub wasted_size: u64,
}

impl DuplicateGroup {
    /// Build a group, deriving its id and sizes.
    ///
    /// # Arguments
    ///
    /// * `kind` - Exact or similar
    /// * `similarity` - Distance hint (ignored for exact groups)
    /// * `files` - Members in discovery order
    #[must_use]
    pub fn new(kind: GroupKind, similarity: u32, files: Vec<FileRecord>) -> Self {
        debug_assert!(files.len() >= 2, "groups need at least two members");
        let total_size: u64 = files.iter().map(|f| f.size).sum();
        let wasted_size = total_size.saturating_sub(files.first().map_or(0, |f| f.size));
        let similarity = match kind {
            GroupKind::Exact => 0,
            GroupKind::Similar => similarity,
        };
        Self {
            id: group_id(kind, files.iter().map(|f| f.path.as_path())),
            kind,
            similarity,
            files,
            total_size,
            wasted_size,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of redundant copies (members minus one).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Member paths in discovery order.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Whether `path` is a member of this group.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }
}

/// Stable group id: hex BLAKE3 over the kind and the sorted member paths.
///
/// Independent of member order, so re-scanning the same tree yields the
/// same ids.
#[must_use]
pub fn group_id<'a>(kind: GroupKind, paths: impl IntoIterator<Item = &'a Path>) -> String {
    let mut sorted: Vec<&Path> = paths.into_iter().collect();
    sorted.sort();

    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_str().as_bytes());
    for path in sorted {
        hasher.update(&[0]);
        hasher.update(path.as_os_str().as_encoded_bytes());
    }
    hash_to_hex(hasher.finalize().as_bytes())
}

/// Every path that belongs to at least one group.
#[must_use]
pub fn member_paths(groups: &[DuplicateGroup]) -> HashSet<PathBuf> {
    groups
        .iter()
        .flat_map(|g| g.files.iter().map(|f| f.path.clone()))
        .collect()
}

/// Combines exact sets and similar clusters into the final group list.
#[derive(Debug, Default)]
pub struct GroupAssembler {
    exact: Vec<DuplicateGroup>,
    similar: Vec<DuplicateGroup>,
}

impl GroupAssembler {
    /// Create an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one set of byte-identical files. Sets with fewer than 2 members
    /// are ignored.
    pub fn add_exact(&mut self, files: Vec<FileRecord>) {
        if files.len() >= 2 {
            self.exact.push(DuplicateGroup::new(GroupKind::Exact, 0, files));
        }
    }

    /// Add one similar-image cluster. Clusters with fewer than 2 members
    /// are ignored.
    pub fn add_similar(&mut self, files: Vec<FileRecord>, similarity: u32) {
        if files.len() >= 2 {
            self.similar
                .push(DuplicateGroup::new(GroupKind::Similar, similarity, files));
        }
    }

    /// Publish the final list: exact groups first, then similar groups,
    /// each ordered by wasted size (descending) and then id.
    ///
    /// A similar cluster with exactly the same members as an exact group
    /// adds nothing and is dropped.
    #[must_use]
    pub fn finish(self) -> Vec<DuplicateGroup> {
        let exact_sets: HashSet<Vec<PathBuf>> = self.exact.iter().map(sorted_paths).collect();

        let mut exact = self.exact;
        let mut similar: Vec<DuplicateGroup> = self
            .similar
            .into_iter()
            .filter(|group| {
                let redundant = exact_sets.contains(&sorted_paths(group));
                if redundant {
                    log::debug!(
                        "Dropping similar group {}: same members as an exact group",
                        group.id
                    );
                }
                !redundant
            })
            .collect();

        let by_waste = |a: &DuplicateGroup, b: &DuplicateGroup| {
            b.wasted_size
                .cmp(&a.wasted_size)
                .then_with(|| a.id.cmp(&b.id))
        };
        exact.sort_by(by_waste);
        similar.sort_by(by_waste);

        exact.extend(similar);
        exact
    }
}

fn sorted_paths(group: &DuplicateGroup) -> Vec<PathBuf> {
    let mut paths = group.paths();
    paths.sort();
    paths
}
