//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based candidate bucketing
//! - Partial and full hash comparison
//! - Transitive similar-image clustering
//! - Final group assembly

pub mod finder;
pub mod groups;
pub mod similar;

pub use finder::{
    build_pool, full_hash_stage, partial_hash_stage, perceptual_stage, DuplicateFinder,
    FinderConfig, FinderError, HashStageStats, ScanSummary, StageContext, WALK_QUEUE_CAPACITY,
};
pub use groups::{
    group_by_size, group_id, member_paths, DuplicateGroup, GroupAssembler, GroupKind,
    GroupingStats, SizeIndex,
};
pub use similar::{cluster_signatures, DisjointSet, SimilarCluster};
