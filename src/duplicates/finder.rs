//! Duplicate finder implementation with multi-stage detection.
//!
//! # Overview
//!
//! This module orchestrates the detection pipeline:
//! 1. **Walking**: a dedicated thread enumerates the roots and streams stubs
//!    over a bounded channel into the size index
//! 2. **Partial hashing**: same-size candidates are hashed over their first
//!    and last 64 KiB and regrouped by `(size, partial_hash)`
//! 3. **Full hashing**: survivors are hashed whole; equal hashes form exact
//!    groups
//! 4. **Perceptual hashing**: every image stub (regardless of the exact
//!    stages) gets a 64-bit signature; signatures within the threshold are
//!    clustered transitively
//!
//! Hashing stages run on dedicated rayon pools and poll the scan's
//! [`CancellationToken`] before every file.
//!
//! # Example
//!
//! ```no_run
//! use shadowwipe::config::ScanSettings;
//! use shadowwipe::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let settings = ScanSettings::with_roots([PathBuf::from(".")]);
//! let finder = DuplicateFinder::new(FinderConfig::from_settings(&settings));
//! let (groups, summary) = finder.find_duplicates(&settings.roots).unwrap();
//! println!("{} groups, {} reclaimable", groups.len(), summary.reclaimable_display());
//! ```

use std::collections::HashMap;
use std::hash::Hash as StdHash;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;

use super::groups::{DuplicateGroup, GroupAssembler, GroupKind, SizeIndex};
use super::similar::cluster_signatures;
use crate::config::ScanSettings;
use crate::progress::{NullSink, ProgressCounters, ProgressReporter, ProgressSink, Stage};
use crate::scanner::{FileRecord, Hash, Hasher, PerceptualHasher, Walker, WalkerConfig};
use crate::signal::CancellationToken;

/// Capacity of the queue between the walker thread and the size index.
pub const WALK_QUEUE_CAPACITY: usize = 4096;

/// Configuration for one run of the pipeline.
#[derive(Clone)]
pub struct FinderConfig {
    /// Threads in the partial and full hashing pool.
    pub io_threads: usize,
    /// Threads in the perceptual hashing pool.
    pub perceptual_threads: usize,
    /// Maximum Hamming distance for similar images; 0 disables the stage.
    pub similarity_threshold: u32,
    /// Walker filters.
    pub walker_config: WalkerConfig,
    /// Token polled between files.
    pub cancel_token: CancellationToken,
    /// Receiver of progress events.
    pub sink: Arc<dyn ProgressSink>,
    /// Shared stage counters.
    pub counters: Arc<ProgressCounters>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("perceptual_threads", &self.perceptual_threads)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("walker_config", &self.walker_config)
            .field("cancel_token", &self.cancel_token)
            .field("sink", &"<sink>")
            .finish_non_exhaustive()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self::from_settings(&ScanSettings::default())
    }
}

impl FinderConfig {
    /// Derive a configuration from scan settings.
    #[must_use]
    pub fn from_settings(settings: &ScanSettings) -> Self {
        Self {
            io_threads: settings.effective_io_threads(),
            perceptual_threads: settings.effective_perceptual_threads(),
            similarity_threshold: settings.similarity_threshold,
            walker_config: settings.walker_config(),
            cancel_token: CancellationToken::new(),
            sink: Arc::new(NullSink),
            counters: Arc::new(ProgressCounters::new()),
        }
    }

    /// Override the hashing pool size.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self.perceptual_threads = (self.io_threads / 2).max(1);
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Set the progress sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Share stage counters with an observer.
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<ProgressCounters>) -> Self {
        self.counters = counters;
        self
    }
}

/// Statistics from one hashing stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashStageStats {
    /// Files submitted to the stage
    pub input_files: usize,
    /// Files hashed successfully
    pub hashed_files: usize,
    /// Files dropped because they could not be read
    pub failed_files: usize,
    /// Files still grouped with at least one other file
    pub surviving_files: usize,
    /// Groups produced
    pub groups: usize,
}

impl HashStageStats {
    /// Percentage of hashed files that ended up alone.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.hashed_files == 0 {
            0.0
        } else {
            ((self.hashed_files - self.surviving_files) as f64 / self.hashed_files as f64) * 100.0
        }
    }
}

/// Summary statistics from a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Total number of files enumerated
    pub total_files: usize,
    /// Total size of enumerated files in bytes
    pub total_size: u64,
    /// Files eliminated by size grouping
    pub eliminated_by_size: usize,
    /// Files eliminated by the partial hash
    pub eliminated_by_partial: usize,
    /// Files that could not be read by a hashing stage
    pub failed_files: usize,
    /// Entries skipped by the walker because of errors
    pub scan_errors: usize,
    /// Images that produced a perceptual signature
    pub images_hashed: usize,
    /// Exact duplicate groups
    pub exact_groups: usize,
    /// Similar image groups
    pub similar_groups: usize,
    /// Redundant copies across exact groups
    pub duplicate_files: usize,
    /// Bytes reclaimable by keeping one copy per exact group
    pub reclaimable_space: u64,
    /// Wall time of the whole scan
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Total number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.exact_groups + self.similar_groups
    }

    /// Percentage of scanned bytes held by redundant copies.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Reclaimable space as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Total size as a human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        bytesize::ByteSize::b(self.total_size).to_string()
    }
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The scan's cancellation token was observed.
    #[error("Scan cancelled")]
    Interrupted,

    /// A rayon pool could not be built.
    #[error("Failed to build thread pool: {0}")]
    ThreadPool(String),

    /// The walker thread could not be started.
    #[error("Failed to start walker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// A worker thread panicked.
    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),
}

/// Shared handles for one hashing stage.
pub struct StageContext<'a> {
    /// Pool the stage runs on
    pub pool: &'a ThreadPool,
    /// Progress reporting for the stage
    pub reporter: &'a ProgressReporter,
    /// Token polled before each file
    pub cancel_token: &'a CancellationToken,
}

impl StageContext<'_> {
    fn check_cancelled(&self) -> Result<(), FinderError> {
        if self.cancel_token.is_cancelled() {
            Err(FinderError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Output of the walking stage.
#[derive(Debug, Default)]
pub struct WalkOutput {
    /// Stubs bucketed by size
    pub index: SizeIndex,
    /// Image stubs in discovery order (only collected when similarity is on)
    pub images: Vec<FileRecord>,
    /// Entries skipped because of errors
    pub scan_errors: usize,
}

/// Regroup keyed records, keeping first-seen group order and discovery
/// order inside each group. Groups with fewer than 2 members are dropped.
fn regroup<K: StdHash + Eq>(items: impl IntoIterator<Item = (K, FileRecord)>) -> Vec<Vec<FileRecord>> {
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<FileRecord>> = Vec::new();
    for (key, file) in items {
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(file);
    }
    groups.retain(|g| g.len() >= 2);
    groups
}

/// Build a named rayon pool.
///
/// # Errors
///
/// Returns [`FinderError::ThreadPool`] if the pool cannot be created.
pub fn build_pool(threads: usize, name: &'static str) -> Result<ThreadPool, FinderError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(move |i| format!("shadowwipe-{name}-{i}"))
        .build()
        .map_err(|e| FinderError::ThreadPool(e.to_string()))
}

/// Hash the head and tail of every candidate and regroup by
/// `(size, partial_hash)`.
///
/// Candidates that cannot be read are dropped. Each returned group holds
/// at least two files that share size and partial hash.
///
/// # Errors
///
/// Returns [`FinderError::Interrupted`] if the scan was cancelled.
pub fn partial_hash_stage(
    candidates: HashMap<u64, Vec<FileRecord>>,
    hasher: &Hasher,
    ctx: &StageContext<'_>,
) -> Result<(Vec<Vec<FileRecord>>, HashStageStats), FinderError> {
    let mut buckets: Vec<(u64, Vec<FileRecord>)> = candidates.into_iter().collect();
    buckets.sort_by(|a, b| b.0.cmp(&a.0));
    let files: Vec<FileRecord> = buckets.into_iter().flat_map(|(_, files)| files).collect();

    let mut stats = HashStageStats {
        input_files: files.len(),
        ..Default::default()
    };
    log::info!("Partial hashing {} candidates", files.len());
    ctx.reporter.begin(Stage::PartialHashing, files.len());

    let results: Vec<(FileRecord, Option<Result<Hash, crate::scanner::HashError>>)> =
        ctx.pool.install(|| {
            files
                .into_par_iter()
                .map(|file| {
                    if ctx.cancel_token.is_cancelled() {
                        return (file, None);
                    }
                    let result = hasher.partial_hash(&file.path);
                    ctx.reporter.advance();
                    (file, Some(result))
                })
                .collect()
        });
    ctx.check_cancelled()?;
    ctx.reporter.finish();

    let hashed = results.into_iter().filter_map(|(mut file, result)| match result? {
        Ok(hash) => {
            stats.hashed_files += 1;
            file.partial_hash = Some(hash);
            Some(((file.size, hash), file))
        }
        Err(e) => {
            stats.failed_files += 1;
            log::warn!("Failed to partial-hash {}: {}", file.path.display(), e);
            None
        }
    });
    let groups = regroup(hashed);

    stats.groups = groups.len();
    stats.surviving_files = groups.iter().map(Vec::len).sum();
    log::info!(
        "Partial hashing: {} files → {} candidates ({:.1}% eliminated)",
        stats.hashed_files,
        stats.surviving_files,
        stats.elimination_rate()
    );
    Ok((groups, stats))
}

/// Hash every surviving file in full and regroup by `(size, full_hash)`.
///
/// Each returned group is a set of byte-identical files (up to the BLAKE3
/// collision bound).
///
/// # Errors
///
/// Returns [`FinderError::Interrupted`] if the scan was cancelled.
pub fn full_hash_stage(
    partial_groups: Vec<Vec<FileRecord>>,
    hasher: &Hasher,
    ctx: &StageContext<'_>,
) -> Result<(Vec<Vec<FileRecord>>, HashStageStats), FinderError> {
    let files: Vec<FileRecord> = partial_groups.into_iter().flatten().collect();
    let mut stats = HashStageStats {
        input_files: files.len(),
        ..Default::default()
    };
    log::info!("Full hashing {} candidates", files.len());
    ctx.reporter.begin(Stage::FullHashing, files.len());

    let results: Vec<(FileRecord, Option<Result<Hash, crate::scanner::HashError>>)> =
        ctx.pool.install(|| {
            files
                .into_par_iter()
                .map(|file| {
                    if ctx.cancel_token.is_cancelled() {
                        return (file, None);
                    }
                    let result = hasher.full_hash(&file.path);
                    ctx.reporter.advance();
                    (file, Some(result))
                })
                .collect()
        });
    ctx.check_cancelled()?;
    ctx.reporter.finish();

    let hashed = results.into_iter().filter_map(|(mut file, result)| match result? {
        Ok(hash) => {
            stats.hashed_files += 1;
            file.full_hash = Some(hash);
            Some(((file.size, hash), file))
        }
        Err(e) => {
            stats.failed_files += 1;
            log::warn!("Failed to hash {}: {}", file.path.display(), e);
            None
        }
    });
    let groups = regroup(hashed);

    stats.groups = groups.len();
    stats.surviving_files = groups.iter().map(Vec::len).sum();
    log::info!(
        "Full hashing: {} exact groups with {} files",
        stats.groups,
        stats.surviving_files
    );
    Ok((groups, stats))
}

/// Compute signatures for image stubs and cluster them.
///
/// Images that fail to decode are skipped. Returns each cluster's members
/// (discovery order) with its worst-pair distance, plus the number of
/// images that produced a signature.
///
/// # Errors
///
/// Returns [`FinderError::Interrupted`] if the scan was cancelled.
pub fn perceptual_stage(
    images: Vec<FileRecord>,
    threshold: u32,
    ctx: &StageContext<'_>,
) -> Result<(Vec<(Vec<FileRecord>, u32)>, usize), FinderError> {
    log::info!("Perceptual hashing {} images", images.len());
    ctx.reporter.begin(Stage::PerceptualHashing, images.len());

    let results: Vec<Option<FileRecord>> = ctx.pool.install(|| {
        images
            .into_par_iter()
            .map_init(PerceptualHasher::new, |hasher, mut file| {
                if ctx.cancel_token.is_cancelled() {
                    return None;
                }
                let result = hasher.compute_hash(&file.path);
                ctx.reporter.advance();
                match result {
                    Ok(signature) => {
                        file.perceptual_hash = Some(signature);
                        Some(file)
                    }
                    Err(e) => {
                        log::debug!("Skipping image: {}", e);
                        None
                    }
                }
            })
            .collect()
    });
    ctx.check_cancelled()?;
    ctx.reporter.finish();

    let hashed: Vec<FileRecord> = results.into_iter().flatten().collect();
    let signatures: Vec<u64> = hashed.iter().filter_map(|f| f.perceptual_hash).collect();
    let clusters = cluster_signatures(&signatures, threshold);
    log::info!(
        "Perceptual hashing: {} signatures → {} similar clusters",
        signatures.len(),
        clusters.len()
    );

    let grouped = clusters
        .into_iter()
        .map(|cluster| {
            let files = cluster
                .members
                .iter()
                .map(|&idx| hashed[idx].clone())
                .collect();
            (files, cluster.similarity)
        })
        .collect();
    Ok((grouped, hashed.len()))
}

/// Duplicate finder that runs the whole pipeline for one scan.
pub struct DuplicateFinder {
    config: FinderConfig,
    hasher: Hasher,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            hasher: Hasher::new(),
        }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Run every stage over `roots` and assemble the final groups.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Interrupted`] when cancelled, or another
    /// [`FinderError`] when a thread or pool cannot be created.
    pub fn find_duplicates(
        &self,
        roots: &[PathBuf],
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let token = &self.config.cancel_token;
        let reporter = ProgressReporter::with_counters(
            Arc::clone(&self.config.sink),
            token.clone(),
            Arc::clone(&self.config.counters),
        );

        let walked = self.walk_stage(roots, &reporter)?;
        let mut summary = ScanSummary {
            scan_errors: walked.scan_errors,
            ..Default::default()
        };

        let (candidates, size_stats) = walked.index.into_candidates();
        summary.total_files = size_stats.total_files;
        summary.total_size = size_stats.total_size;
        summary.eliminated_by_size = size_stats.eliminated_unique;

        let io_pool = build_pool(self.config.io_threads, "hash")?;
        let ctx = StageContext {
            pool: &io_pool,
            reporter: &reporter,
            cancel_token: token,
        };

        let (partial_groups, partial_stats) = partial_hash_stage(candidates, &self.hasher, &ctx)?;
        summary.eliminated_by_partial = partial_stats.hashed_files - partial_stats.surviving_files;
        summary.failed_files += partial_stats.failed_files;

        let (exact_sets, full_stats) = full_hash_stage(partial_groups, &self.hasher, &ctx)?;
        summary.failed_files += full_stats.failed_files;

        let mut similar_sets = Vec::new();
        if self.config.similarity_threshold > 0 {
            let perceptual_pool = build_pool(self.config.perceptual_threads, "phash")?;
            let ctx = StageContext {
                pool: &perceptual_pool,
                reporter: &reporter,
                cancel_token: token,
            };
            let (sets, images_hashed) =
                perceptual_stage(walked.images, self.config.similarity_threshold, &ctx)?;
            similar_sets = sets;
            summary.images_hashed = images_hashed;
        }

        let (exact_sets, similar_sets) = share_fingerprints(exact_sets, similar_sets);

        let mut assembler = GroupAssembler::new();
        for files in exact_sets {
            assembler.add_exact(files);
        }
        for (files, similarity) in similar_sets {
            assembler.add_similar(files, similarity);
        }
        let groups = assembler.finish();

        for group in &groups {
            match group.kind {
                GroupKind::Exact => {
                    summary.exact_groups += 1;
                    summary.duplicate_files += group.duplicate_count();
                    summary.reclaimable_space += group.wasted_size;
                }
                GroupKind::Similar => summary.similar_groups += 1,
            }
        }
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Scan complete: {} exact groups, {} similar groups, {} reclaimable in {:.2?}",
            summary.exact_groups,
            summary.similar_groups,
            summary.reclaimable_display(),
            summary.scan_duration
        );
        Ok((groups, summary))
    }

    /// Enumerate the roots on a dedicated thread and index the stubs.
    fn walk_stage(
        &self,
        roots: &[PathBuf],
        reporter: &ProgressReporter,
    ) -> Result<WalkOutput, FinderError> {
        let token = self.config.cancel_token.clone();
        let walker = Walker::new(roots.to_vec(), self.config.walker_config.clone())
            .with_cancel_token(token.clone());
        let collect_images = self.config.similarity_threshold > 0;

        reporter.begin(Stage::Walking, 0);

        let (tx, rx) = crossbeam_channel::bounded::<FileRecord>(WALK_QUEUE_CAPACITY);
        let handle = std::thread::Builder::new()
            .name("shadowwipe-walker".to_string())
            .spawn(move || {
                let mut errors = 0usize;
                for entry in walker.walk() {
                    match entry {
                        Ok(file) => {
                            if tx.send(file).is_err() {
                                break;
                            }
                        }
                        Err(_) => errors += 1,
                    }
                }
                errors
            })
            .map_err(FinderError::Spawn)?;

        let mut output = WalkOutput::default();
        for file in &rx {
            if token.is_cancelled() {
                break;
            }
            reporter.advance();
            if collect_images && file.is_image() {
                output.images.push(file.clone());
            }
            output.index.insert(file);
        }
        drop(rx);

        output.scan_errors = handle
            .join()
            .map_err(|_| FinderError::WorkerPanicked("walker"))?;
        if token.is_cancelled() {
            return Err(FinderError::Interrupted);
        }
        reporter.finish();

        log::info!(
            "Walking: {} files, {} images, {} errors",
            output.index.len(),
            output.images.len(),
            output.scan_errors
        );
        Ok(output)
    }
}

/// Copy fingerprints between exact and similar members that share a path,
/// so every record carries everything the scan learned about it.
fn share_fingerprints(
    mut exact_sets: Vec<Vec<FileRecord>>,
    mut similar_sets: Vec<(Vec<FileRecord>, u32)>,
) -> (Vec<Vec<FileRecord>>, Vec<(Vec<FileRecord>, u32)>) {
    if similar_sets.is_empty() {
        return (exact_sets, similar_sets);
    }

    let content: HashMap<PathBuf, (Option<Hash>, Option<Hash>)> = exact_sets
        .iter()
        .flatten()
        .map(|f| (f.path.clone(), (f.partial_hash, f.full_hash)))
        .collect();
    let signatures: HashMap<PathBuf, u64> = similar_sets
        .iter()
        .flat_map(|(files, _)| files.iter())
        .filter_map(|f| f.perceptual_hash.map(|s| (f.path.clone(), s)))
        .collect();

    for file in exact_sets.iter_mut().flatten() {
        if let Some(signature) = signatures.get(&file.path) {
            file.perceptual_hash = Some(*signature);
        }
    }
    for file in similar_sets.iter_mut().flat_map(|(files, _)| files.iter_mut()) {
        if let Some((partial, full)) = content.get(&file.path) {
            file.partial_hash = *partial;
            file.full_hash = *full;
        }
    }
    (exact_sets, similar_sets)
}
