//! Scan events, progress sinks and throttled stage reporting.
//!
//! The pipeline reports through a [`ProgressSink`] trait object; nothing
//! here assumes a transport. Three sinks ship with the crate:
//!
//! - [`ChannelSink`] forwards events over a crossbeam channel
//! - [`Progress`] draws indicatif bars for the CLI
//! - [`NullSink`] discards everything
//!
//! [`ProgressReporter`] sits between the hashing workers and the sink. It
//! keeps the shared atomic counters, throttles emission, and goes silent
//! once the scan's [`CancellationToken`] has been cancelled.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::signal::CancellationToken;

/// Pipeline stage names as they appear in progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Enumerating files under the roots
    Walking,
    /// Hashing the head and tail of size-matched candidates
    PartialHashing,
    /// Hashing whole files that survived the partial stage
    FullHashing,
    /// Computing image signatures
    PerceptualHashing,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 4] = [
        Stage::Walking,
        Stage::PartialHashing,
        Stage::FullHashing,
        Stage::PerceptualHashing,
    ];

    /// Wire name of the stage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Walking => "walking",
            Stage::PartialHashing => "partial-hashing",
            Stage::FullHashing => "full-hashing",
            Stage::PerceptualHashing => "perceptual-hashing",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Stage::Walking => "Walking directories",
            Stage::PartialHashing => "Partial hashing",
            Stage::FullHashing => "Full hashing",
            Stage::PerceptualHashing => "Perceptual hashing",
        }
    }

    fn to_index(self) -> u8 {
        match self {
            Stage::Walking => 0,
            Stage::PartialHashing => 1,
            Stage::FullHashing => 2,
            Stage::PerceptualHashing => 3,
        }
    }

    fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time progress of one stage.
///
/// `total` is 0 while walking, until enumeration has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageProgress {
    /// Stage being reported
    pub stage: Stage,
    /// Units finished so far
    pub processed: usize,
    /// Units in the stage, 0 if not yet known
    pub total: usize,
}

/// Events emitted over the lifetime of one scan.
///
/// Exactly one of `Complete`, `Error` or `Cancelled` ends a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ScanEvent {
    /// Stage progress
    Progress(StageProgress),
    /// Scan finished; groups are available
    #[serde(rename_all = "camelCase")]
    Complete {
        /// Number of groups produced
        duplicate_group_count: usize,
    },
    /// Scan aborted by an engine fault
    Error {
        /// Human-readable description
        message: String,
    },
    /// Scan stopped at the user's request
    Cancelled,
}

impl ScanEvent {
    /// Whether this event ends a scan.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanEvent::Progress(_))
    }
}

/// Receiver of scan events.
///
/// Implementations are called from worker threads and must not block for
/// long.
pub trait ProgressSink: Send + Sync {
    /// Deliver one event.
    fn emit(&self, event: ScanEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ScanEvent) {}
}

/// Sink that forwards events over a crossbeam channel.
///
/// Send failures (receiver dropped) are ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<ScanEvent>,
}

impl ChannelSink {
    /// Create a sink together with the receiving end of an unbounded channel.
    #[must_use]
    pub fn new() -> (Self, Receiver<ScanEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ScanEvent) {
        let _ = self.sender.send(event);
    }
}

/// Shared progress counters for the active stage.
///
/// Workers bump `processed` concurrently; readers take a snapshot at any
/// time.
#[derive(Debug)]
pub struct ProgressCounters {
    stage: AtomicU8,
    processed: AtomicUsize,
    total: AtomicUsize,
}

const NO_STAGE: u8 = u8::MAX;

impl Default for ProgressCounters {
    fn default() -> Self {
        Self {
            stage: AtomicU8::new(NO_STAGE),
            processed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }
}

impl ProgressCounters {
    /// Create counters with no active stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage progress, or `None` before the first stage starts.
    #[must_use]
    pub fn snapshot(&self) -> Option<StageProgress> {
        let stage = Stage::from_index(self.stage.load(Ordering::SeqCst))?;
        Some(StageProgress {
            stage,
            processed: self.processed.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
        })
    }

    /// Forget the active stage.
    pub fn clear(&self) {
        self.stage.store(NO_STAGE, Ordering::SeqCst);
        self.processed.store(0, Ordering::SeqCst);
        self.total.store(0, Ordering::SeqCst);
    }
}

/// Stages with at most this many units report every unit.
const EVERY_UNIT_LIMIT: usize = 256;

/// Minimum spacing between throttled progress events.
const EMIT_INTERVAL: Duration = Duration::from_millis(100);

/// Throttled stage reporting for one scan.
///
/// Workers only take the emit lock when an event is due; the deadline is
/// an atomic so the common path of [`advance`](Self::advance) is lock-free.
/// Once the scan's token is cancelled no further progress is emitted.
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    cancel_token: CancellationToken,
    counters: Arc<ProgressCounters>,
    started: Instant,
    /// Milliseconds after `started` when the next throttled emit is due.
    next_emit_ms: AtomicU64,
    emit_lock: Mutex<()>,
}

impl ProgressReporter {
    /// Create a reporter with its own counters.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>, cancel_token: CancellationToken) -> Self {
        Self::with_counters(sink, cancel_token, Arc::new(ProgressCounters::new()))
    }

    /// Create a reporter that updates shared counters.
    #[must_use]
    pub fn with_counters(
        sink: Arc<dyn ProgressSink>,
        cancel_token: CancellationToken,
        counters: Arc<ProgressCounters>,
    ) -> Self {
        Self {
            sink,
            cancel_token,
            counters,
            started: Instant::now(),
            next_emit_ms: AtomicU64::new(0),
            emit_lock: Mutex::new(()),
        }
    }

    /// The counters this reporter writes.
    #[must_use]
    pub fn counters(&self) -> &Arc<ProgressCounters> {
        &self.counters
    }

    /// Start a stage with a known total (0 while walking).
    pub fn begin(&self, stage: Stage, total: usize) {
        self.counters.processed.store(0, Ordering::SeqCst);
        self.counters.total.store(total, Ordering::SeqCst);
        self.counters.stage.store(stage.to_index(), Ordering::SeqCst);
        log::debug!("Stage {} started ({} units)", stage, total);

        let _guard = self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.push_deadline();
        self.emit_current();
    }

    /// Record one finished unit, emitting if the throttle allows.
    pub fn advance(&self) {
        let processed = self.counters.processed.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.counters.total.load(Ordering::SeqCst);
        let forced = (total > 0 && total <= EVERY_UNIT_LIMIT) || processed == total;
        if !forced && !self.deadline_passed() {
            return;
        }

        let _guard = self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        // Another worker may have emitted while this one waited.
        if !forced && !self.deadline_passed() {
            return;
        }
        self.push_deadline();
        // Read again under the lock so emitted values never go backwards.
        self.emit_current();
    }

    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn deadline_passed(&self) -> bool {
        self.elapsed_ms() >= self.next_emit_ms.load(Ordering::Acquire)
    }

    fn push_deadline(&self) {
        let interval = u64::try_from(EMIT_INTERVAL.as_millis()).unwrap_or(u64::MAX);
        self.next_emit_ms
            .store(self.elapsed_ms().saturating_add(interval), Ordering::Release);
    }

    /// End the current stage.
    ///
    /// A stage that started with an unknown total (walking) adopts the
    /// processed count as its total.
    pub fn finish(&self) {
        let processed = self.counters.processed.load(Ordering::SeqCst);
        if self.counters.total.load(Ordering::SeqCst) == 0 {
            self.counters.total.store(processed, Ordering::SeqCst);
        }
        let _guard = self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.emit_current();
        if let Some(progress) = self.counters.snapshot() {
            log::debug!(
                "Stage {} finished ({}/{})",
                progress.stage,
                progress.processed,
                progress.total
            );
        }
    }

    fn emit_current(&self) {
        if self.cancel_token.is_cancelled() {
            return;
        }
        if let Some(progress) = self.counters.snapshot() {
            self.sink.emit(ScanEvent::Progress(progress));
        }
    }
}

/// Progress reporter using indicatif.
///
/// Shows one bar per stage; walking uses a spinner because its total is
/// unknown until enumeration ends.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<(Stage, ProgressBar)>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use shadowwipe::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn new_bar(&self, progress: StageProgress) -> ProgressBar {
        let pb = if progress.stage == Stage::Walking {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(progress.total as u64));
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_message(progress.stage.label());
        pb
    }

    fn finish_active(&self, message: Option<&str>) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((stage, pb)) = active.take() {
            match message {
                Some(msg) => pb.abandon_with_message(msg.to_string()),
                None => pb.finish_with_message(format!("{} complete", stage.label())),
            }
        }
    }
}

impl ProgressSink for Progress {
    fn emit(&self, event: ScanEvent) {
        if self.quiet {
            return;
        }

        match event {
            ScanEvent::Progress(progress) => {
                let same_stage = self
                    .active
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .as_ref()
                    .is_some_and(|(stage, _)| *stage == progress.stage);
                if !same_stage {
                    self.finish_active(None);
                    let pb = self.new_bar(progress);
                    *self.active.lock().unwrap_or_else(PoisonError::into_inner) =
                        Some((progress.stage, pb));
                }

                let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some((_, pb)) = active.as_ref() {
                    if progress.total > 0 && progress.stage != Stage::Walking {
                        pb.set_length(progress.total as u64);
                    }
                    pb.set_position(progress.processed as u64);
                }
            }
            ScanEvent::Complete { .. } => self.finish_active(None),
            ScanEvent::Error { message } => self.finish_active(Some(&message)),
            ScanEvent::Cancelled => self.finish_active(Some("Cancelled")),
        }
    }
}
