//! The command surface: one engine, at most one scan at a time.
//!
//! [`Engine`] owns the current session (settings, cancellation token and
//! result groups), the delete history and the thumbnail cache. A scan runs
//! on its own thread and reports through the engine's [`ProgressSink`];
//! every scan ends with exactly one terminal event.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use super::state::SessionState;
use crate::actions::{DeleteExecutor, DeleteOperation, SystemTrash, TrashBackend};
use crate::config::{ScanSettings, SettingsError};
use crate::duplicates::{
    member_paths, DuplicateFinder, DuplicateGroup, FinderConfig, FinderError, ScanSummary,
};
use crate::progress::{NullSink, ProgressCounters, ProgressSink, ScanEvent, StageProgress};
use crate::signal::CancellationToken;
use crate::thumbnail::{ImageThumbnails, ThumbnailCache, ThumbnailError, ThumbnailProvider};

/// Errors returned by engine commands.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A scan is already in progress.
    #[error("scan already in progress")]
    ScanAlreadyRunning,

    /// The settings cannot start a scan.
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),

    /// The scan thread could not be started.
    #[error("failed to start scan thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Data belonging to one scan.
#[derive(Debug)]
struct Session {
    settings: ScanSettings,
    cancel_token: CancellationToken,
    groups: Vec<DuplicateGroup>,
    summary: Option<ScanSummary>,
}

#[derive(Debug, Default)]
struct Status {
    state: SessionState,
    /// True from start until the terminal event has been delivered.
    running: bool,
    session: Option<Session>,
    last_error: Option<String>,
}

enum Outcome {
    Complete(Vec<DuplicateGroup>, ScanSummary),
    Cancelled,
    Failed(String),
}

struct Shared {
    active: AtomicBool,
    status: Mutex<Status>,
    finished: Condvar,
    counters: Arc<ProgressCounters>,
    history: Mutex<Vec<DeleteOperation>>,
    thumbnails: ThumbnailCache,
}

impl Shared {
    fn status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the scan result and return the matching terminal event.
    fn publish(&self, outcome: Outcome) -> ScanEvent {
        let mut status = self.status();
        match outcome {
            Outcome::Complete(groups, summary) => {
                let count = groups.len();
                status.state = SessionState::Complete;
                if let Some(session) = status.session.as_mut() {
                    session.groups = groups;
                    session.summary = Some(summary);
                }
                ScanEvent::Complete {
                    duplicate_group_count: count,
                }
            }
            Outcome::Cancelled => {
                status.state = SessionState::Cancelled;
                ScanEvent::Cancelled
            }
            Outcome::Failed(message) => {
                status.state = SessionState::Error;
                status.last_error = Some(message.clone());
                ScanEvent::Error { message }
            }
        }
    }

    /// Mark the scan slot free and wake waiters.
    fn release(&self) {
        let mut status = self.status();
        status.running = false;
        self.active.store(false, Ordering::SeqCst);
        self.finished.notify_all();
    }
}

/// Duplicate detection engine.
///
/// ```no_run
/// use shadowwipe::config::ScanSettings;
/// use shadowwipe::progress::ChannelSink;
/// use shadowwipe::session::Engine;
/// use std::path::PathBuf;
/// use std::sync::Arc;
///
/// let (sink, events) = ChannelSink::new();
/// let engine = Engine::new(Arc::new(sink));
/// engine.start_scan(ScanSettings::with_roots([PathBuf::from(".")])).unwrap();
/// for event in events.iter() {
///     if event.is_terminal() {
///         break;
///     }
/// }
/// println!("{} groups", engine.duplicate_groups().len());
/// ```
pub struct Engine {
    shared: Arc<Shared>,
    sink: Arc<dyn ProgressSink>,
    backend: Arc<dyn TrashBackend>,
    thumbnailer: Arc<dyn ThumbnailProvider>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Arc::new(NullSink))
    }
}

impl Engine {
    /// Create an engine that reports to `sink` and trashes through the OS.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                active: AtomicBool::new(false),
                status: Mutex::new(Status::default()),
                finished: Condvar::new(),
                counters: Arc::new(ProgressCounters::new()),
                history: Mutex::new(Vec::new()),
                thumbnails: ThumbnailCache::new(),
            }),
            sink,
            backend: Arc::new(SystemTrash),
            thumbnailer: Arc::new(ImageThumbnails),
            worker: Mutex::new(None),
        }
    }

    /// Use a different trash backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn TrashBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Use a different thumbnail provider.
    #[must_use]
    pub fn with_thumbnail_provider(mut self, provider: Arc<dyn ThumbnailProvider>) -> Self {
        self.thumbnailer = provider;
        self
    }

    /// Start a scan in the background.
    ///
    /// A previous terminal session is discarded first.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidSettings`] if `settings` fail validation
    /// - [`EngineError::ScanAlreadyRunning`] if a scan is in progress
    /// - [`EngineError::Spawn`] if the scan thread cannot be created
    pub fn start_scan(&self, settings: ScanSettings) -> Result<(), EngineError> {
        settings.validate()?;
        if self
            .shared
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("Rejected scan start: another scan is running");
            return Err(EngineError::ScanAlreadyRunning);
        }
        self.join_worker();

        let token = CancellationToken::new();
        {
            let mut status = self.shared.status();
            status.state = SessionState::Scanning;
            status.running = true;
            status.last_error = None;
            status.session = Some(Session {
                settings: settings.clone(),
                cancel_token: token.clone(),
                groups: Vec::new(),
                summary: None,
            });
        }
        self.shared.counters.clear();
        self.shared.thumbnails.clear();

        let config = FinderConfig::from_settings(&settings)
            .with_cancel_token(token)
            .with_sink(Arc::clone(&self.sink))
            .with_counters(Arc::clone(&self.shared.counters));
        let roots = settings.roots;
        let shared = Arc::clone(&self.shared);
        let sink = Arc::clone(&self.sink);

        log::info!("Starting scan of {} root(s)", roots.len());
        let spawned = thread::Builder::new()
            .name("shadowwipe-scan".to_string())
            .spawn(move || run_scan(&shared, sink.as_ref(), config, &roots));

        match spawned {
            Ok(handle) => {
                *self.lock_worker() = Some(handle);
                Ok(())
            }
            Err(e) => {
                let event = self
                    .shared
                    .publish(Outcome::Failed(format!("failed to start scan thread: {e}")));
                self.sink.emit(event);
                self.shared.release();
                Err(EngineError::Spawn(e))
            }
        }
    }

    /// Request cancellation of the running scan. No-op when idle.
    pub fn cancel_scan(&self) {
        let status = self.shared.status();
        if status.state == SessionState::Scanning {
            if let Some(session) = &status.session {
                log::info!("Cancelling scan");
                session.cancel_token.cancel();
            }
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.status().state
    }

    /// Groups from the last completed scan; empty in any other state.
    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        let status = self.shared.status();
        match (&status.state, &status.session) {
            (SessionState::Complete, Some(session)) => session.groups.clone(),
            _ => Vec::new(),
        }
    }

    /// Statistics from the last completed scan.
    #[must_use]
    pub fn summary(&self) -> Option<ScanSummary> {
        let status = self.shared.status();
        status.session.as_ref().and_then(|s| s.summary.clone())
    }

    /// Settings of the current session.
    #[must_use]
    pub fn settings(&self) -> Option<ScanSettings> {
        let status = self.shared.status();
        status.session.as_ref().map(|s| s.settings.clone())
    }

    /// Message of the last failed scan.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.shared.status().last_error.clone()
    }

    /// Progress of the running stage.
    #[must_use]
    pub fn progress(&self) -> Option<StageProgress> {
        self.shared.counters.snapshot()
    }

    /// Block until the running scan (if any) has delivered its terminal
    /// event, then return the state.
    pub fn wait(&self) -> SessionState {
        let mut status = self.shared.status();
        while status.running {
            status = self
                .shared
                .finished
                .wait(status)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let state = status.state;
        drop(status);
        self.join_worker();
        state
    }

    /// Return to `Idle`, cancelling and waiting for a running scan first.
    ///
    /// The delete history is kept.
    pub fn reset(&self) {
        self.cancel_scan();
        self.wait();
        {
            let mut status = self.shared.status();
            status.state = SessionState::Idle;
            status.session = None;
            status.last_error = None;
        }
        self.shared.counters.clear();
        self.shared.thumbnails.clear();
        log::debug!("Engine reset");
    }

    /// Move `paths` to the trash.
    ///
    /// While a completed session is held, only members of its groups are
    /// accepted. Groups are not modified.
    pub fn delete_files(&self, paths: &[PathBuf]) -> DeleteOperation {
        let known = {
            let status = self.shared.status();
            match (&status.state, &status.session) {
                (SessionState::Complete, Some(session)) => Some(member_paths(&session.groups)),
                _ => None,
            }
        };

        let mut executor = DeleteExecutor::new(Arc::clone(&self.backend));
        if let Some(known) = known {
            executor = executor.with_known_paths(known);
        }
        let op = executor.execute(paths);

        self.shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(op.clone());
        op
    }

    /// Every delete operation run by this engine, oldest first.
    #[must_use]
    pub fn operation_history(&self) -> Vec<DeleteOperation> {
        self.shared
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Preview data URI for an image, cached for the current session.
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError`] if the image cannot be rendered.
    pub fn thumbnail(&self, path: &Path) -> Result<String, ThumbnailError> {
        self.shared
            .thumbnails
            .get_or_render(path, self.thumbnailer.as_ref())
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn join_worker(&self) {
        let handle = self.lock_worker().take();
        if let Some(handle) = handle {
            // The scan body catches its own panics.
            let _ = handle.join();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cancel_scan();
        self.join_worker();
    }
}

fn run_scan(shared: &Shared, sink: &dyn ProgressSink, config: FinderConfig, roots: &[PathBuf]) {
    let token = config.cancel_token.clone();
    let finder = DuplicateFinder::new(config);
    let result = panic::catch_unwind(AssertUnwindSafe(|| finder.find_duplicates(roots)));

    let outcome = match result {
        Ok(Ok(_)) if token.is_cancelled() => Outcome::Cancelled,
        Ok(Ok((groups, summary))) => Outcome::Complete(groups, summary),
        Ok(Err(FinderError::Interrupted)) => Outcome::Cancelled,
        Ok(Err(e)) => {
            log::error!("Scan failed: {e}");
            Outcome::Failed(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("Scan worker panicked: {message}");
            Outcome::Failed(format!("scan worker panicked: {message}"))
        }
    };

    let event = shared.publish(outcome);
    log::debug!("Scan ended: {:?}", event);
    sink.emit(event);
    shared.release();
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
