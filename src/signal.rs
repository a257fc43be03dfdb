//! Cooperative cancellation and Ctrl+C handling.
//!
//! A [`CancellationToken`] is a shared `AtomicBool`. The engine creates one
//! per scan session and hands clones to the walker thread and to every
//! hashing worker; each polls it between files. Cancelling never interrupts
//! a single-file operation that is already running.
//!
//! The binary installs a process-wide Ctrl+C hook with [`install_handler`].
//! The hook only flips a token; the CLI observes it and forwards the
//! request to the running session.
//!
//! # Usage
//!
//! ```rust,no_run
//! use shadowwipe::signal::install_handler;
//!
//! let interrupt = install_handler();
//! if interrupt.is_cancelled() {
//!     println!("Interrupted");
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption.
/// This follows Unix convention: 128 + signal number (SIGINT = 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared cancellation flag.
///
/// Clones observe the same flag. `Send + Sync`, so clones can move into
/// worker threads freely.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag so the token can be reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static INTERRUPT: OnceLock<CancellationToken> = OnceLock::new();

/// Install the process-wide Ctrl+C hook and return its token.
///
/// Safe to call more than once (tests call `run_app()` repeatedly): later
/// calls reset and return the token registered by the first call. If the
/// hook cannot be registered, an unhooked token is returned so callers can
/// still cancel manually.
pub fn install_handler() -> CancellationToken {
    let token = INTERRUPT.get_or_init(|| {
        let token = CancellationToken::new();
        if let Err(e) = register(token.clone()) {
            log::debug!("{e}; continuing without a Ctrl+C hook");
        }
        token
    });
    token.reset();
    token.clone()
}

fn register(token: CancellationToken) -> Result<(), SignalError> {
    ctrlc::set_handler(move || {
        token.cancel();
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Cancelling scan...");
        let _ = std::io::stderr().flush();
        log::info!("Interrupt signal received");
    })?;
    Ok(())
}
