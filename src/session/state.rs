//! Session lifecycle states.

use serde::Serialize;

/// Where the engine is in its scan lifecycle.
///
/// `Idle → Scanning → {Complete | Error | Cancelled}`. The three terminal
/// states return to `Idle` on reset, or implicitly when a new scan starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No scan has run since the last reset
    #[default]
    Idle,
    /// A scan is in progress
    Scanning,
    /// The last scan finished and its groups are available
    Complete,
    /// The last scan failed
    Error,
    /// The last scan was cancelled
    Cancelled,
}

impl SessionState {
    /// Whether this state ends a scan.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Complete | SessionState::Error | SessionState::Cancelled
        )
    }

    /// Lowercase name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Scanning => "scanning",
            SessionState::Complete => "complete",
            SessionState::Error => "error",
            SessionState::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
