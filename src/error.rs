//! Exit codes and structured errors for the binary.

use serde::Serialize;

/// Process exit codes.
///
/// - 0: completed, duplicates found (or every requested file trashed)
/// - 1: unexpected failure
/// - 2: completed, no duplicates found
/// - 3: delete finished but some files could not be trashed
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Scan completed and duplicates were found.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Scan completed but no duplicates were found.
    NoDuplicates = 2,
    /// Some paths in a delete request failed.
    PartialSuccess = 3,
    /// Interrupted by the user.
    Interrupted = crate::signal::EXIT_CODE_INTERRUPTED as isize,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "SW000",
            Self::GeneralError => "SW001",
            Self::NoDuplicates => "SW002",
            Self::PartialSuccess => "SW003",
            Self::Interrupted => "SW130",
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // Every variant fits in a u8.
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

/// Error details for `--json-errors` output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// Machine-readable code (e.g. "SW001")
    pub code: String,
    /// Numeric exit code
    pub exit_code: i32,
    /// Human-readable message, including causes
    pub message: String,
    /// Whether the run was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Build from an error and the exit code it maps to.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
