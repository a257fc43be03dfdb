//! JSON output for scan results and delete operations.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "groups": [
//!     {
//!       "id": "9f2c...",
//!       "kind": "exact",
//!       "similarity": 0,
//!       "files": [{ "path": "/a.txt", "size": 100, "fullHash": "..." }],
//!       "totalSize": 200,
//!       "wastedSize": 100
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 3,
//!     "exact_groups": 1,
//!     "similar_groups": 0,
//!     "reclaimable_space": 100,
//!     "scan_duration_ms": 12,
//!     "exit_code": 0,
//!     "exit_code_name": "SW000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::actions::DeleteOperation;
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Files enumerated
    pub total_files: usize,
    /// Bytes enumerated
    pub total_size: u64,
    /// Exact duplicate groups
    pub exact_groups: usize,
    /// Similar image groups
    pub similar_groups: usize,
    /// Redundant copies across exact groups
    pub duplicate_files: usize,
    /// Bytes reclaimable from exact groups
    pub reclaimable_space: u64,
    /// Images that produced a perceptual signature
    pub images_hashed: usize,
    /// Files a hashing stage could not read
    pub failed_files: usize,
    /// Entries the walker skipped because of errors
    pub scan_errors: usize,
    /// Wall time of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Numeric exit code
    pub exit_code: i32,
    /// Machine-readable exit code name (e.g. "SW000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Build from a scan summary and the run's exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            exact_groups: summary.exact_groups,
            similar_groups: summary.similar_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            images_hashed: summary.images_hashed,
            failed_files: summary.failed_files,
            scan_errors: summary.scan_errors,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON document for a scan.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Groups in canonical order
    pub groups: &'a [DuplicateGroup],
    /// Scan statistics
    pub summary: JsonSummary,
}

impl<'a> JsonOutput<'a> {
    /// Wrap groups and summary for serialization.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            groups,
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

/// Write a delete operation as pretty JSON followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_delete_operation<W: Write>(
    op: &DeleteOperation,
    writer: &mut W,
) -> Result<(), JsonOutputError> {
    write_json(op, writer, true)
}

fn write_json<T: Serialize, W: Write>(
    value: &T,
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
