//! Human-readable report for the terminal.
//!
//! Colors come from `yansi`; callers disable them globally with
//! `yansi::disable()` for `--no-color` or non-terminal output.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::DeleteOperation;
use crate::duplicates::{DuplicateGroup, GroupKind, ScanSummary};

/// Text report over a finished scan.
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
    summary: &'a ScanSummary,
}

impl<'a> TextOutput<'a> {
    /// Create a report.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], summary: &'a ScanSummary) -> Self {
        Self { groups, summary }
    }

    /// Write every group followed by the summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (index, group) in self.groups.iter().enumerate() {
            write_group(writer, index + 1, group)?;
        }
        self.write_summary(writer)
    }

    fn write_summary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let s = self.summary;
        writeln!(writer, "{}", "Summary".bold())?;
        writeln!(
            writer,
            "  Scanned:      {} files ({})",
            s.total_files,
            s.total_size_display()
        )?;
        writeln!(
            writer,
            "  Exact groups: {} ({} redundant files)",
            s.exact_groups, s.duplicate_files
        )?;
        if s.images_hashed > 0 || s.similar_groups > 0 {
            writeln!(
                writer,
                "  Similar:      {} groups from {} images",
                s.similar_groups, s.images_hashed
            )?;
        }
        writeln!(
            writer,
            "  Reclaimable:  {} ({:.1}%)",
            s.reclaimable_display().green().bold(),
            s.wasted_percentage()
        )?;
        let skipped = s.failed_files + s.scan_errors;
        if skipped > 0 {
            writeln!(writer, "  Skipped:      {} unreadable entries", skipped.yellow())?;
        }
        writeln!(writer, "  Duration:     {:.2?}", s.scan_duration)
    }
}

fn write_group<W: Write>(writer: &mut W, number: usize, group: &DuplicateGroup) -> io::Result<()> {
    let heading = match group.kind {
        GroupKind::Exact => format!("Group {number}: exact").cyan().bold().to_string(),
        GroupKind::Similar => format!("Group {number}: similar (distance {})", group.similarity)
            .magenta()
            .bold()
            .to_string(),
    };
    writeln!(
        writer,
        "{heading}  {} files, {} total, {} wasted",
        group.len(),
        ByteSize::b(group.total_size),
        ByteSize::b(group.wasted_size).red()
    )?;
    for (i, file) in group.files.iter().enumerate() {
        let marker = if i == 0 { "*" } else { " " };
        writeln!(
            writer,
            "  {marker} {}  {}",
            file.path.display(),
            ByteSize::b(file.size).dim()
        )?;
    }
    writeln!(writer)
}

/// Write the outcome of a delete request.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_delete_operation<W: Write>(writer: &mut W, op: &DeleteOperation) -> io::Result<()> {
    for path in &op.deleted_paths {
        writeln!(writer, "{} {}", "trashed".green(), path.display())?;
    }
    for failed in &op.failed_paths {
        writeln!(
            writer,
            "{} {}: {}",
            "failed ".red(),
            failed.path.display(),
            failed.reason
        )?;
    }
    writeln!(writer, "{}", op.summary().bold())
}
