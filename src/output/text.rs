//! Human-readable terminal output.
//!
//! Counts and sizes are highlighted with ANSI colors unless color is turned
//! off, either with `--no-color` or because stdout is not a terminal.

use std::fmt::Display;
use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::{Color, Condition, Paint, Painted, Style};

use crate::engine::DetectionReport;
use crate::scanner::ScanOutcome;
use crate::triage::MonthSummary;

const HEADING: Style = Style::new().bold();
const COUNT: Style = Style::new().fg(Color::Cyan).bold();
const SAVINGS: Style = Style::new().fg(Color::Green).bold();
const WARNING: Style = Style::new().fg(Color::Yellow);
const MUTED: Style = Style::new().dim();

/// Plain text formatter.
#[derive(Debug, Clone, Copy)]
pub struct TextOutput {
    color: bool,
}

impl TextOutput {
    /// Create a formatter.
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint<'a, T: Display + ?Sized>(&self, value: &'a T, style: Style) -> Painted<&'a T> {
        let condition = if self.color {
            Condition::ALWAYS
        } else {
            Condition::NEVER
        };
        value.paint(style).whenever(condition)
    }

    /// Summarize a finished scan.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_scan_summary<W: Write>(&self, w: &mut W, outcome: &ScanOutcome) -> io::Result<()> {
        if outcome.cancelled {
            writeln!(
                w,
                "{} {} of {} photos indexed before cancellation.",
                self.paint("Scan interrupted.", WARNING),
                self.paint(&outcome.indexed_total(), COUNT),
                outcome.total
            )?;
        } else {
            writeln!(
                w,
                "{} {} photos indexed ({} hashed, {} unchanged).",
                self.paint("Scan complete.", HEADING),
                self.paint(&outcome.indexed_total(), COUNT),
                outcome.indexed,
                outcome.reused
            )?;
        }
        if outcome.skipped > 0 {
            writeln!(
                w,
                "{}",
                self.paint(
                    &format!("{} photos could not be read and were skipped.", outcome.skipped),
                    WARNING
                )
            )?;
        }
        writeln!(
            w,
            "{}",
            self.paint(&format!("Index: {}", outcome.index_path.display()), MUTED)
        )
    }

    /// List duplicate groups with their reclaimable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_detection_report<W: Write>(
        &self,
        w: &mut W,
        report: &DetectionReport,
    ) -> io::Result<()> {
        if report.is_empty() {
            writeln!(
                w,
                "No duplicates among {} photos.",
                self.paint(&report.fingerprint_count, COUNT)
            )?;
            return self.write_index_age(w, report);
        }

        for (number, group) in report.groups.iter().enumerate() {
            let bytes = group.estimated_bytes.unwrap_or(0);
            writeln!(
                w,
                "{} {} ({} duplicates, {})",
                self.paint(&format!("Group {}", number + 1), HEADING),
                self.paint(group.id.as_str(), MUTED),
                group.duplicate_count(),
                self.paint(&ByteSize::b(bytes).to_string(), SAVINGS)
            )?;
            writeln!(w, "  keep    {}", group.representative.id)?;
            for duplicate in &group.duplicates {
                let size = group
                    .estimated_bytes_for(&duplicate.id)
                    .map(|b| ByteSize::b(b).to_string())
                    .unwrap_or_else(|| "?".to_string());
                writeln!(w, "  delete  {} ({})", duplicate.id, size)?;
            }
        }

        writeln!(w)?;
        writeln!(
            w,
            "{} duplicate groups, {} photos can be removed, {} reclaimable.",
            self.paint(&report.groups.len(), COUNT),
            self.paint(&report.duplicate_count(), COUNT),
            self.paint(&ByteSize::b(report.total_estimated_bytes).to_string(), SAVINGS)
        )?;
        self.write_index_age(w, report)
    }

    fn write_index_age<W: Write>(&self, w: &mut W, report: &DetectionReport) -> io::Result<()> {
        writeln!(
            w,
            "{}",
            self.paint(
                &format!(
                    "Index generated {}",
                    report.index_generated_at.format("%Y-%m-%d %H:%M UTC")
                ),
                MUTED
            )
        )
    }

    /// List review months with their pending deletions.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_months<W: Write>(&self, w: &mut W, months: &[MonthSummary]) -> io::Result<()> {
        if months.is_empty() {
            return writeln!(w, "The library has no photos.");
        }
        let width = months.iter().map(|m| m.key.len()).max().unwrap_or(0);
        for month in months {
            write!(
                w,
                "{:<width$}  {:<16} {:>6} photos",
                month.key,
                month.title,
                month.total_count,
                width = width
            )?;
            if month.pending_deletion_count > 0 {
                write!(
                    w,
                    "  {}",
                    self.paint(
                        &format!("{} marked", month.pending_deletion_count),
                        WARNING
                    )
                )?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}
