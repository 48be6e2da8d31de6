//! CLI output formatting for all pipeline stages.
//!
//! # Line Format
//!
//! Every progress line carries a timestamp, a stage tag, and the file it
//! concerns, so a long parallel run stays greppable per file and per
//! stage:
//!
//! ```text
//! 20240101.120000 check   holiday.bmp (34012 bytes)
//! 20240101.120000 convert holiday.bmp bmp -> jpeg
//! 20240101.120000 reduce  holiday.bmp attempt 001 -> 5000x3333
//! 20240101.120001 reduce  holiday.bmp done after 001 attempts (5000x3333, 22941210 bytes)
//! 20240101.120001 copy    holiday.bmp -> holiday_reduced.jpeg
//! ```
//!
//! The stage tags are the taxonomy of the pipeline itself: `check`
//! (classification and sizing), `convert` (format normalization), `reduce`
//! (the shrink loop), `copy` (placement into the output directory), plus
//! `error` for per-file failures.
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns lines) for testability and
//! a `print_*` wrapper that writes to stdout. Format functions are pure —
//! no I/O, no clock access; the caller supplies the timestamp.

use crate::batch::{BatchEvent, CheckEntry, Summary};
use chrono::{DateTime, Local};

// ============================================================================
// Shared helpers
// ============================================================================

/// Timestamp in the run log format, second resolution.
pub fn timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d.%H%M%S").to_string()
}

/// Format an attempt counter as 3-digit zero-padded.
fn format_attempt(attempt: u32) -> String {
    format!("{:0>3}", attempt)
}

/// One log line: timestamp, left-aligned stage tag, message.
fn stage_line(ts: &str, stage: &str, message: &str) -> String {
    format!("{} {:<7} {}", ts, stage, message)
}

// ============================================================================
// Progress events
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_event(event: &BatchEvent, ts: &str) -> Vec<String> {
    match event {
        BatchEvent::FileStarted {
            file_name,
            size_bytes,
        } => {
            vec![stage_line(
                ts,
                "check",
                &format!("{} ({} bytes)", file_name, size_bytes),
            )]
        }
        BatchEvent::FileSkipped {
            file_name,
            extension,
        } => {
            vec![stage_line(
                ts,
                "check",
                &format!(
                    "{} skipped (extension {:?} not supported)",
                    file_name, extension
                ),
            )]
        }
        BatchEvent::ConvertStarted { file_name, from } => {
            vec![stage_line(
                ts,
                "convert",
                &format!("{} {} -> jpeg", file_name, from),
            )]
        }
        BatchEvent::ConvertFinished { file_name } => {
            vec![stage_line(ts, "convert", &format!("{} done", file_name))]
        }
        BatchEvent::ReduceStarted { file_name } => {
            vec![stage_line(ts, "reduce", file_name)]
        }
        BatchEvent::ReduceAttempt {
            file_name,
            attempt,
            dims,
        } => {
            vec![stage_line(
                ts,
                "reduce",
                &format!("{} attempt {} -> {}", file_name, format_attempt(*attempt), dims),
            )]
        }
        BatchEvent::ReduceFinished {
            file_name,
            attempts,
            dims,
            measured,
        } => {
            let message = if *attempts == 0 {
                format!("{} within budget ({}, {})", file_name, dims, measured)
            } else {
                format!(
                    "{} done after {} attempts ({}, {})",
                    file_name,
                    format_attempt(*attempts),
                    dims,
                    measured
                )
            };
            vec![stage_line(ts, "reduce", &message)]
        }
        BatchEvent::Copied {
            file_name,
            output_name,
        } => {
            vec![stage_line(
                ts,
                "copy",
                &format!("{} -> {}", file_name, output_name),
            )]
        }
        BatchEvent::FileFailed { file_name, message } => {
            vec![stage_line(
                ts,
                "error",
                &format!("{} {}", file_name, message),
            )]
        }
    }
}

/// Print a progress event to stdout, stamped with the current time.
pub fn print_event(event: &BatchEvent) {
    let ts = timestamp(Local::now());
    for line in format_event(event, &ts) {
        println!("{}", line);
    }
}

// ============================================================================
// Run summary
// ============================================================================

/// Format the end-of-run summary line.
pub fn format_summary(summary: &Summary, cancelled: bool) -> String {
    let mut line = format!(
        "Done: {} reduced, {} within budget, {} skipped, {} failed",
        summary.reduced, summary.within_budget, summary.skipped, summary.failed
    );
    if cancelled {
        line.push_str(&format!(" ({} not processed, run cancelled)", summary.cancelled));
    }
    line
}

/// Print the end-of-run summary to stdout.
pub fn print_summary(summary: &Summary, cancelled: bool) {
    println!("{}", format_summary(summary, cancelled));
}

// ============================================================================
// Check (dry inspection)
// ============================================================================

/// Format the `check` listing: one line per input file with its
/// classification, then a totals line.
pub fn format_check_output(entries: &[CheckEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut admitted = 0usize;

    for entry in entries {
        // A size that cannot be read is reported as such, never as 0.
        let size = match entry.size_bytes {
            Some(n) => format!("{} bytes", n),
            None => "size unreadable".to_string(),
        };
        match entry.format {
            Some(format) => {
                admitted += 1;
                lines.push(format!("{} ({}) {}", entry.file, size, format));
            }
            None => {
                lines.push(format!(
                    "{} ({}) skip (extension not supported)",
                    entry.file, size
                ));
            }
        }
    }

    lines.push(format!(
        "{} files, {} admitted, {} skipped",
        entries.len(),
        admitted,
        entries.len() - admitted
    ));
    lines
}

/// Print the check listing to stdout.
pub fn print_check_output(entries: &[CheckEntry]) {
    for line in format_check_output(entries) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
