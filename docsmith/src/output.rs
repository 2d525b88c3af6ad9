use crate::commands::{FileOutcome, FileStatus};
use crate::pipeline::Skipped;
use crate::utils::normalize_display_path;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Print the exclusion list in styled format.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_exclusion_list(writer: &mut impl Write, folders: &[String]) -> std::io::Result<()> {
    if folders.is_empty() {
        let defaults = crate::constants::DEFAULT_EXCLUDE_FOLDERS();
        let mut sorted_defaults: Vec<&str> = defaults.iter().copied().collect();
        sorted_defaults.sort_unstable();
        writeln!(
            writer,
            "{} {}",
            "[OK] Using default exclusions only:".green(),
            sorted_defaults.join(", ").dimmed()
        )?;
    } else {
        writeln!(writer, "{} {}", "Excluding:".yellow().bold(), folders.join(", "))?;
    }
    Ok(())
}

/// Create a progress bar with file count.
///
/// Hidden in test mode and when `hidden` is set (verbose runs print their
/// own per-file lines).
#[must_use]
pub fn create_progress_bar(total_files: u64, hidden: bool) -> ProgressBar {
    if cfg!(test) || hidden {
        return ProgressBar::hidden();
    }

    let pb =
        ProgressBar::with_draw_target(Some(total_files), ProgressDrawTarget::stderr_with_hz(20));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.set_message("documenting...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.tick();
    pb
}

/// Print one warning per skipped definition.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_skipped(
    writer: &mut impl Write,
    file: &Path,
    skipped: &[Skipped],
) -> std::io::Result<()> {
    for s in skipped {
        writeln!(
            writer,
            "{} {}:{} {} {}",
            "[WARN]".yellow().bold(),
            normalize_display_path(file),
            s.line,
            s.name.bold(),
            format!("skipped: {}", s.reason).dimmed()
        )?;
    }
    Ok(())
}

/// Print a file-level failure.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_failure(writer: &mut impl Write, file: &Path, error: &str) -> std::io::Result<()> {
    writeln!(
        writer,
        "{} {}: {}",
        "[ERROR]".red().bold(),
        normalize_display_path(file),
        error
    )
}

/// Helper to create a styled table
fn create_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

fn status_cell(status: &FileStatus) -> Cell {
    match status {
        FileStatus::Written => Cell::new("written").fg(Color::Green),
        FileStatus::Printed => Cell::new("printed").fg(Color::Cyan),
        FileStatus::Unchanged => Cell::new("unchanged").add_attribute(Attribute::Dim),
        FileStatus::Failed(_) => Cell::new("failed").fg(Color::Red),
    }
}

/// Print the per-file summary table and totals.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_summary(writer: &mut impl Write, outcomes: &[FileOutcome]) -> std::io::Result<()> {
    if outcomes.is_empty() {
        return Ok(());
    }

    let mut table = create_table(vec!["File", "Inserted", "Skipped", "Status"]);
    for outcome in outcomes {
        let skipped = outcome.skipped.len();
        table.add_row(vec![
            Cell::new(normalize_display_path(&outcome.path)).add_attribute(Attribute::Bold),
            Cell::new(outcome.inserted),
            if skipped == 0 {
                Cell::new(skipped)
            } else {
                Cell::new(skipped).fg(Color::Yellow)
            },
            status_cell(&outcome.status),
        ]);
    }
    writeln!(writer, "\n{table}")?;

    let inserted: usize = outcomes.iter().map(|o| o.inserted).sum();
    let skipped: usize = outcomes.iter().map(|o| o.skipped.len()).sum();
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o.status, FileStatus::Failed(_)))
        .count();
    writeln!(
        writer,
        "{}",
        format!(
            "Documented {} definitions in {} files ({} skipped, {} failed)",
            inserted.to_string().bold(),
            outcomes.len().to_string().bold(),
            skipped,
            failed
        )
        .dimmed()
    )?;
    Ok(())
}
