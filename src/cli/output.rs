//! CLI output formatting

use crate::core::outcome::MatrixStatus;
use crate::execution::ExecutionEvent;
use crate::report::CombinationStatus;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over the matrix combinations
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format an overall matrix status for display
pub fn format_status(status: MatrixStatus) -> String {
    match status {
        MatrixStatus::Passed => style("PASSED").green().to_string(),
        MatrixStatus::Failed => style("FAILED").red().to_string(),
        MatrixStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

/// Format a per-combination status for display
pub fn format_combination_status(status: CombinationStatus) -> String {
    match status {
        CombinationStatus::Passed => style("passed").green().to_string(),
        CombinationStatus::Failed => style("failed").red().to_string(),
        CombinationStatus::Cancelled => style("cancelled").yellow().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::MatrixStarted {
            run_id,
            name,
            combinations,
        } => format!(
            "{} Starting matrix {} ({} combinations, run {})",
            ROCKET,
            style(name).bold(),
            style(combinations).cyan(),
            style(&run_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::CombinationStarted { label } => {
            format!("{} [{}]", SPINNER, style(label).cyan())
        }
        ExecutionEvent::CombinationFinished {
            label,
            passed,
            cancelled,
        } => {
            if *passed {
                format!("{} [{}]", CHECK, style(label).green())
            } else if *cancelled {
                format!("{} [{}] {}", WARN, style(label).yellow(), "cancelled")
            } else {
                format!("{} [{}]", CROSS, style(label).red())
            }
        }
        ExecutionEvent::MatrixFinished {
            run_id,
            passed,
            failed,
            cancelled,
        } => format!(
            "{} Matrix run ({}) finished: {} passed, {} failed, {} cancelled",
            INFO,
            style(&run_id.to_string()[..8]).dim(),
            style(passed).green(),
            style(failed).red(),
            style(cancelled).yellow()
        ),
    }
}
