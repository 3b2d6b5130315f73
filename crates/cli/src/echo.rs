use std::time::Duration;

use declutter_core::PipelineReport;
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Declutter".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Strip boilerplate and keep the readable content\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a labelled value under the current step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{label}:").dimmed(), value.bright_white());
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print timing information with color coding
fn print_timing(label: &str, duration: Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let label = format!("{}:", label);
    if ms < 50.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "fast".dimmed());
    } else if ms < 100.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
    } else {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "slow".bright_red());
    }
}

/// Print what each pipeline stage did
pub fn print_extraction_details(report: &PipelineReport) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Details".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    print_detail("Mode", &report.mode.to_string());
    if report.structured_fallback {
        print_warning("Structured extraction failed; heuristic pipeline used");
    }
    if let Some(selection) = &report.selection {
        let score = selection.score.map_or_else(|| "-".to_string(), |s| s.to_string());
        print_detail("Selected by", &selection.source.to_string());
        print_detail("Score", &score);
        print_detail("Candidates", &selection.candidates_considered.to_string());
        print_detail(
            "Removed",
            &format!(
                "{} structural, {} lexical, {} demoted",
                report.filter.removed_structural, report.filter.removed_lexical, report.filter.demoted
            ),
        );
    }
    print_detail("Images", &report.normalize.images.to_string());
    if report.restored_images > 0 {
        print_detail("Restored", &report.restored_images.to_string());
    }
    for reference in &report.normalize.unresolved {
        print_warning(&format!("Unresolved image reference: {reference}"));
    }
    eprintln!();
}

/// Print timing summary
pub fn print_timing_summary(total: Duration, timings: &[(&str, Duration)]) {
    eprintln!("{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Timing Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    for (label, duration) in timings {
        print_timing(label, *duration);
    }

    eprintln!("  {} {:>8.2}ms\n", "Total:".bold().dimmed(), total.as_secs_f64() * 1000.0);
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
