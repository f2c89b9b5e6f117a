//! Terminal output utilities
//!
//! Status lines respect `NO_COLOR`, non-terminal streams and
//! `owo_colors::set_override`.

use heic_core::Error;
use owo_colors::{OwoColorize, Stream};

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!(
            "{} {}",
            "✓".if_supports_color(Stream::Stdout, |s| s.green()),
            message
        );
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!(
            "{} {}",
            "✗".if_supports_color(Stream::Stderr, |s| s.red()),
            message
        );
    }

    /// Print a negative result on stdout, next to the other results
    pub fn flagged(message: &str) {
        println!(
            "{} {}",
            "✗".if_supports_color(Stream::Stdout, |s| s.red()),
            message
        );
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!(
            "{} {}",
            "⚠".if_supports_color(Stream::Stderr, |s| s.yellow()),
            message
        );
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!(
            "{} {}",
            "ℹ".if_supports_color(Stream::Stdout, |s| s.blue()),
            message
        );
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.if_supports_color(Stream::Stdout, |s| s.bold()));
        println!("{}", "─".repeat(message.chars().count()));
    }

    /// Print an indented detail line under a status message
    pub fn detail(message: &str) {
        println!(
            "  {}",
            message.if_supports_color(Stream::Stdout, |s| s.dimmed())
        );
    }
}

/// Print a coded error with its context and suggestion
pub fn report_error(err: &Error) {
    Status::error(&format!("[{}] {}", err.code, err.message));
    if let Some(context) = &err.context {
        eprintln!("  {}", context);
    }
    if let Some(suggestion) = &err.suggestion {
        eprintln!(
            "  {} {}",
            "→".if_supports_color(Stream::Stderr, |s| s.cyan()),
            suggestion
        );
    }
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining_secs)
    }
}

/// Format a file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
