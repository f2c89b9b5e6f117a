//! Terminal helpers for heic-convert
//!
//! Provides shared CLI functionality:
//! - Status lines and coded error reports
//! - File progress bars
//! - Duration, size and count formatting

#![warn(missing_docs)]

pub mod output;
pub mod progress;

pub use output::{format_count, format_duration, format_size, report_error, Status};
