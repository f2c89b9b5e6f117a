//! Progress indicators

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Progress bar for file conversion, drawn on stderr.
///
/// Hidden when `visible` is false or there is only one file.
pub fn file_progress(total: u64, visible: bool) -> ProgressBar {
    if !visible || total <= 1 {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a progress bar with a success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with an error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✗ {}", message));
}
