//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements
//! [`ProgressCallback`] to display a scan progress bar in the terminal.
//!
//! The total number of directories in a scan is not known up front: every
//! finished directory may submit more. The bar length therefore tracks the
//! number of submitted tasks and grows as the scan discovers work.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::scanner::ScanSnapshot;

/// Progress callback for directory scans.
///
/// Implementations are called from worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called once before the first task runs.
    ///
    /// # Arguments
    ///
    /// * `root` - Relative path the scan starts from
    fn on_scan_start(&self, root: &str);

    /// Called after every finished directory.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - Counters after this task
    /// * `path` - Relative path of the directory
    fn on_task_finished(&self, snapshot: &ScanSnapshot, path: &str);

    /// Called when a directory fails.
    fn on_task_failed(&self, _path: &str, _message: &str) {}

    /// Called once after every task has finished.
    fn on_scan_end(&self, snapshot: &ScanSnapshot);
}

/// Progress reporter using indicatif.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bar will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use nascatalog::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} dirs {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(pb) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            f(pb);
        }
    }
}

impl ProgressCallback for Progress {
    fn on_scan_start(&self, root: &str) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new(1);
        pb.set_style(Self::style());
        pb.set_message(format!("Scanning {}", if root.is_empty() { "library" } else { root }));
        pb.enable_steady_tick(Duration::from_millis(100));
        *self.bar.lock().unwrap_or_else(|e| e.into_inner()) = Some(pb);
    }

    fn on_task_finished(&self, snapshot: &ScanSnapshot, path: &str) {
        self.with_bar(|pb| {
            pb.set_length(snapshot.submitted as u64);
            pb.set_position(snapshot.processed as u64);
            pb.set_message(truncate_path(path, 40));
        });
    }

    fn on_task_failed(&self, path: &str, message: &str) {
        self.with_bar(|pb| pb.println(format!("Failed: {} ({})", path, message)));
    }

    fn on_scan_end(&self, snapshot: &ScanSnapshot) {
        if let Some(pb) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            pb.finish_with_message(format!(
                "Scan complete: {} ok, {} failed",
                snapshot.succeeded, snapshot.failed
            ));
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let last = path.rsplit('/').next().unwrap_or(path);
    let chars: Vec<char> = last.chars().collect();
    if chars.len() + 4 > max_len {
        let tail: String = chars[chars.len().saturating_sub(max_len.saturating_sub(3))..]
            .iter()
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", last)
}
