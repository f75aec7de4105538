// file: src/pipeline/progress.rs
// description: progress tracking and statistics reporting for sync runs
// reference: uses indicatif for progress bars and tracks processing metrics

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub records_applied: usize,
    pub records_skipped: usize,
    pub duration_ms: u128,
}

impl SyncStats {
    pub fn success_rate(&self) -> f64 {
        let total = self.records_applied + self.records_skipped;
        if total == 0 {
            return 100.0;
        }
        (self.records_applied as f64 / total as f64) * 100.0
    }
}

pub struct SyncProgress {
    main_bar: ProgressBar,
    detail_bar: ProgressBar,
    applied: Arc<AtomicUsize>,
    skipped: Arc<AtomicUsize>,
    start_time: Instant,
}

impl SyncProgress {
    /// Bars are only drawn when `visible` is set; counters work either way.
    pub fn new(total: usize, visible: bool, colored: bool) -> Self {
        let multi_progress = MultiProgress::with_draw_target(if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        });

        let main_bar = create_progress_bar(&multi_progress, total as u64, colored);
        let detail_bar = create_detail_bar(&multi_progress);

        Self {
            main_bar,
            detail_bar,
            applied: Arc::new(AtomicUsize::new(0)),
            skipped: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_applied(&self) {
        self.applied.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.main_bar.inc(1);
        self.update_detail_bar();
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.main_bar.set_message(message.into());
    }

    pub fn finish(&self) {
        self.main_bar.finish_with_message("Synchronization complete");
        self.detail_bar.finish_and_clear();
    }

    pub fn get_stats(&self) -> SyncStats {
        SyncStats {
            records_applied: self.applied.load(Ordering::SeqCst),
            records_skipped: self.skipped.load(Ordering::SeqCst),
            duration_ms: self.start_time.elapsed().as_millis(),
        }
    }

    fn update_detail_bar(&self) {
        let applied = self.applied.load(Ordering::SeqCst);
        let skipped = self.skipped.load(Ordering::SeqCst);
        self.detail_bar
            .set_message(format!("Applied: {} | Skipped: {}", applied, skipped));
    }
}

impl Drop for SyncProgress {
    fn drop(&mut self) {
        if !self.main_bar.is_finished() {
            self.finish();
        }
    }
}

fn create_progress_bar(multi_progress: &MultiProgress, total: u64, colored: bool) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(total));
    let (template, chars) = if colored {
        (
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            "█▓▒░",
        )
    } else {
        ("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}", "=>-")
    };

    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        bar.set_style(style.progress_chars(chars));
    }
    bar
}

fn create_detail_bar(multi_progress: &MultiProgress) -> ProgressBar {
    let bar = multi_progress.add(ProgressBar::new(0));
    if let Ok(style) = ProgressStyle::default_bar().template("{msg}") {
        bar.set_style(style);
    }
    bar
}
