//! Progress sinks: how a running job reports status, progress, and throughput.

use kdam::{Animation, Bar, BarExt};
use log::{debug, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Receives telemetry from worker and coordinator threads. Implementations handle their own
/// synchronization; calls may arrive concurrently from several workers.
pub trait ProgressSink: Send + Sync {
    /// A new job (trial or full run) is about to start over `total` candidates.
    fn on_job_start(&self, _total: u64) {}
    fn on_status(&self, _message: &str) {}
    fn on_progress(&self, _tested: u64, _total: u64) {}
    fn on_attempts_per_second(&self, _rate: f64) {}
}

/// Discards everything.
pub struct NoopSink;

impl ProgressSink for NoopSink {}

/// Reports through the `log` facade.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_status(&self, message: &str) {
        info!("{}", message);
    }

    fn on_progress(&self, tested: u64, total: u64) {
        debug!("Tested {} / {}", tested, total);
    }

    fn on_attempts_per_second(&self, rate: f64) {
        debug!("{:.1} attempts/sec", rate);
    }
}

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " pw"
    )))
}

/// Update progress bar if available
/// Uses try_lock to avoid blocking if mutex is contended (non-blocking)
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    // If lock is contended, skip update (progress bar will catch up on next update)
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Force a refresh of the bar.
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Progress-bar sink for the CLI. Status lines go to the log; counts drive the bar.
pub struct BarSink {
    bar: ProgressBar,
    shown: AtomicU64,
}

impl BarSink {
    pub fn new(total: u64, desc: &'static str) -> Self {
        let bar = create_progress_bar(ProgressBarConfig::new(
            total as usize,
            desc,
            Animation::Classic,
        ));
        refresh_bar(&bar);
        Self {
            bar,
            shown: AtomicU64::new(0),
        }
    }
}

impl ProgressSink for BarSink {
    fn on_job_start(&self, total: u64) {
        // Each trial restarts its count from zero.
        self.shown.store(0, Ordering::Relaxed);
        if let Ok(mut bar) = self.bar.lock() {
            let _ = bar.reset(Some(total as usize));
        }
    }

    fn on_status(&self, message: &str) {
        debug!("{}", message);
    }

    fn on_progress(&self, tested: u64, _total: u64) {
        // Samples can arrive out of order from different workers; only move forward.
        let prev = self.shown.fetch_max(tested, Ordering::Relaxed);
        if tested > prev {
            update_progress_bar(&self.bar, (tested - prev) as usize);
        }
    }

    fn on_attempts_per_second(&self, rate: f64) {
        debug!("{:.1} attempts/sec", rate);
    }
}

/// Fans telemetry out to several sinks.
pub struct TeeSink(pub Vec<Arc<dyn ProgressSink>>);

impl ProgressSink for TeeSink {
    fn on_job_start(&self, total: u64) {
        self.0.iter().for_each(|s| s.on_job_start(total));
    }

    fn on_status(&self, message: &str) {
        self.0.iter().for_each(|s| s.on_status(message));
    }

    fn on_progress(&self, tested: u64, total: u64) {
        self.0.iter().for_each(|s| s.on_progress(tested, total));
    }

    fn on_attempts_per_second(&self, rate: f64) {
        self.0.iter().for_each(|s| s.on_attempts_per_second(rate));
    }
}
