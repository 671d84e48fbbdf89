//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived paths: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    results_filename: String,
    bench_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache paths from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                results_filename: format!("{pkg}.results"),
                bench_prefix: format!(".{pkg}_bench"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Optional config file looked up in the working directory (CLI only).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// File that found credentials are appended to (CLI only).
    pub fn results_filename(&self) -> &str {
        &self.results_filename
    }

    /// Prefix for private candidate-list copies made during tuning.
    pub fn bench_prefix(&self) -> &str {
        &self.bench_prefix
    }
}

// ---- Worker threads ----

/// Bounds on the worker count for a single job.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Available threads (from rayon); set by [`WorkerLimits::current()`].
    pub all_threads: usize,
    pub min: usize,
    pub max: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            min: Self::MIN_WORKERS,
            max: Self::MAX_WORKERS,
        }
    }
}

impl WorkerLimits {
    pub const MIN_WORKERS: usize = 1;
    pub const MAX_WORKERS: usize = 128;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    pub fn contains(&self, workers: usize) -> bool {
        (self.min..=self.max).contains(&workers)
    }
}

// ---- Search pipeline ----

/// Batching, queue, and telemetry defaults for a search job.
pub struct SearchConsts;

impl SearchConsts {
    /// Candidates per batch moved through the queue.
    pub const BATCH_SIZE: usize = 64;
    /// Bounded queue capacity, in batches.
    pub const QUEUE_CAPACITY: usize = 200;
    /// Emit a progress sample every N tested candidates.
    pub const TELEMETRY_EVERY: u64 = 1000;
    /// Coordinator wake-up interval when nothing signals it.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
    /// Minimum elapsed seconds used when deriving a live rate.
    pub const MIN_RATE_ELAPSED_SECS: f64 = 1.0;
}

// ---- Benchmark ----

/// Auto-tuning trial defaults.
pub struct BenchConsts;

impl BenchConsts {
    /// Hard time budget for one trial run.
    pub const TRIAL_DURATION: Duration = Duration::from_millis(1500);
    /// Pause between trials.
    pub const COOLDOWN: Duration = Duration::from_millis(250);
    /// Upper bound on any worker count tried during tuning.
    pub const MAX_CANDIDATE_WORKERS: usize = 64;
    /// Minimum elapsed seconds used when deriving a trial rate.
    pub const MIN_TRIAL_ELAPSED_SECS: f64 = 0.001;
}
