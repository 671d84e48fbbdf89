//! Worker-count and rate helpers

use std::time::Duration;

use crate::utils::config::{BenchConsts, WorkerLimits};
use crate::utils::fd_limit::cap_workers_by_fd_limit;

/// Default worker count when nothing is configured: every available thread, within limits.
pub fn default_workers(limits: &WorkerLimits) -> usize {
    limits.all_threads.clamp(limits.min, limits.max)
}

/// Requested (or default) worker count, capped by the FD limit. An explicit request is not
/// clamped: out-of-range values are rejected when the job is validated.
pub fn resolve_workers(requested: Option<usize>, limits: &WorkerLimits) -> usize {
    let n = requested.unwrap_or_else(|| default_workers(limits));
    if limits.contains(n) {
        cap_workers_by_fd_limit(n)
    } else {
        n
    }
}

/// `1..=min(64, 2 * cores)`.
pub fn default_bench_worker_counts(cores: usize) -> Vec<usize> {
    let top = (cores.max(1) * 2).min(BenchConsts::MAX_CANDIDATE_WORKERS);
    (1..=top).collect()
}

/// Ascending, deduplicated, within `1..=64`.
pub fn normalize_bench_worker_counts(counts: &[usize]) -> Vec<usize> {
    let mut out: Vec<usize> = counts
        .iter()
        .copied()
        .filter(|&n| (1..=BenchConsts::MAX_CANDIDATE_WORKERS).contains(&n))
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Trial throughput: elapsed clamped to at least 1 ms.
pub fn trial_rate(tested: u64, elapsed: Duration) -> f64 {
    tested as f64 / elapsed.as_secs_f64().max(BenchConsts::MIN_TRIAL_ELAPSED_SECS)
}
