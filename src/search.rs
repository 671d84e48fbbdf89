//! Search driver: optional auto-tuning, then the real run.

use anyhow::Result;
use log::{debug, info};
use std::sync::Arc;

use crate::engine::candidates::CandidateList;
use crate::engine::progress::ProgressSink;
use crate::engine::state::CancelToken;
use crate::engine::tools::{default_bench_worker_counts, resolve_workers};
use crate::engine::verifier::Target;
use crate::pipeline::{BenchmarkConfig, Benchmarker, SearchCoordinator, SearchJob};
use crate::utils::config::WorkerLimits;
use crate::{Opts, SearchReport};

/// Job template (everything but worker count and budget) built from opts.
fn job_template(
    target: Arc<dyn Target>,
    candidates: Arc<dyn CandidateList>,
    opts: &Opts,
) -> SearchJob {
    SearchJob::new(target, candidates)
        .with_batching(opts.batch_size, opts.queue_capacity)
        .with_telemetry_every(opts.telemetry_every)
}

fn benchmark_config(opts: &Opts, limits: &WorkerLimits) -> BenchmarkConfig {
    let counts = opts
        .bench_worker_counts
        .clone()
        .unwrap_or_else(|| default_bench_worker_counts(limits.all_threads));
    BenchmarkConfig::new(&counts)
        .with_trial_duration(opts.trial_duration)
        .with_cooldown(opts.cooldown)
}

/// Search `candidates` against `target` with full options.
///
/// With `auto_tune`, the benchmarker runs first against a private copy of the list and its
/// best worker count replaces `opts.workers`. The real run always sees the complete list.
pub fn search_with_opts(
    target: Arc<dyn Target>,
    candidates: Arc<dyn CandidateList>,
    opts: &Opts,
    sink: Arc<dyn ProgressSink>,
    cancel: CancelToken,
) -> Result<SearchReport> {
    let limits = WorkerLimits::current();
    let template = job_template(target, candidates, opts);
    let coordinator = SearchCoordinator::new(sink, cancel);

    let (benchmark, workers) = if opts.auto_tune {
        let config = benchmark_config(opts, &limits);
        debug!("Auto-tune over worker counts {:?}", config.worker_counts);
        let result = Benchmarker::new(&coordinator).tune(&template, &config)?;
        let workers = resolve_workers(Some(result.best_workers), &limits);
        (Some(result), workers)
    } else {
        (None, resolve_workers(opts.workers, &limits))
    };

    let job = template
        .with_workers(workers)
        .with_time_budget(opts.time_budget);
    info!(
        "Starting real run with {} workers over {}",
        workers,
        job.candidates.describe()
    );
    coordinator
        .sink()
        .on_status(&format!("Starting real run with {} workers...", workers));
    let run = coordinator.run(&job)?;
    Ok(SearchReport { benchmark, run })
}
