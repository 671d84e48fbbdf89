//! Auto-tuning: short time-boxed trials at increasing worker counts, keep the fastest.

use anyhow::{Result, bail};
use log::{debug, info};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::tools::{normalize_bench_worker_counts, trial_rate};
use crate::pipeline::{SearchCoordinator, SearchJob};
use crate::utils::config::BenchConsts;
use crate::{BenchmarkResult, JobState, TrialSample};

/// Which worker counts to try and how long each trial runs.
#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub worker_counts: Vec<usize>,
    pub trial_duration: Duration,
    pub cooldown: Duration,
}

impl BenchmarkConfig {
    pub fn new(worker_counts: &[usize]) -> Self {
        Self {
            worker_counts: worker_counts.to_vec(),
            trial_duration: BenchConsts::TRIAL_DURATION,
            cooldown: BenchConsts::COOLDOWN,
        }
    }

    pub fn with_trial_duration(mut self, trial_duration: Duration) -> Self {
        self.trial_duration = trial_duration;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Picks the worker count with the highest measured throughput. Ties keep the smaller count.
pub struct Benchmarker<'a> {
    coordinator: &'a SearchCoordinator,
}

impl<'a> Benchmarker<'a> {
    pub fn new(coordinator: &'a SearchCoordinator) -> Self {
        Self { coordinator }
    }

    /// Run one trial per worker count against a private copy of `template`'s candidates.
    ///
    /// Each trial is a full coordinator run with its own fresh state and a hard time budget;
    /// `template` itself is never run or modified. Operator cancellation ends tuning early and
    /// returns the best count among completed trials; the interrupted trial is discarded.
    pub fn tune(&self, template: &SearchJob, config: &BenchmarkConfig) -> Result<BenchmarkResult> {
        let counts = normalize_bench_worker_counts(&config.worker_counts);
        let Some(&first) = counts.first() else {
            bail!(
                "no usable worker counts to benchmark (valid range 1..={})",
                BenchConsts::MAX_CANDIDATE_WORKERS
            );
        };
        let private = template.candidates.private_copy()?;
        let sink = self.coordinator.sink();
        let cancel = self.coordinator.cancel_token();

        sink.on_status("Benchmarking worker counts...");
        let mut samples = Vec::with_capacity(counts.len());

        for (i, &workers) in counts.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Benchmark cancelled after {} trials", samples.len());
                break;
            }
            if i > 0 && !config.cooldown.is_zero() {
                thread::sleep(config.cooldown);
            }
            sink.on_status(&format!("Testing {} workers...", workers));
            let job = template
                .clone()
                .with_candidates(Arc::clone(&private))
                .with_workers(workers)
                .with_time_budget(Some(config.trial_duration));

            let before = Instant::now();
            let report = self.coordinator.run(&job)?;
            let elapsed = before.elapsed();
            if report.state == JobState::StoppedByOperator {
                info!("Benchmark cancelled during the {}-worker trial", workers);
                break;
            }
            let rate = trial_rate(report.tested, elapsed);

            debug!(
                "trial: {} workers -> {} tested in {:.3}s ({:.1}/s, {:?})",
                workers,
                report.tested,
                elapsed.as_secs_f64(),
                rate,
                report.state
            );
            sink.on_status(&format!("Workers {}: {:.1} attempts/sec", workers, rate));
            samples.push(TrialSample {
                workers,
                tested: report.tested,
                elapsed_secs: elapsed.as_secs_f64(),
                rate,
            });
        }

        let (best_workers, best_rate) = select_best(&samples).unwrap_or((first, 0.0));
        sink.on_status(&format!(
            "Benchmark complete. Best: {} workers (~{:.1} attempts/sec)",
            best_workers, best_rate
        ));
        Ok(BenchmarkResult {
            samples,
            best_workers,
            best_rate,
        })
    }
}

/// Pick the best sample: highest rate, first (smallest) count on ties.
pub fn select_best(samples: &[TrialSample]) -> Option<(usize, f64)> {
    samples.iter().fold(None, |best, s| match best {
        Some((_, rate)) if s.rate <= rate => best,
        _ => Some((s.workers, s.rate)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(workers: usize, rate: f64) -> TrialSample {
        TrialSample {
            workers,
            tested: 0,
            elapsed_secs: 1.0,
            rate,
        }
    }

    #[test]
    fn select_best_prefers_highest_rate() {
        let s = [sample(1, 10.0), sample(2, 30.0), sample(4, 20.0)];
        assert_eq!(select_best(&s), Some((2, 30.0)));
    }

    #[test]
    fn select_best_ties_keep_smallest() {
        let s = [sample(1, 10.0), sample(2, 10.0), sample(4, 10.0)];
        assert_eq!(select_best(&s), Some((1, 10.0)));
        assert_eq!(select_best(&[]), None);
    }
}
