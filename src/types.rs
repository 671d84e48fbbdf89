//! Public and internal types for the keysift API and pipeline.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::config::{BenchConsts, SearchConsts};

/// What a finished job yields to its caller.
///
/// `Found("")` is a real hit: the target accepted the empty credential (or needs none).
/// It is never conflated with [`SearchOutcome::NotFound`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum SearchOutcome {
    Found(String),
    NotFound,
    Cancelled,
}

impl SearchOutcome {
    /// The winning credential, if any.
    pub fn found(&self) -> Option<&str> {
        match self {
            SearchOutcome::Found(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SearchOutcome::Cancelled)
    }
}

/// Lifecycle of one job (trial or full run).
///
/// `Idle -> Running -> {Found | StoppedByOperator | TimedOut | Exhausted}`, or `Failed` when
/// the candidate list breaks mid-run (the coordinator then returns an error, not a report).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Found,
    StoppedByOperator,
    TimedOut,
    Exhausted,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Idle | JobState::Running)
    }

    /// Final status line emitted through the progress sink.
    pub fn status_label(&self) -> &'static str {
        match self {
            JobState::Idle => "Idle",
            JobState::Running => "Running",
            JobState::Found => "Found",
            JobState::StoppedByOperator => "Cancelled",
            JobState::TimedOut => "Timed out",
            JobState::Exhausted => "Exhausted",
            JobState::Failed => "Failed",
        }
    }
}

/// Summary of one coordinator run.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub outcome: SearchOutcome,
    pub state: JobState,
    pub workers: usize,
    /// Candidates actually handed to the verifier (errors included).
    pub tested: u64,
    pub elapsed_secs: f64,
    /// Attempts per second over the whole run (elapsed clamped to >= 1s).
    pub rate: f64,
}

impl RunReport {
    pub fn found(&self) -> Option<&str> {
        self.outcome.found()
    }
}

/// One benchmark trial measurement.
#[derive(Clone, Debug, Serialize)]
pub struct TrialSample {
    pub workers: usize,
    pub tested: u64,
    pub elapsed_secs: f64,
    pub rate: f64,
}

/// Outcome of auto-tuning: every trial plus the winner.
#[derive(Clone, Debug, Serialize)]
pub struct BenchmarkResult {
    pub samples: Vec<TrialSample>,
    pub best_workers: usize,
    pub best_rate: f64,
}

/// Result of [`search`](crate::search): optional tuning phase plus the real run.
#[derive(Clone, Debug, Serialize)]
pub struct SearchReport {
    pub benchmark: Option<BenchmarkResult>,
    pub run: RunReport,
}

impl SearchReport {
    pub fn outcome(&self) -> &SearchOutcome {
        &self.run.outcome
    }
}

/// Lib-only options for [`search`](crate::search).
#[derive(Clone, Debug)]
pub struct SearchOpts {
    /// Worker count for the real run. When None, derived from available threads (or tuning).
    pub workers: Option<usize>,
    /// Run the benchmarker first and use its best worker count.
    pub auto_tune: bool,
    /// Worker counts to try when tuning. When None, `1..=min(64, 2 * cores)`.
    pub bench_worker_counts: Option<Vec<usize>>,
    /// Time budget of each tuning trial.
    pub trial_duration: Duration,
    /// Pause between tuning trials.
    pub cooldown: Duration,
    /// Candidates per queued batch.
    pub batch_size: usize,
    /// Queue capacity, in batches.
    pub queue_capacity: usize,
    /// Optional wall-clock budget for the real run.
    pub time_budget: Option<Duration>,
    /// Progress sample cadence, in tested candidates.
    pub telemetry_every: u64,
}

impl Default for SearchOpts {
    fn default() -> Self {
        Self {
            workers: None,
            auto_tune: false,
            bench_worker_counts: None,
            trial_duration: BenchConsts::TRIAL_DURATION,
            cooldown: BenchConsts::COOLDOWN,
            batch_size: SearchConsts::BATCH_SIZE,
            queue_capacity: SearchConsts::QUEUE_CAPACITY,
            time_budget: None,
            telemetry_every: SearchConsts::TELEMETRY_EVERY,
        }
    }
}

impl From<&SearchOpts> for Opts {
    fn from(o: &SearchOpts) -> Self {
        Opts {
            workers: o.workers,
            auto_tune: o.auto_tune,
            bench_worker_counts: o.bench_worker_counts.clone(),
            trial_duration: o.trial_duration,
            cooldown: o.cooldown,
            batch_size: o.batch_size,
            queue_capacity: o.queue_capacity,
            time_budget: o.time_budget,
            telemetry_every: o.telemetry_every,
            ..Opts::default()
        }
    }
}

/// Full options (CLI). Use [`SearchOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    pub workers: Option<usize>,
    pub auto_tune: bool,
    pub bench_worker_counts: Option<Vec<usize>>,
    pub trial_duration: Duration,
    pub cooldown: Duration,
    pub batch_size: usize,
    pub queue_capacity: usize,
    pub time_budget: Option<Duration>,
    pub telemetry_every: u64,
    /// Candidate list file. When None, the built-in list of common passwords is used.
    pub wordlist: Option<PathBuf>,
    /// Where found credentials are appended. When None, `keysift.results` in the working dir.
    pub results_path: Option<PathBuf>,
    /// Append found credentials to the results file.
    pub save_results: bool,
    /// Debug logging and live progress bar.
    pub verbose: bool,
    /// Print the final report as JSON.
    pub json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        let lib = SearchOpts::default();
        Opts {
            workers: lib.workers,
            auto_tune: lib.auto_tune,
            bench_worker_counts: lib.bench_worker_counts,
            trial_duration: lib.trial_duration,
            cooldown: lib.cooldown,
            batch_size: lib.batch_size,
            queue_capacity: lib.queue_capacity,
            time_budget: lib.time_budget,
            telemetry_every: lib.telemetry_every,
            wordlist: None,
            results_path: None,
            save_results: true,
            verbose: false,
            json: false,
        }
    }
}
