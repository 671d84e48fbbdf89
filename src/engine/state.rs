//! Shared per-job state: termination flags, tested counter, clock.
//!
//! One [`SearchState`] is allocated per job (trial or full run) and dropped with it, so a
//! trial's stop flag can never reach a later run. The only thing shared across jobs is the
//! operator's [`CancelToken`], which is read but never written by the pipeline.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::JobState;
use crate::utils::config::SearchConsts;

/// Operator stop signal. Cheap to clone; all clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Why `stop_requested` was set. First reason wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StopReason {
    None = 0,
    Operator = 1,
    Timeout = 2,
    /// Coordinator shutting down after found/exhaustion; never reported as a terminal state.
    Shutdown = 3,
    /// The candidate list could not be read to the end.
    SourceError = 4,
}

impl StopReason {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => StopReason::Operator,
            2 => StopReason::Timeout,
            3 => StopReason::Shutdown,
            4 => StopReason::SourceError,
            _ => StopReason::None,
        }
    }
}

/// Found/stop flags plus the winning value.
#[derive(Debug, Default)]
pub struct TerminationState {
    stop_requested: AtomicBool,
    stop_reason: AtomicU8,
    found: AtomicBool,
    result: OnceLock<String>,
}

impl TerminationState {
    /// Idempotent. Records `reason` only if no reason was recorded before.
    pub fn request_stop(&self, reason: StopReason) {
        let _ = self.stop_reason.compare_exchange(
            StopReason::None as u8,
            reason as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    pub fn stop_reason(&self) -> StopReason {
        StopReason::from_u8(self.stop_reason.load(Ordering::Acquire))
    }

    pub fn is_found(&self) -> bool {
        self.found.load(Ordering::Acquire)
    }

    /// Write-once: returns true only for the single caller that flipped `found`.
    pub fn try_set_found(&self, value: String) -> bool {
        if self
            .found
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = self.result.set(value);
            true
        } else {
            false
        }
    }

    /// Winning value; only `Some` once a winner has finished its write.
    pub fn result(&self) -> Option<&str> {
        self.result.get().map(String::as_str)
    }
}

/// Tested counter and job clock.
#[derive(Debug)]
pub struct ProgressCounters {
    tested: AtomicU64,
    started: Instant,
}

impl ProgressCounters {
    pub fn start_now() -> Self {
        Self {
            tested: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Increment and return the new count.
    pub fn record_tested(&self) -> u64 {
        self.tested.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn tested(&self) -> u64 {
        self.tested.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Rate for live telemetry: elapsed clamped to at least one second.
    pub fn live_rate(&self, tested: u64) -> f64 {
        let secs = self
            .elapsed()
            .as_secs_f64()
            .max(SearchConsts::MIN_RATE_ELAPSED_SECS);
        tested as f64 / secs
    }
}

/// Everything the producer, workers, and coordinator of one job share.
#[derive(Debug)]
pub struct SearchState {
    pub termination: TerminationState,
    pub counters: ProgressCounters,
    operator: CancelToken,
    time_budget: Option<Duration>,
}

impl SearchState {
    pub fn new(operator: CancelToken, time_budget: Option<Duration>) -> Self {
        Self {
            termination: TerminationState::default(),
            counters: ProgressCounters::start_now(),
            operator,
            time_budget,
        }
    }

    pub fn budget_elapsed(&self) -> bool {
        self.time_budget
            .is_some_and(|budget| self.counters.elapsed() >= budget)
    }

    /// Check found, stop, operator cancel, and time budget. Promotes operator cancel and
    /// budget expiry into `stop_requested` so every other party sees them on its next check.
    pub fn should_stop(&self) -> bool {
        if self.termination.is_found() || self.termination.stop_requested() {
            return true;
        }
        if self.operator.is_cancelled() {
            self.termination.request_stop(StopReason::Operator);
            return true;
        }
        if self.budget_elapsed() {
            self.termination.request_stop(StopReason::Timeout);
            return true;
        }
        false
    }

    /// Terminal state once every producer/worker has exited.
    pub fn terminal_state(&self) -> JobState {
        if self.termination.is_found() {
            return JobState::Found;
        }
        match self.termination.stop_reason() {
            StopReason::Operator => JobState::StoppedByOperator,
            StopReason::Timeout => JobState::TimedOut,
            StopReason::SourceError => JobState::Failed,
            StopReason::None | StopReason::Shutdown => JobState::Exhausted,
        }
    }
}
