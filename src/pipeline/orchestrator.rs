use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, warn};
use std::sync::Arc;

use crate::engine::candidates::CandidateLines;
use crate::engine::progress::ProgressSink;
use crate::engine::state::{CancelToken, SearchState, StopReason};
use crate::engine::verifier::Verifier;
use crate::pipeline::{self, PipelineEvent, SearchJob, WorkerContext};
use crate::utils::config::SearchConsts;
use crate::{JobState, RunReport, SearchOutcome};

/// Runs one job (trial or full) end to end. Trial and full runs share this single path;
/// they differ only in `SearchJob::time_budget`.
pub struct SearchCoordinator {
    sink: Arc<dyn ProgressSink>,
    cancel: CancelToken,
}

impl SearchCoordinator {
    pub fn new(sink: Arc<dyn ProgressSink>, cancel: CancelToken) -> Self {
        Self { sink, cancel }
    }

    pub fn sink(&self) -> &Arc<dyn ProgressSink> {
        &self.sink
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run `job` to a terminal state.
    ///
    /// Setup (validation, opening the candidate list, preparing one verifier per worker) happens
    /// before any thread starts; a failure there is returned as `Err` and the job never runs.
    /// Operator cancellation, timeout, and exhaustion are normal outcomes, not errors.
    pub fn run(&self, job: &SearchJob) -> Result<RunReport> {
        job.validate()?;
        let lines = job
            .candidates
            .open()
            .with_context(|| format!("open candidate list {}", job.candidates.describe()))?;
        let verifiers = (0..job.workers)
            .map(|_| job.target.prepare())
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("prepare target {}", job.target.describe()))?;

        let total = job.candidates.total();
        let state = Arc::new(SearchState::new(self.cancel.clone(), job.time_budget));
        let handles = self.start_pipeline(job, lines, verifiers, &state, total);
        debug!(
            "coordinator: running {} workers over {} candidates (budget {:?})",
            job.workers, total, job.time_budget
        );

        self.wait_for_terminal(&state, &handles.event_rx, job.workers);
        state.termination.request_stop(StopReason::Shutdown);
        let queued = match shutdown_pipeline_handles(handles) {
            Ok(queued) => queued,
            // A verified hit stands even if the list broke right after it.
            Err(e) if state.termination.is_found() => {
                warn!("{:#}", e);
                0
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "candidate list {} failed after {} tested",
                        job.candidates.describe(),
                        state.counters.tested()
                    )
                });
            }
        };

        let report = self.finish(job, &state, total);
        debug!(
            "coordinator: {:?} after {} tested ({} queued) in {:.2}s",
            report.state, report.tested, queued, report.elapsed_secs
        );
        Ok(report)
    }

    /// Spawn producer + workers and drop the coordinator's own senders so the event channel
    /// disconnects once every thread has exited.
    fn start_pipeline(
        &self,
        job: &SearchJob,
        lines: CandidateLines,
        verifiers: Vec<Box<dyn Verifier>>,
        state: &Arc<SearchState>,
        total: u64,
    ) -> pipeline::PipelineHandles {
        self.sink.on_job_start(total);
        let channels = pipeline::create_pipeline_channels(job.queue_capacity);
        let producer_handle = pipeline::spawn_producer_thread(
            lines,
            channels.batch_tx,
            channels.event_tx.clone(),
            Arc::clone(state),
            job.batch_size,
        );
        let ctx = WorkerContext {
            state: Arc::clone(state),
            sink: Arc::clone(&self.sink),
            total,
            telemetry_every: job.telemetry_every,
        };
        let worker_handles =
            pipeline::spawn_search_workers(verifiers, &channels.batch_rx, &channels.event_tx, &ctx);

        // Dropping the last sender/receiver held here lets channel state reflect the threads only.
        drop(channels.event_tx);
        drop(channels.batch_rx);

        self.sink.on_status(&format!(
            "Testing {} candidates with {} workers...",
            total, job.workers
        ));
        pipeline::PipelineHandles {
            producer_handle,
            worker_handles,
            event_rx: channels.event_rx,
        }
    }

    /// Block until found, stop, timeout, or every worker has exited. Events wake the loop
    /// immediately; otherwise it re-checks every poll interval.
    fn wait_for_terminal(
        &self,
        state: &SearchState,
        event_rx: &Receiver<PipelineEvent>,
        workers: usize,
    ) {
        let mut workers_left = workers;
        loop {
            if state.should_stop() {
                return;
            }
            match event_rx.recv_timeout(SearchConsts::POLL_INTERVAL) {
                Ok(PipelineEvent::WorkerExited) => {
                    workers_left = workers_left.saturating_sub(1);
                    if workers_left == 0 {
                        return;
                    }
                }
                Ok(PipelineEvent::Found) | Ok(PipelineEvent::ProducerDone) => {}
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    /// Final telemetry sample and status, then the report.
    fn finish(&self, job: &SearchJob, state: &SearchState, total: u64) -> RunReport {
        let tested = state.counters.tested();
        let elapsed = state.counters.elapsed();
        let rate = state.counters.live_rate(tested);
        let terminal = state.terminal_state();
        let outcome = match terminal {
            JobState::Found => {
                SearchOutcome::Found(state.termination.result().unwrap_or_default().to_string())
            }
            JobState::StoppedByOperator => SearchOutcome::Cancelled,
            _ => SearchOutcome::NotFound,
        };

        self.sink.on_progress(tested, total);
        self.sink.on_attempts_per_second(rate);
        self.sink.on_status(&format!(
            "{}: tested {} / {} ({:.1} attempts/sec)",
            terminal.status_label(),
            tested,
            total,
            rate
        ));

        RunReport {
            outcome,
            state: terminal,
            workers: job.workers,
            tested,
            elapsed_secs: elapsed.as_secs_f64(),
            rate,
        }
    }
}

/// Join workers, then the producer. Returns candidates queued by the producer, or the
/// producer's read error. Worker panics are logged; a producer panic is an error.
pub fn shutdown_pipeline_handles(handles: pipeline::PipelineHandles) -> Result<u64> {
    let pipeline::PipelineHandles {
        producer_handle,
        worker_handles,
        event_rx,
    } = handles;
    for (i, h) in worker_handles.into_iter().enumerate() {
        if h.join().is_err() {
            warn!("worker-{} panicked; its remaining candidates were skipped", i);
        }
    }
    drop(event_rx);
    producer_handle
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn workers_are_joined_when_producer_panics() {
        let worker_done = Arc::new(AtomicBool::new(false));
        let done = Arc::clone(&worker_done);
        let (_tx, event_rx) = unbounded();
        let handles = pipeline::PipelineHandles {
            producer_handle: thread::spawn(|| -> Result<u64> { panic!("producer blew up") }),
            worker_handles: vec![thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                done.store(true, Ordering::SeqCst);
            })],
            event_rx,
        };
        let err = shutdown_pipeline_handles(handles).unwrap_err();
        assert!(err.to_string().contains("producer thread panicked"));
        assert!(worker_done.load(Ordering::SeqCst));
    }

    #[test]
    fn producer_read_error_is_returned() {
        let (_tx, event_rx) = unbounded();
        let handles = pipeline::PipelineHandles {
            producer_handle: thread::spawn(|| -> Result<u64> { anyhow::bail!("list truncated") }),
            worker_handles: Vec::new(),
            event_rx,
        };
        let err = shutdown_pipeline_handles(handles).unwrap_err();
        assert!(err.to_string().contains("list truncated"));
    }
}
