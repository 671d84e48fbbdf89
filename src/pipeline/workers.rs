//! Search workers: pull batches, try each candidate, publish the first hit.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::progress::ProgressSink;
use crate::engine::state::SearchState;
use crate::engine::verifier::{Verdict, Verifier};
use crate::utils::config::SearchConsts;

use super::context::{CandidateBatch, ExitNotice, PipelineEvent};

/// What every worker of one job shares.
#[derive(Clone)]
pub struct WorkerContext {
    pub state: Arc<SearchState>,
    pub sink: Arc<dyn ProgressSink>,
    /// Non-empty candidates in the list; used for progress totals.
    pub total: u64,
    pub telemetry_every: u64,
}

impl WorkerContext {
    /// Count one tested candidate and emit a sample on cadence, at the end of the list, or on a hit.
    fn record_tested(&self, hit: bool) {
        let count = self.state.counters.record_tested();
        if hit || count % self.telemetry_every == 0 || count == self.total {
            self.sink.on_progress(count, self.total);
            self.sink
                .on_attempts_per_second(self.state.counters.live_rate(count));
        }
    }
}

/// Next batch, or None once the queue is closed or the job is stopping.
fn next_batch(batch_rx: &Receiver<CandidateBatch>, state: &SearchState) -> Option<CandidateBatch> {
    loop {
        if state.should_stop() {
            return None;
        }
        match batch_rx.recv_timeout(SearchConsts::POLL_INTERVAL) {
            Ok(batch) => return Some(batch),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

/// Single search worker. Verifier errors count as tested and never stop the loop.
pub fn search_worker_loop(
    worker_id: usize,
    mut verifier: Box<dyn Verifier>,
    batch_rx: Receiver<CandidateBatch>,
    event_tx: Sender<PipelineEvent>,
    ctx: WorkerContext,
) {
    let _exit = ExitNotice(event_tx.clone());
    let state = &ctx.state;
    'batches: while let Some(batch) = next_batch(&batch_rx, state) {
        for candidate in batch.iter() {
            if state.should_stop() {
                break 'batches;
            }
            let hit = match verifier.try_candidate(candidate) {
                Ok(Verdict::Match(value)) => state.termination.try_set_found(value),
                Ok(Verdict::NoMatch) => false,
                Err(e) => {
                    trace!("worker-{}: candidate check failed: {:#}", worker_id, e);
                    false
                }
            };
            ctx.record_tested(hit);
            if hit {
                debug!("worker-{}: match found", worker_id);
                let _ = event_tx.send(PipelineEvent::Found);
                break 'batches;
            }
        }
    }
}

/// Spawn one worker per verifier. Each verifier moves into its own thread.
pub fn spawn_search_workers(
    verifiers: Vec<Box<dyn Verifier>>,
    batch_rx: &Receiver<CandidateBatch>,
    event_tx: &Sender<PipelineEvent>,
    ctx: &WorkerContext,
) -> Vec<JoinHandle<()>> {
    verifiers
        .into_iter()
        .enumerate()
        .map(|(worker_id, verifier)| {
            let batch_rx = batch_rx.clone();
            let event_tx = event_tx.clone();
            let ctx = ctx.clone();
            thread::spawn(move || search_worker_loop(worker_id, verifier, batch_rx, event_tx, ctx))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::NoopSink;
    use crate::engine::state::CancelToken;
    use crate::engine::verifier::FnVerifier;
    use crossbeam_channel::{bounded, unbounded};

    fn ctx(total: u64) -> WorkerContext {
        WorkerContext {
            state: Arc::new(SearchState::new(CancelToken::new(), None)),
            sink: Arc::new(NoopSink),
            total,
            telemetry_every: 1000,
        }
    }

    fn batch(items: &[&str]) -> CandidateBatch {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn worker_stops_at_first_match() {
        let (tx, rx) = bounded(4);
        let (ev_tx, ev_rx) = unbounded();
        tx.send(batch(&["a", "b", "hit", "c"])).unwrap();
        tx.send(batch(&["d"])).unwrap();
        drop(tx);
        let ctx = ctx(5);
        let verifier = Box::new(FnVerifier(|c: &str| -> anyhow::Result<Verdict> {
            Ok(if c == "hit" {
                Verdict::Match(c.to_string())
            } else {
                Verdict::NoMatch
            })
        }));
        search_worker_loop(0, verifier, rx, ev_tx, ctx.clone());
        assert_eq!(ctx.state.termination.result(), Some("hit"));
        assert_eq!(ctx.state.counters.tested(), 3);
        let events: Vec<PipelineEvent> = ev_rx.try_iter().collect();
        assert_eq!(events, vec![PipelineEvent::Found, PipelineEvent::WorkerExited]);
    }

    #[test]
    fn verifier_errors_count_as_tested() {
        let (tx, rx) = bounded(4);
        let (ev_tx, _ev_rx) = unbounded();
        tx.send(batch(&["x", "y", "z"])).unwrap();
        drop(tx);
        let ctx = ctx(3);
        let verifier = Box::new(FnVerifier(|c: &str| -> anyhow::Result<Verdict> {
            if c == "y" {
                anyhow::bail!("malformed")
            }
            Ok(Verdict::NoMatch)
        }));
        search_worker_loop(0, verifier, rx, ev_tx, ctx.clone());
        assert!(!ctx.state.termination.is_found());
        assert_eq!(ctx.state.counters.tested(), 3);
    }
}
