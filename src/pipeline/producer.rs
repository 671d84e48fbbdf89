//! Producer loop: raw lines -> trimmed candidates -> batches on the bounded queue.

use anyhow::{Context, Result};
use crossbeam_channel::{SendTimeoutError, Sender};
use log::debug;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::engine::candidates::{CandidateLines, normalize_candidate};
use crate::engine::state::{SearchState, StopReason};
use crate::utils::config::SearchConsts;

use super::context::{CandidateBatch, PipelineEvent};

/// Send one batch, waking every poll interval to check for stop so a full queue with no
/// consumers never blocks the producer. Returns false if the batch was not delivered.
fn send_batch(batch_tx: &Sender<CandidateBatch>, batch: CandidateBatch, state: &SearchState) -> bool {
    let mut pending = batch;
    loop {
        match batch_tx.send_timeout(pending, SearchConsts::POLL_INTERVAL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => {
                if state.should_stop() {
                    return false;
                }
                pending = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

/// Stream `lines` into batches of `batch_size` until the list is exhausted or the job stops.
/// Drops `batch_tx` on return so workers see end-of-stream. Returns candidates queued.
///
/// A read error stops the whole job with [`StopReason::SourceError`] and is returned, so a
/// truncated list is never mistaken for an exhausted one.
pub fn run_producer_loop(
    lines: CandidateLines,
    batch_tx: Sender<CandidateBatch>,
    state: &SearchState,
    batch_size: usize,
) -> Result<u64> {
    let mut queued = 0_u64;
    let mut batch: Vec<String> = Vec::with_capacity(batch_size);
    let mut delivered = true;
    for line in lines {
        if state.should_stop() {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                state.termination.request_stop(StopReason::SourceError);
                debug!("producer: read failed after {} queued candidates", queued);
                return Err(e).context("read candidate list");
            }
        };
        let Some(candidate) = normalize_candidate(&line) else {
            continue;
        };
        batch.push(candidate.to_string());
        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            let n = full.len() as u64;
            if !send_batch(&batch_tx, full.into_boxed_slice(), state) {
                delivered = false;
                break;
            }
            queued += n;
        }
    }
    // Partial final batch (the only one left after an early stop).
    if delivered && !batch.is_empty() && !state.termination.is_found() {
        let n = batch.len() as u64;
        if send_batch(&batch_tx, batch.into_boxed_slice(), state) {
            queued += n;
        }
    }
    debug!("producer: queued {} candidates, closing queue", queued);
    drop(batch_tx);
    Ok(queued)
}

/// Spawn the producer thread. Its `event_tx` announces completion to the coordinator.
pub fn spawn_producer_thread(
    lines: CandidateLines,
    batch_tx: Sender<CandidateBatch>,
    event_tx: Sender<PipelineEvent>,
    state: Arc<SearchState>,
    batch_size: usize,
) -> JoinHandle<Result<u64>> {
    thread::spawn(move || {
        let queued = run_producer_loop(lines, batch_tx, &state, batch_size);
        let _ = event_tx.send(PipelineEvent::ProducerDone);
        queued
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::candidates::{CandidateList, MemoryCandidates};
    use crate::JobState;
    use crate::engine::state::CancelToken;
    use crossbeam_channel::bounded;
    use std::time::Duration;

    #[test]
    fn batches_are_trimmed_and_sized() {
        let list = MemoryCandidates::new(["a", " ", "b ", "c", "", "d", "e"]);
        let (tx, rx) = bounded(16);
        let state = SearchState::new(CancelToken::new(), None);
        let queued = run_producer_loop(list.open().unwrap(), tx, &state, 2).unwrap();
        assert_eq!(queued, 5);
        let batches: Vec<CandidateBatch> = rx.iter().collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(&*batches[0], &["a".to_string(), "b".to_string()]);
        assert_eq!(&*batches[2], &["e".to_string()]);
    }

    #[test]
    fn stop_before_start_queues_nothing() {
        let list = MemoryCandidates::new(["a", "b", "c"]);
        let (tx, rx) = bounded(16);
        let state = SearchState::new(CancelToken::new(), None);
        state.termination.request_stop(StopReason::Operator);
        assert_eq!(run_producer_loop(list.open().unwrap(), tx, &state, 2).unwrap(), 0);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn full_queue_without_consumers_does_not_hang() {
        let list = MemoryCandidates::new((0..100).map(|i| format!("pw{i}")));
        let (tx, rx) = bounded(1);
        let token = CancelToken::new();
        let state = Arc::new(SearchState::new(token.clone(), None));
        let handle = {
            let state = Arc::clone(&state);
            thread::spawn(move || run_producer_loop(list.open().unwrap(), tx, &state, 4))
        };
        thread::sleep(Duration::from_millis(50));
        token.cancel();
        let queued = handle.join().unwrap().unwrap();
        assert_eq!(queued, 4);
        drop(rx);
    }

    #[test]
    fn read_error_stops_job_and_is_returned() {
        let lines: CandidateLines = Box::new((0..10).map(|i| {
            if i == 3 {
                Err(std::io::Error::other("device gone"))
            } else {
                Ok(format!("pw{i}"))
            }
        }));
        let (tx, rx) = bounded(16);
        let state = SearchState::new(CancelToken::new(), None);
        let err = run_producer_loop(lines, tx, &state, 2).unwrap_err();
        assert!(format!("{:#}", err).contains("device gone"));
        assert_eq!(state.termination.stop_reason(), StopReason::SourceError);
        assert_eq!(state.terminal_state(), JobState::Failed);
        // The full first batch was delivered before the failure; nothing after it.
        let batches: Vec<CandidateBatch> = rx.iter().collect();
        assert_eq!(batches.len(), 1);
    }
}
