//! Pipeline context: per-run job configuration, channels, and thread handles.

use anyhow::{Result, bail};
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::engine::candidates::CandidateList;
use crate::engine::tools::default_workers;
use crate::engine::verifier::Target;
use crate::utils::config::{SearchConsts, WorkerLimits};

/// Ordered group of candidates moved through the queue together. Never mutated once queued.
pub type CandidateBatch = Box<[String]>;

/// Immutable configuration of one run (trial or full). Cheap to clone: the target and the
/// candidate list are shared handles.
#[derive(Clone)]
pub struct SearchJob {
    pub target: Arc<dyn Target>,
    pub candidates: Arc<dyn CandidateList>,
    pub workers: usize,
    /// Wall-clock budget; `Some` for benchmark trials.
    pub time_budget: Option<Duration>,
    pub batch_size: usize,
    pub queue_capacity: usize,
    pub telemetry_every: u64,
}

impl SearchJob {
    /// Job with default batching and one worker per available thread.
    pub fn new(target: Arc<dyn Target>, candidates: Arc<dyn CandidateList>) -> Self {
        Self {
            target,
            candidates,
            workers: default_workers(&WorkerLimits::current()),
            time_budget: None,
            batch_size: SearchConsts::BATCH_SIZE,
            queue_capacity: SearchConsts::QUEUE_CAPACITY,
            telemetry_every: SearchConsts::TELEMETRY_EVERY,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn with_candidates(mut self, candidates: Arc<dyn CandidateList>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_batching(mut self, batch_size: usize, queue_capacity: usize) -> Self {
        self.batch_size = batch_size;
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_telemetry_every(mut self, every: u64) -> Self {
        self.telemetry_every = every;
        self
    }

    /// Reject configurations the pipeline cannot run.
    pub fn validate(&self) -> Result<()> {
        let limits = WorkerLimits::default();
        if !limits.contains(self.workers) {
            bail!(
                "worker count must be between {} and {} (got {})",
                limits.min,
                limits.max,
                self.workers
            );
        }
        if self.batch_size == 0 {
            bail!("batch size must be greater than 0");
        }
        if self.queue_capacity == 0 {
            bail!("queue capacity must be greater than 0");
        }
        if self.telemetry_every == 0 {
            bail!("telemetry cadence must be greater than 0");
        }
        Ok(())
    }
}

/// Wake-ups for the coordinator so it does not have to wait out a full poll interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    Found,
    ProducerDone,
    WorkerExited,
}

/// Sends [`PipelineEvent::WorkerExited`] when dropped, including on unwind.
pub struct ExitNotice(pub Sender<PipelineEvent>);

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.0.send(PipelineEvent::WorkerExited);
    }
}

/// Channels for one run. Producer gets batch_tx; workers get batch_rx; everyone gets event_tx.
pub struct PipelineChannels {
    pub batch_tx: Sender<CandidateBatch>,
    pub batch_rx: Receiver<CandidateBatch>,
    pub event_tx: Sender<PipelineEvent>,
    pub event_rx: Receiver<PipelineEvent>,
}

pub fn create_pipeline_channels(queue_capacity: usize) -> PipelineChannels {
    let (batch_tx, batch_rx) = bounded::<CandidateBatch>(queue_capacity);
    let (event_tx, event_rx) = unbounded::<PipelineEvent>();
    PipelineChannels {
        batch_tx,
        batch_rx,
        event_tx,
        event_rx,
    }
}

/// Threads of a running job. The coordinator joins all of them before returning.
pub struct PipelineHandles {
    pub producer_handle: JoinHandle<anyhow::Result<u64>>,
    pub worker_handles: Vec<JoinHandle<()>>,
    pub event_rx: Receiver<PipelineEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::candidates::MemoryCandidates;
    use crate::engine::verifier::{FnTarget, Verdict};

    fn job() -> SearchJob {
        SearchJob::new(
            Arc::new(FnTarget::new("t", |_: &str| Ok(Verdict::NoMatch))),
            Arc::new(MemoryCandidates::new(["a"])),
        )
    }

    #[test]
    fn worker_bounds_are_enforced() {
        assert!(job().with_workers(0).validate().is_err());
        assert!(job().with_workers(129).validate().is_err());
        assert!(job().with_workers(1).validate().is_ok());
        assert!(job().with_workers(128).validate().is_ok());
    }

    #[test]
    fn batching_must_be_positive() {
        assert!(job().with_workers(1).with_batching(0, 10).validate().is_err());
        assert!(job().with_workers(1).with_batching(10, 0).validate().is_err());
        assert!(job().with_workers(1).with_telemetry_every(0).validate().is_err());
    }

    #[test]
    fn exit_notice_fires_on_drop() {
        let (tx, rx) = unbounded();
        drop(ExitNotice(tx));
        assert_eq!(rx.recv().unwrap(), PipelineEvent::WorkerExited);
    }
}
