//! Search pipeline: producer, workers, coordinator, and auto-tuning.
//!
//! ```text
//! CandidateList ─▶ producer ─▶ bounded batch queue ─▶ N workers ─▶ SearchState
//!                                                                    │
//!                          coordinator (event channel + poll) ◀──────┘
//! ```

pub mod benchmark;
pub mod context;
pub mod orchestrator;
pub mod producer;
pub mod workers;

pub use benchmark::{BenchmarkConfig, Benchmarker, select_best};
pub use context::{
    CandidateBatch, ExitNotice, PipelineChannels, PipelineEvent, PipelineHandles, SearchJob,
    create_pipeline_channels,
};
pub use orchestrator::{SearchCoordinator, shutdown_pipeline_handles};
pub use producer::{run_producer_loop, spawn_producer_thread};
pub use workers::{WorkerContext, search_worker_loop, spawn_search_workers};
