//! Engine module: shared job state, verifiers, candidate lists, telemetry, CLI plumbing

pub mod archive;
pub mod arg_parser;
pub mod candidates;
pub mod cli;
pub mod progress;
pub mod sqlcipher;
pub mod state;
pub mod tools;
pub mod verifier;

// Re-export commonly used items
pub use archive::{ZipTarget, ZipVerifier, looks_like_zip};
pub use arg_parser::{Cli, TargetKind};
pub use candidates::{CandidateLines, CandidateList, FileCandidates, MemoryCandidates};
pub use cli::handle_run;
pub use progress::{BarSink, LogSink, NoopSink, ProgressSink, TeeSink};
pub use sqlcipher::{SqlCipherTarget, SqlCipherVerifier};
pub use state::{CancelToken, ProgressCounters, SearchState, StopReason, TerminationState};
pub use tools::{default_bench_worker_counts, normalize_bench_worker_counts, trial_rate};
pub use verifier::{FnTarget, FnVerifier, Target, Verdict, Verifier};
