//! Keysift: adaptive concurrent password-list search against encrypted containers

pub mod engine;
pub mod pipeline;
pub mod search;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use engine::{
    CancelToken, CandidateList, FileCandidates, LogSink, MemoryCandidates, NoopSink,
    ProgressSink, SqlCipherTarget, Target, Verdict, Verifier, ZipTarget,
};
pub use pipeline::{BenchmarkConfig, Benchmarker, SearchCoordinator, SearchJob};

use log::debug;
use std::sync::Arc;

/// Result alias used by public keysift API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: search `candidates` against `target` with `opts`.
///
/// - **`opts.auto_tune`** → trial runs at several worker counts on a private copy of the list
///   pick the worker count for the real run.
/// - **`cancel`** → call [`CancelToken::cancel`] from any thread to stop; the report then
///   carries [`SearchOutcome::Cancelled`].
///
/// ```ignore
/// let target = Arc::new(keysift::SqlCipherTarget::open(path)?);
/// let list = Arc::new(keysift::FileCandidates::open(words)?);
/// let opts = keysift::SearchOpts { auto_tune: true, ..Default::default() };
/// let report = keysift::search(target, list, &opts, Arc::new(keysift::NoopSink), keysift::CancelToken::new())?;
/// if let Some(pw) = report.outcome().found() { println!("{pw}"); }
/// ```
pub fn search(
    target: Arc<dyn Target>,
    candidates: Arc<dyn CandidateList>,
    opts: &SearchOpts,
    sink: Arc<dyn ProgressSink>,
    cancel: CancelToken,
) -> Result<SearchReport> {
    let opts = Opts::from(opts);
    let config_str = format!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    debug!("{}", config_str);
    search::search_with_opts(target, candidates, &opts, sink, cancel)
}
