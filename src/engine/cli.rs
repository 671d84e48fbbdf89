//! CLI command handler: build options (defaults, then `.keysift.toml`, then flags), run the
//! search, print the outcome, and record hits in the results file.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::archive::{ZipTarget, looks_like_zip};
use crate::engine::arg_parser::{Cli, TargetKind};
use crate::engine::candidates::{CandidateList, FileCandidates, MemoryCandidates};
use crate::engine::progress::{BarSink, LogSink, ProgressSink};
use crate::engine::sqlcipher::SqlCipherTarget;
use crate::engine::state::CancelToken;
use crate::engine::verifier::Target;
use crate::search::search_with_opts;
use crate::utils::keysift_toml::{apply_file_to_opts, load_keysift_toml};
use crate::utils::{Colors, EMPTY_MARKER, PackagePaths, save_found, setup_logging};
use crate::{Opts, SearchOutcome, SearchReport};

/// Apply command-line flags on top of `opts` (only flags actually given).
fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    if cli.wordlist.is_some() {
        opts.wordlist = cli.wordlist.clone();
    }
    if cli.threads.is_some() {
        opts.workers = cli.threads;
    }
    if let Some(v) = cli.auto_tune {
        opts.auto_tune = v;
    }
    if !cli.bench_workers.is_empty() {
        opts.bench_worker_counts = Some(cli.bench_workers.clone());
    }
    if let Some(ms) = cli.trial_ms {
        opts.trial_duration = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.cooldown_ms {
        opts.cooldown = Duration::from_millis(ms);
    }
    if let Some(n) = cli.batch_size {
        opts.batch_size = n;
    }
    if let Some(n) = cli.queue_cap {
        opts.queue_capacity = n;
    }
    if let Some(secs) = cli.timeout {
        opts.time_budget = Some(Duration::from_secs(secs));
    }
    if cli.results.is_some() {
        opts.results_path = cli.results.clone();
    }
    if cli.no_save {
        opts.save_results = false;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    opts.json = cli.json;
}

/// Defaults, then the config file, then flags. Logging starts once `verbose` is known, so a
/// config parse error is reported after that instead of being lost.
fn setup_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::default();
    let mut file_error = None;
    if let Ok(cwd) = std::env::current_dir() {
        match load_keysift_toml(&cwd) {
            Ok(Some(file)) => apply_file_to_opts(&file, &mut opts),
            Ok(None) => {}
            Err(e) => file_error = Some(e),
        }
    }
    apply_cli_to_opts(cli, &mut opts);
    setup_logging(opts.verbose);
    if let Some(e) = file_error {
        warn!("Ignoring config file: {:#}", e);
    }
    opts
}

/// `--kind auto` picks ZIP by file signature and SQLCipher otherwise.
fn resolve_kind(cli: &Cli) -> Result<TargetKind> {
    Ok(match cli.kind {
        TargetKind::Auto if looks_like_zip(&cli.target)? => TargetKind::Zip,
        TargetKind::Auto => TargetKind::Sqlcipher,
        kind => kind,
    })
}

/// Open the target; the flag says whether it needs a password at all.
fn open_target(cli: &Cli) -> Result<(Arc<dyn Target>, bool)> {
    match resolve_kind(cli)? {
        TargetKind::Zip => {
            if cli.kdf_iter.is_some() {
                warn!("--kdf-iter only applies to SQLCipher targets; ignoring it.");
            }
            let target = ZipTarget::open(&cli.target)?;
            let encrypted = target.is_encrypted();
            Ok((Arc::new(target), encrypted))
        }
        TargetKind::Sqlcipher | TargetKind::Auto => {
            let mut target = SqlCipherTarget::open(&cli.target)?;
            if let Some(iter) = cli.kdf_iter {
                target = target.with_kdf_iter(iter);
            }
            let encrypted = target.is_encrypted();
            Ok((Arc::new(target), encrypted))
        }
    }
}

fn open_candidates(opts: &Opts) -> Result<Arc<dyn CandidateList>> {
    match &opts.wordlist {
        Some(path) => Ok(Arc::new(FileCandidates::open(path)?)),
        None => {
            info!("No password list given; using the built-in list of common passwords.");
            Ok(Arc::new(MemoryCandidates::builtin()))
        }
    }
}

fn results_path(opts: &Opts) -> PathBuf {
    opts.results_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(PackagePaths::get().results_filename()))
}

fn print_summary(target: &Path, report: &SearchReport) {
    if let Some(bench) = &report.benchmark {
        println!(
            "{} {} workers (~{:.1} attempts/sec)",
            Colors::label("Tuned:"),
            bench.best_workers,
            bench.best_rate
        );
    }
    let run = &report.run;
    match report.outcome() {
        SearchOutcome::Found(value) => {
            let shown = if value.is_empty() { EMPTY_MARKER } else { value.as_str() };
            println!(
                "{} {} ({})",
                Colors::label("Password found:"),
                Colors::found(shown),
                target.display()
            );
        }
        SearchOutcome::NotFound => {
            println!(
                "{} {}",
                Colors::label("Result:"),
                Colors::miss(&format!("not found ({})", run.state.status_label()))
            );
        }
        SearchOutcome::Cancelled => {
            println!("{} {}", Colors::label("Result:"), Colors::miss("cancelled"));
        }
    }
    println!(
        "{} {} tested with {} workers in {:.2}s ({:.1} attempts/sec)",
        Colors::label("Stats:"),
        run.tested,
        run.workers,
        run.elapsed_secs,
        run.rate
    );
}

/// Run one search from the command line. Ctrl+C stops the job gracefully.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);

    let (target, encrypted) = open_target(cli)?;
    if !encrypted {
        warn!(
            "{} is not encrypted; it opens with an empty password.",
            cli.target.display()
        );
    }
    let target_name = target.describe();
    let candidates = open_candidates(&opts)?;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        handler_token.cancel();
    })
    .context("set Ctrl+C handler")?;

    let sink: Arc<dyn ProgressSink> = if opts.verbose && !opts.json {
        Arc::new(BarSink::new(candidates.total(), "Searching"))
    } else {
        Arc::new(LogSink)
    };
    debug!("{} CONFIG:{:#?}", PackagePaths::get().pkg_name().to_uppercase(), opts);

    let report = search_with_opts(target, candidates, &opts, sink, cancel)?;

    if opts.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        );
    } else {
        print_summary(&cli.target, &report);
    }

    if let Some(value) = report.outcome().found()
        && opts.save_results
    {
        let path = results_path(&opts);
        match save_found(&path, &target_name, value) {
            Ok(()) => info!("Saved result to {}", path.display()),
            Err(e) => warn!("Could not save result to {}: {:#}", path.display(), e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "keysift",
            "db.sqlite",
            "-w",
            "words.txt",
            "-t",
            "3",
            "-a",
            "--bench-workers",
            "1",
            "2",
            "--timeout",
            "9",
            "--no-save",
        ])
        .unwrap();
        let mut opts = Opts::default();
        apply_cli_to_opts(&cli, &mut opts);
        assert_eq!(opts.wordlist, Some(PathBuf::from("words.txt")));
        assert_eq!(opts.workers, Some(3));
        assert!(opts.auto_tune);
        assert_eq!(opts.bench_worker_counts, Some(vec![1, 2]));
        assert_eq!(opts.time_budget, Some(Duration::from_secs(9)));
        assert!(!opts.save_results);
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let cli = Cli::try_parse_from(["keysift", "db.sqlite"]).unwrap();
        let mut opts = Opts {
            workers: Some(5),
            auto_tune: true,
            ..Opts::default()
        };
        apply_cli_to_opts(&cli, &mut opts);
        assert_eq!(opts.workers, Some(5));
        assert!(opts.auto_tune);
        assert!(opts.save_results);
    }

    #[test]
    fn auto_kind_detects_zip_signature() {
        let dir = std::env::temp_dir();
        let zip_path = dir.join(format!("keysift_cli_{}_kind.zip", std::process::id()));
        let db_path = dir.join(format!("keysift_cli_{}_kind.db", std::process::id()));
        std::fs::write(&zip_path, b"PK\x05\x06rest-of-end-record").unwrap();
        std::fs::write(&db_path, b"not a zip at all, 16+ bytes").unwrap();

        let cli = Cli::try_parse_from(["keysift", zip_path.to_str().unwrap()]).unwrap();
        assert_eq!(resolve_kind(&cli).unwrap(), TargetKind::Zip);
        let cli = Cli::try_parse_from(["keysift", db_path.to_str().unwrap()]).unwrap();
        assert_eq!(resolve_kind(&cli).unwrap(), TargetKind::Sqlcipher);
        let cli =
            Cli::try_parse_from(["keysift", "--kind", "sqlcipher", zip_path.to_str().unwrap()])
                .unwrap();
        assert_eq!(resolve_kind(&cli).unwrap(), TargetKind::Sqlcipher);

        let _ = std::fs::remove_file(&zip_path);
        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn default_results_path_uses_package_name() {
        assert_eq!(
            results_path(&Opts::default()),
            PathBuf::from("keysift.results")
        );
    }
}
