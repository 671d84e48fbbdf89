use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Container format of the target file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TargetKind {
    /// ZIP when the file starts with a ZIP signature, SQLCipher otherwise.
    #[default]
    Auto,
    Sqlcipher,
    Zip,
}

/// Adaptive concurrent password-list search against encrypted containers.
#[derive(Clone, Parser)]
#[command(name = "keysift")]
#[command(about = "Search a password list against an encrypted SQLCipher database or ZIP archive.")]
pub struct Cli {
    /// Encrypted database or archive to unlock.
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Target format.
    #[arg(long, short = 'k', value_enum, default_value_t = TargetKind::Auto)]
    pub kind: TargetKind,

    /// Password list, one candidate per line. Default: built-in list of common passwords.
    #[arg(long, short = 'w')]
    pub wordlist: Option<PathBuf>,

    /// Worker threads (1-128). Default: available threads.
    #[arg(long, short = 't', value_parser = clap::value_parser!(usize))]
    pub threads: Option<usize>,

    /// Benchmark worker counts first and use the fastest.
    #[arg(long, short = 'a', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub auto_tune: Option<bool>,

    /// Worker counts to try when tuning. Default: 1 to min(64, 2 x cores).
    #[arg(long, num_args = 1..)]
    pub bench_workers: Vec<usize>,

    /// Duration of each tuning trial in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub trial_ms: Option<u64>,

    /// Pause between tuning trials in milliseconds.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub cooldown_ms: Option<u64>,

    /// Candidates per queued batch.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub batch_size: Option<usize>,

    /// Queue capacity in batches.
    #[arg(long, value_parser = clap::value_parser!(usize))]
    pub queue_cap: Option<usize>,

    /// Give up on the real run after this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub timeout: Option<u64>,

    /// SQLCipher kdf_iter the database was created with (if not the default). Ignored for ZIP.
    #[arg(long, value_parser = clap::value_parser!(u32))]
    pub kdf_iter: Option<u32>,

    /// File that found passwords are appended to. Default: keysift.results.
    #[arg(long, short = 'r')]
    pub results: Option<PathBuf>,

    /// Do not append found passwords to the results file.
    #[arg(long)]
    pub no_save: bool,

    /// Verbose output and live progress bar.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Print the final report as JSON.
    #[arg(long)]
    pub json: bool,
}
