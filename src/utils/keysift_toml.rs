//! Load `.keysift.toml` from a directory (CLI only). Lib does not use this; the consuming program injects config via SearchOpts.

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Deserialize)]
pub(crate) struct KeysiftToml {
    #[serde(default)]
    settings: SearchSection,
}

#[derive(Debug, Default, Deserialize)]
struct SearchSection {
    wordlist: Option<String>,
    workers: Option<usize>,
    auto_tune: Option<bool>,
    bench_workers: Option<Vec<usize>>,
    trial_ms: Option<u64>,
    cooldown_ms: Option<u64>,
    batch_size: Option<usize>,
    queue_capacity: Option<usize>,
    timeout_secs: Option<u64>,
    results_path: Option<String>,
    save_results: Option<bool>,
    verbose: Option<bool>,
}

/// Load `.keysift.toml` from `dir`. `Ok(None)` when the file is missing or unreadable; a file
/// that exists but does not parse is an error for the caller to report once logging is up.
pub(crate) fn load_keysift_toml(dir: &Path) -> anyhow::Result<Option<KeysiftToml>> {
    let path = dir.join(PackagePaths::get().config_filename());
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    parse_keysift_toml(&s)
        .map(Some)
        .with_context(|| format!("parse {}", path.display()))
}

pub(crate) fn parse_keysift_toml(s: &str) -> Result<KeysiftToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only set fields present in the file). Call before applying CLI.
pub(crate) fn apply_file_to_opts(file: &KeysiftToml, opts: &mut Opts) {
    let sec = &file.settings;
    if let Some(ref p) = sec.wordlist {
        opts.wordlist = Some(PathBuf::from(p));
    }
    if sec.workers.is_some() {
        opts.workers = sec.workers;
    }
    apply_file_opt!(sec, opts, auto_tune => auto_tune);
    if let Some(ref v) = sec.bench_workers {
        opts.bench_worker_counts = Some(v.clone());
    }
    if let Some(ms) = sec.trial_ms {
        opts.trial_duration = Duration::from_millis(ms);
    }
    if let Some(ms) = sec.cooldown_ms {
        opts.cooldown = Duration::from_millis(ms);
    }
    apply_file_opt!(sec, opts, batch_size => batch_size);
    apply_file_opt!(sec, opts, queue_capacity => queue_capacity);
    if let Some(secs) = sec.timeout_secs {
        opts.time_budget = Some(Duration::from_secs(secs));
    }
    if let Some(ref p) = sec.results_path {
        opts.results_path = Some(PathBuf::from(p));
    }
    apply_file_opt!(sec, opts, save_results => save_results);
    apply_file_opt!(sec, opts, verbose => verbose);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overrides_only_present_fields() {
        let file = parse_keysift_toml(
            r#"
            [settings]
            workers = 6
            trial_ms = 400
            save_results = false
            "#,
        )
        .unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.workers, Some(6));
        assert_eq!(opts.trial_duration, Duration::from_millis(400));
        assert!(!opts.save_results);
        assert_eq!(opts.batch_size, Opts::default().batch_size);
        assert!(opts.wordlist.is_none());
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("keysift_toml_{}_{}", std::process::id(), name));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_is_none() {
        let dir = scratch_dir("missing");
        assert!(load_keysift_toml(&dir).unwrap().is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn malformed_file_is_returned_as_error() {
        let dir = scratch_dir("malformed");
        std::fs::write(dir.join(".keysift.toml"), "[settings]\nworkers = \"many\"\n").unwrap();
        let err = load_keysift_toml(&dir).unwrap_err();
        assert!(format!("{:#}", err).contains(".keysift.toml"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_file_is_a_no_op() {
        let file = parse_keysift_toml("").unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts);
        assert_eq!(opts.workers, None);
        assert!(!opts.auto_tune);
    }
}
