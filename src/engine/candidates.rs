//! Candidate lists: finite, restartable sequences of raw lines.
//!
//! Every [`CandidateList::open`] returns a fresh cursor, so the benchmark trials and the
//! real run never advance each other. Lines are trimmed and blank lines are dropped by
//! the producer ([`normalize_candidate`]); `total()` counts only what survives that.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::utils::tempfiles::{TempCopy, copy_to_private};

/// Raw line iterator handed to the producer.
pub type CandidateLines = Box<dyn Iterator<Item = std::io::Result<String>> + Send>;

pub trait CandidateList: Send + Sync {
    /// Fresh, independent cursor over the raw lines.
    fn open(&self) -> Result<CandidateLines>;

    /// Number of non-empty candidates after trimming.
    fn total(&self) -> u64;

    /// Independent copy for benchmarking; consuming it never touches `self`.
    fn private_copy(&self) -> Result<Arc<dyn CandidateList>>;

    fn describe(&self) -> String;
}

/// Trim a raw line; `None` for lines that are blank after trimming.
pub fn normalize_candidate(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Split on `\n` and decode lossily: real wordlists are not always valid UTF-8.
fn read_raw_lines(path: &Path) -> Result<CandidateLines> {
    let file =
        File::open(path).with_context(|| format!("open candidate list {}", path.display()))?;
    let lines = BufReader::new(file)
        .split(b'\n')
        .map(|r| r.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()));
    Ok(Box::new(lines))
}

fn count_candidates(lines: CandidateLines) -> Result<u64> {
    let mut count = 0_u64;
    for line in lines {
        let line = line.context("read candidate list")?;
        if normalize_candidate(&line).is_some() {
            count += 1;
        }
    }
    Ok(count)
}

/// Candidate list backed by a text file, one candidate per line.
#[derive(Debug)]
pub struct FileCandidates {
    path: PathBuf,
    total: u64,
    // Keeps a private copy alive (and on disk) for as long as this list exists.
    _copy: Option<TempCopy>,
}

impl FileCandidates {
    /// Open `path` and count its candidates. An unreadable file is a setup failure.
    pub fn open(path: &Path) -> Result<Self> {
        let total = count_candidates(read_raw_lines(path)?)
            .with_context(|| format!("count candidates in {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            total,
            _copy: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CandidateList for FileCandidates {
    fn open(&self) -> Result<CandidateLines> {
        read_raw_lines(&self.path)
    }

    fn total(&self) -> u64 {
        self.total
    }

    fn private_copy(&self) -> Result<Arc<dyn CandidateList>> {
        let copy = copy_to_private(&self.path)?;
        Ok(Arc::new(FileCandidates {
            path: copy.path().to_path_buf(),
            total: self.total,
            _copy: Some(copy),
        }))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Common passwords used when no list is supplied.
const BUILTIN_PASSWORDS: &[&str] = &[
    "123456", "password", "12345678", "qwerty", "abc123", "monkey", "1234567", "letmein",
    "trustno1", "dragon", "baseball", "iloveyou", "master", "sunshine", "ashley", "bailey",
    "shadow", "123123", "654321", "superman", "qazwsx", "michael", "football",
];

/// In-memory candidate list.
#[derive(Clone, Debug)]
pub struct MemoryCandidates {
    lines: Arc<[String]>,
    total: u64,
}

impl MemoryCandidates {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Arc<[String]> = lines.into_iter().map(Into::into).collect();
        let total = lines
            .iter()
            .filter(|l| normalize_candidate(l).is_some())
            .count() as u64;
        Self { lines, total }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_PASSWORDS.iter().copied())
    }
}

impl CandidateList for MemoryCandidates {
    fn open(&self) -> Result<CandidateLines> {
        let lines = Arc::clone(&self.lines);
        Ok(Box::new(
            (0..lines.len()).map(move |i| Ok(lines[i].clone())),
        ))
    }

    fn total(&self) -> u64 {
        self.total
    }

    fn private_copy(&self) -> Result<Arc<dyn CandidateList>> {
        Ok(Arc::new(MemoryCandidates::new(self.lines.iter().cloned())))
    }

    fn describe(&self) -> String {
        format!("<memory: {} lines>", self.lines.len())
    }
}
