//! Concrete target: a SQLCipher-encrypted SQLite database.
//!
//! SQLCipher only accepts `PRAGMA key` before the first page is read, so every attempt opens
//! its own read-only connection. Each worker owns one [`SqlCipherVerifier`]; nothing is shared.

use anyhow::{Context, Result, bail};
use log::debug;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::verifier::{Target, Verdict, Verifier};

/// Magic bytes at the start of an unencrypted SQLite file.
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

const KEY_CHECK_SQL: &str = "SELECT count(*) FROM sqlite_master";

fn open_read_only(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

fn is_not_a_database(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::NotADatabase)
}

/// Read the first 16 bytes; `None` for files shorter than a header.
fn read_header(path: &Path) -> Result<Option<[u8; 16]>> {
    let mut file = File::open(path).with_context(|| format!("open target {}", path.display()))?;
    let mut buf = [0_u8; 16];
    match file.read_exact(&mut buf) {
        Ok(()) => Ok(Some(buf)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e).context("read target header"),
    }
}

/// A SQLCipher database on disk.
#[derive(Clone, Debug)]
pub struct SqlCipherTarget {
    path: PathBuf,
    /// Plain SQLite file: every candidate "unlocks" it with the empty credential.
    unencrypted: bool,
    /// Non-default PBKDF2 iteration count the database was created with.
    kdf_iter: Option<u32>,
}

impl SqlCipherTarget {
    /// Validate `path` and detect whether it is encrypted at all.
    pub fn open(path: &Path) -> Result<Self> {
        let meta =
            std::fs::metadata(path).with_context(|| format!("stat target {}", path.display()))?;
        if !meta.is_file() {
            bail!("target {} is not a regular file", path.display());
        }
        let unencrypted = match read_header(path)? {
            Some(header) if &header == SQLITE_HEADER => {
                open_read_only(path)
                    .and_then(|c| c.query_row(KEY_CHECK_SQL, [], |_| Ok(())))
                    .with_context(|| format!("read plain SQLite target {}", path.display()))?;
                true
            }
            Some(_) => false,
            None if meta.len() == 0 => true,
            None => bail!("target {} is too short to be a database", path.display()),
        };
        debug!(
            "Target {} ({})",
            path.display(),
            if unencrypted { "unencrypted" } else { "encrypted" }
        );
        Ok(Self {
            path: path.to_path_buf(),
            unencrypted,
            kdf_iter: None,
        })
    }

    /// Use a non-default `kdf_iter` (databases created with `PRAGMA kdf_iter = N`).
    pub fn with_kdf_iter(mut self, kdf_iter: u32) -> Self {
        self.kdf_iter = Some(kdf_iter);
        self
    }

    pub fn is_encrypted(&self) -> bool {
        !self.unencrypted
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Target for SqlCipherTarget {
    fn prepare(&self) -> Result<Box<dyn Verifier>> {
        if !self.unencrypted {
            // Fail at setup, not on every candidate, if the file vanished or is unreadable.
            File::open(&self.path)
                .with_context(|| format!("open target {}", self.path.display()))?;
        }
        Ok(Box::new(SqlCipherVerifier {
            path: self.path.clone(),
            unencrypted: self.unencrypted,
            kdf_iter: self.kdf_iter,
        }))
    }

    fn describe(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// One worker's verifier for a [`SqlCipherTarget`].
pub struct SqlCipherVerifier {
    path: PathBuf,
    unencrypted: bool,
    kdf_iter: Option<u32>,
}

impl Verifier for SqlCipherVerifier {
    fn try_candidate(&mut self, candidate: &str) -> Result<Verdict> {
        if self.unencrypted {
            return Ok(Verdict::Match(String::new()));
        }
        let conn = open_read_only(&self.path).context("open target")?;
        conn.pragma_update(None, "key", candidate)
            .context("set SQLCipher key")?;
        if let Some(iter) = self.kdf_iter {
            conn.pragma_update(None, "kdf_iter", iter)
                .context("set SQLCipher kdf_iter")?;
        }
        match conn.query_row(KEY_CHECK_SQL, [], |_| Ok(())) {
            Ok(()) => Ok(Verdict::Match(candidate.to_string())),
            Err(e) if is_not_a_database(&e) => Ok(Verdict::NoMatch),
            Err(e) => Err(e).context("read target with candidate key"),
        }
    }
}
