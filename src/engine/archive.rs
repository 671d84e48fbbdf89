//! Concrete target: a password-protected ZIP archive (ZipCrypto or AES).
//!
//! Each worker opens its own [`ZipArchive`] and decrypts one entry per attempt. A wrong
//! key either fails the password check in the entry header or the CRC/HMAC check at the end
//! of the stream, so that entry is read to the end.

use anyhow::{Context, Result};
use log::debug;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

use super::verifier::{Target, Verdict, Verifier};

/// Local file header, empty archive, and spanned archive signatures.
const ZIP_SIGNATURES: [&[u8; 4]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

/// True when `path` starts with a ZIP signature.
pub fn looks_like_zip(path: &Path) -> Result<bool> {
    let mut file = File::open(path).with_context(|| format!("open target {}", path.display()))?;
    let mut magic = [0_u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(ZIP_SIGNATURES.iter().any(|sig| **sig == magic)),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e).context("read target signature"),
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).with_context(|| format!("open target {}", path.display()))?;
    ZipArchive::new(file).with_context(|| format!("read zip archive {}", path.display()))
}

/// Smallest encrypted file entry, so every attempt decrypts as little as possible.
fn find_key_entry(archive: &mut ZipArchive<File>) -> Result<Option<usize>> {
    let mut best: Option<(usize, u64)> = None;
    for i in 0..archive.len() {
        let entry = archive
            .by_index_raw(i)
            .with_context(|| format!("read zip entry {}", i))?;
        if entry.is_dir() || !entry.encrypted() {
            continue;
        }
        let size = entry.compressed_size();
        if best.is_none_or(|(_, s)| size < s) {
            best = Some((i, size));
        }
    }
    Ok(best.map(|(i, _)| i))
}

/// A ZIP archive on disk.
#[derive(Clone, Debug)]
pub struct ZipTarget {
    path: PathBuf,
    /// Entry tried with each candidate; `None` when nothing in the archive is encrypted.
    key_entry: Option<usize>,
}

impl ZipTarget {
    /// Read the central directory and pick the entry each candidate is tried on.
    pub fn open(path: &Path) -> Result<Self> {
        let mut archive = open_archive(path)?;
        let key_entry = find_key_entry(&mut archive)?;
        debug!(
            "Target {} ({} entries, {})",
            path.display(),
            archive.len(),
            match key_entry {
                Some(i) => format!("key entry {}", i),
                None => "unencrypted".to_string(),
            }
        );
        Ok(Self {
            path: path.to_path_buf(),
            key_entry,
        })
    }

    pub fn is_encrypted(&self) -> bool {
        self.key_entry.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Target for ZipTarget {
    fn prepare(&self) -> Result<Box<dyn Verifier>> {
        let archive = match self.key_entry {
            Some(_) => Some(open_archive(&self.path)?),
            None => None,
        };
        Ok(Box::new(ZipVerifier {
            archive,
            key_entry: self.key_entry.unwrap_or_default(),
        }))
    }

    fn describe(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// One worker's verifier for a [`ZipTarget`]. Holds its own archive handle.
pub struct ZipVerifier {
    /// `None` for archives that need no password.
    archive: Option<ZipArchive<File>>,
    key_entry: usize,
}

impl Verifier for ZipVerifier {
    fn try_candidate(&mut self, candidate: &str) -> Result<Verdict> {
        let Some(archive) = self.archive.as_mut() else {
            return Ok(Verdict::Match(String::new()));
        };
        let mut entry = match archive.by_index_decrypt(self.key_entry, candidate.as_bytes()) {
            Ok(entry) => entry,
            Err(ZipError::InvalidPassword) => return Ok(Verdict::NoMatch),
            Err(e) => return Err(e).context("open encrypted entry"),
        };
        // Passing the header check alone is not proof: ZipCrypto lets 1 in 256 wrong keys through.
        match io::copy(&mut entry, &mut io::sink()) {
            Ok(_) => Ok(Verdict::Match(candidate.to_string())),
            Err(_) => Ok(Verdict::NoMatch),
        }
    }
}
