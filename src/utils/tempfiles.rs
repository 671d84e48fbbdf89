use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::utils::config::PackagePaths;

static COPY_SEQ: AtomicUsize = AtomicUsize::new(0);

/// A private copy of a file in the temp dir. Removed when dropped.
#[derive(Debug)]
pub struct TempCopy {
    path: PathBuf,
}

impl TempCopy {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempCopy {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Unique temp path for a private copy of `src` (prefix, pid, sequence, original name).
pub fn private_copy_path_for(src: &Path) -> PathBuf {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "list".to_string());
    let seq = COPY_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "{}_{}_{}_{}",
        PackagePaths::get().bench_prefix(),
        std::process::id(),
        seq,
        name
    ))
}

/// Copy `src` to a fresh temp path; the copy lives as long as the returned guard.
pub fn copy_to_private(src: &Path) -> Result<TempCopy> {
    let path = private_copy_path_for(src);
    fs::copy(src, &path).with_context(|| {
        format!(
            "copy candidate list to private copy ({} -> {})",
            src.display(),
            path.display()
        )
    })?;
    Ok(TempCopy { path })
}
