//! Append found credentials to the results file (CLI only).

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Shown in place of an empty credential.
pub const EMPTY_MARKER: &str = "(empty)";

/// One results line: `<unix-seconds> | <target> | <value>`.
pub fn format_result_line(at_secs: u64, target_name: &str, value: &str) -> String {
    let value = if value.is_empty() { EMPTY_MARKER } else { value };
    format!("{at_secs} | {target_name} | {value}\n")
}

/// Append a found credential for `target_name` to `results_path`.
pub fn save_found(results_path: &Path, target_name: &str, value: &str) -> Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(results_path)
        .with_context(|| format!("open results file {}", results_path.display()))?;
    file.write_all(format_result_line(now, target_name, value).as_bytes())
        .context("append result line")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_value_is_marked() {
        assert_eq!(
            format_result_line(7, "vault.db", ""),
            "7 | vault.db | (empty)\n"
        );
        assert_eq!(
            format_result_line(7, "vault.db", "hunter2"),
            "7 | vault.db | hunter2\n"
        );
    }

    #[test]
    fn save_found_appends() {
        let path =
            std::env::temp_dir().join(format!("keysift_results_{}.txt", std::process::id()));
        let _ = std::fs::remove_file(&path);
        save_found(&path, "a.db", "one").unwrap();
        save_found(&path, "b.db", "").unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("| a.db | one"));
        assert!(lines[1].ends_with("| b.db | (empty)"));
        std::fs::remove_file(&path).unwrap();
    }
}
