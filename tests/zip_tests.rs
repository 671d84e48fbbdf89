//! ZIP target tests: ZipCrypto, AES, plain, and empty archives built in the temp dir.

use keysift::{
    CancelToken, MemoryCandidates, NoopSink, SearchOpts, SearchOutcome, Target, Verdict, Verifier,
    ZipTarget,
};
use std::fs::File;
use zip::unstable::write::FileOptionsExt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use zip::AesMode;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const BODY: &[u8] = b"the quick brown fox jumps over the lazy dog\n";

/// Removes the fixture file when the test ends.
struct Fixture(PathBuf);

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn fixture_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("keysift_test_{}_{}.zip", std::process::id(), name))
}

fn write_zip(name: &str, entries: &[(&str, SimpleFileOptions)]) -> Fixture {
    let path = fixture_path(name);
    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    for (entry, options) in entries {
        writer.start_file(*entry, options.clone()).unwrap();
        writer.write_all(BODY).unwrap();
    }
    writer.finish().unwrap();
    Fixture(path)
}

fn zipcrypto(password: &'static str) -> SimpleFileOptions {
    SimpleFileOptions::default().with_deprecated_encryption(password.as_bytes())
}

fn aes(password: &'static str) -> SimpleFileOptions {
    SimpleFileOptions::default().with_aes_encryption(AesMode::Aes256, password)
}

#[test]
fn test_zipcrypto_wrong_and_right_keys() {
    let zip = write_zip("zipcrypto", &[("notes.txt", zipcrypto("hunter2"))]);
    let target = ZipTarget::open(&zip.0).unwrap();
    assert!(target.is_encrypted());

    let mut verifier = target.prepare().unwrap();
    for wrong in ["letmein", "Hunter2", "hunter", ""] {
        assert_eq!(verifier.try_candidate(wrong).unwrap(), Verdict::NoMatch, "{wrong}");
    }
    assert_eq!(
        verifier.try_candidate("hunter2").unwrap(),
        Verdict::Match("hunter2".to_string())
    );
}

#[test]
fn test_aes_wrong_and_right_keys() {
    let zip = write_zip("aes", &[("notes.txt", aes("dragon"))]);
    let target = ZipTarget::open(&zip.0).unwrap();
    assert!(target.is_encrypted());

    let mut verifier = target.prepare().unwrap();
    assert_eq!(verifier.try_candidate("monkey").unwrap(), Verdict::NoMatch);
    assert_eq!(
        verifier.try_candidate("dragon").unwrap(),
        Verdict::Match("dragon".to_string())
    );
}

#[test]
fn test_plain_archive_matches_empty_credential() {
    let zip = write_zip("plain", &[("notes.txt", SimpleFileOptions::default())]);
    let target = ZipTarget::open(&zip.0).unwrap();
    assert!(!target.is_encrypted());
    let mut verifier = target.prepare().unwrap();
    assert_eq!(
        verifier.try_candidate("anything").unwrap(),
        Verdict::Match(String::new())
    );
}

#[test]
fn test_empty_archive_matches_empty_credential() {
    let zip = write_zip("empty", &[]);
    let target = ZipTarget::open(&zip.0).unwrap();
    assert!(!target.is_encrypted());
    let report = keysift::search(
        Arc::new(target),
        Arc::new(MemoryCandidates::new(["a", "b"])),
        &SearchOpts {
            workers: Some(1),
            ..SearchOpts::default()
        },
        Arc::new(NoopSink),
        CancelToken::new(),
    )
    .unwrap();
    assert_eq!(report.outcome(), &SearchOutcome::Found(String::new()));
}

#[test]
fn test_mixed_archive_checks_encrypted_entry() {
    let zip = write_zip(
        "mixed",
        &[
            ("readme.txt", SimpleFileOptions::default()),
            ("secret.txt", zipcrypto("sunshine")),
        ],
    );
    let target = ZipTarget::open(&zip.0).unwrap();
    assert!(target.is_encrypted());
    let mut verifier = target.prepare().unwrap();
    assert_eq!(verifier.try_candidate("shadow").unwrap(), Verdict::NoMatch);
    assert_eq!(
        verifier.try_candidate("sunshine").unwrap(),
        Verdict::Match("sunshine".to_string())
    );
}

#[test]
fn test_not_a_zip_is_an_error() {
    let path = fixture_path("garbage");
    std::fs::write(&path, b"definitely not an archive").unwrap();
    let fixture = Fixture(path);
    assert!(ZipTarget::open(&fixture.0).is_err());
    assert!(!keysift::engine::looks_like_zip(&fixture.0).unwrap());
}

#[test]
fn test_missing_file_is_an_error() {
    let path = fixture_path("does_not_exist");
    let _ = std::fs::remove_file(&path);
    assert!(ZipTarget::open(&path).is_err());
}

#[test]
fn test_search_unlocks_archive_with_builtin_list() {
    let zip = write_zip("builtin", &[("notes.txt", zipcrypto("superman"))]);
    assert!(keysift::engine::looks_like_zip(&zip.0).unwrap());
    let report = keysift::search(
        Arc::new(ZipTarget::open(&zip.0).unwrap()),
        Arc::new(MemoryCandidates::builtin()),
        &SearchOpts {
            workers: Some(4),
            ..SearchOpts::default()
        },
        Arc::new(NoopSink),
        CancelToken::new(),
    )
    .unwrap();
    assert_eq!(report.outcome(), &SearchOutcome::Found("superman".to_string()));
}
