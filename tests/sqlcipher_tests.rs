//! SQLCipher target tests: encrypted and plain fixture databases built in the temp dir.

use keysift::{
    CancelToken, CandidateList, MemoryCandidates, NoopSink, SearchOpts, SearchOutcome,
    SqlCipherTarget, Target, Verdict, Verifier,
};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;

const KDF_ITER: u32 = 4000;

/// Removes the fixture file when the test ends.
struct Fixture(PathBuf);

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn fixture_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("keysift_test_{}_{}.db", std::process::id(), name))
}

fn encrypted_db(name: &str, key: &str) -> Fixture {
    let path = fixture_path(name);
    let _ = std::fs::remove_file(&path);
    let conn = Connection::open(&path).unwrap();
    conn.pragma_update(None, "key", key).unwrap();
    conn.pragma_update(None, "kdf_iter", KDF_ITER).unwrap();
    conn.execute_batch("CREATE TABLE notes (body TEXT); INSERT INTO notes VALUES ('hi');")
        .unwrap();
    drop(conn);
    Fixture(path)
}

fn plain_db(name: &str) -> Fixture {
    let path = fixture_path(name);
    let _ = std::fs::remove_file(&path);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE notes (body TEXT);").unwrap();
    drop(conn);
    Fixture(path)
}

#[test]
fn test_wrong_and_right_keys() {
    let db = encrypted_db("keys", "hunter2");
    let target = SqlCipherTarget::open(&db.0).unwrap().with_kdf_iter(KDF_ITER);
    assert!(target.is_encrypted());

    let mut verifier = target.prepare().unwrap();
    assert_eq!(verifier.try_candidate("letmein").unwrap(), Verdict::NoMatch);
    assert_eq!(
        verifier.try_candidate("hunter2").unwrap(),
        Verdict::Match("hunter2".to_string())
    );
    // Verifier stays usable after a hit.
    assert_eq!(verifier.try_candidate("nope").unwrap(), Verdict::NoMatch);
}

#[test]
fn test_plain_database_matches_empty_credential() {
    let db = plain_db("plain");
    let target = SqlCipherTarget::open(&db.0).unwrap();
    assert!(!target.is_encrypted());
    let mut verifier = target.prepare().unwrap();
    assert_eq!(
        verifier.try_candidate("anything").unwrap(),
        Verdict::Match(String::new())
    );
}

#[test]
fn test_empty_file_is_treated_as_plain() {
    let path = fixture_path("empty");
    std::fs::write(&path, b"").unwrap();
    let fixture = Fixture(path);
    let target = SqlCipherTarget::open(&fixture.0).unwrap();
    assert!(!target.is_encrypted());
}

#[test]
fn test_missing_file_is_an_error() {
    let path = fixture_path("does_not_exist");
    let _ = std::fs::remove_file(&path);
    assert!(SqlCipherTarget::open(&path).is_err());
}

#[test]
fn test_directory_is_an_error() {
    assert!(SqlCipherTarget::open(&std::env::temp_dir()).is_err());
}

#[test]
fn test_describe_uses_file_name() {
    let db = plain_db("describe");
    let target = SqlCipherTarget::open(&db.0).unwrap();
    let name = db.0.file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(target.describe(), name);
}

#[test]
fn test_search_unlocks_encrypted_db() {
    let db = encrypted_db("search", "dragon");
    let target = SqlCipherTarget::open(&db.0).unwrap().with_kdf_iter(KDF_ITER);
    let list = MemoryCandidates::new(["123456", "password", "qwerty", "dragon", "monkey"]);
    let opts = SearchOpts {
        workers: Some(2),
        ..SearchOpts::default()
    };
    let report = keysift::search(
        Arc::new(target),
        Arc::new(list),
        &opts,
        Arc::new(NoopSink),
        CancelToken::new(),
    )
    .unwrap();
    assert_eq!(report.outcome(), &SearchOutcome::Found("dragon".to_string()));
}

#[test]
fn test_search_builtin_list_misses_strong_key() {
    let db = encrypted_db("builtin", "correct horse battery staple");
    let target = SqlCipherTarget::open(&db.0).unwrap().with_kdf_iter(KDF_ITER);
    let report = keysift::search(
        Arc::new(target),
        Arc::new(MemoryCandidates::builtin()),
        &SearchOpts::default(),
        Arc::new(NoopSink),
        CancelToken::new(),
    )
    .unwrap();
    assert_eq!(report.outcome(), &SearchOutcome::NotFound);
    assert_eq!(report.run.tested, MemoryCandidates::builtin().total());
}
