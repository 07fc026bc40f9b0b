use std::fs;
use std::path::PathBuf;

use tipfeed::record::{MarketPrediction, MatchRecord, MARKET_1X2};
use tipfeed::store::ResultStore;

fn temp_store(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("tipfeed_store_tests")
        .join(format!("{name}_{}", std::process::id()));
    fs::create_dir_all(&dir).expect("temp dir should be creatable");
    let path = dir.join("consensus.json");
    let _ = fs::remove_file(&path);
    path
}

fn sample_record(home: &str, away: &str, pred: &str) -> MatchRecord {
    let mut record = MatchRecord::new(home, away);
    record.date = "01.01".to_string();
    record.timestamp = "2026-01-01T00:00:00+00:00".to_string();
    record
        .markets
        .insert(MARKET_1X2.to_string(), MarketPrediction::new(pred));
    record
}

#[test]
fn missing_file_starts_empty() {
    let store = ResultStore::load(temp_store("missing"));
    assert_eq!(store.source_count(), 0);
}

#[test]
fn corrupt_file_starts_empty() {
    let path = temp_store("corrupt");
    fs::write(&path, "{ not json").unwrap();
    let store = ResultStore::load(path);
    assert_eq!(store.source_count(), 0);
}

#[test]
fn commit_replaces_source_wholesale() {
    let mut store = ResultStore::load(temp_store("replace"));
    store.commit(
        "forebet",
        vec![sample_record("A", "B", "1"), sample_record("C", "D", "2")],
    );
    store.commit("forebet", vec![sample_record("E", "F", "X")]);

    let records = store.records("forebet").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].home, "E");
}

#[test]
fn committing_twice_is_idempotent() {
    let mut store = ResultStore::load(temp_store("idempotent"));
    let run = vec![sample_record("A", "B", "1")];
    store.commit("predictz", run.clone());
    store.commit("predictz", run.clone());
    assert_eq!(store.records("predictz").unwrap(), run.as_slice());
}

#[test]
fn empty_commit_preserves_prior_data() {
    let path = temp_store("preserve");
    let mut store = ResultStore::load(path.clone());
    store.commit("zulubet", vec![sample_record("A", "B", "1")]);
    store.persist().unwrap();
    let before = fs::read(&path).unwrap();

    store.commit("zulubet", Vec::new());
    store.persist().unwrap();
    let after = fs::read(&path).unwrap();

    assert_eq!(before, after);
}

#[test]
fn one_source_never_touches_another() {
    let mut store = ResultStore::load(temp_store("isolation"));
    store.commit("forebet", vec![sample_record("A", "B", "1")]);
    store.commit("statarea", vec![sample_record("C", "D", "2")]);
    store.commit("forebet", vec![sample_record("E", "F", "X")]);

    assert_eq!(store.records("statarea").unwrap()[0].home, "C");
}

#[test]
fn commit_persist_reload_round_trips() {
    let path = temp_store("roundtrip");
    let mut store = ResultStore::load(path.clone());
    store.commit("forebet", vec![sample_record("A", "B", "1")]);
    store.persist().unwrap();

    let reloaded = ResultStore::load(path);
    assert_eq!(reloaded.source_count(), 1);
    let records = reloaded.records("forebet").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].home, "A");
    assert_eq!(records[0].away, "B");
    assert_eq!(records[0].date, "01.01");
    assert_eq!(records[0].markets.get(MARKET_1X2).unwrap().pred, "1");
}

#[test]
fn legacy_flat_records_migrate_on_load() {
    let path = temp_store("migration");
    fs::write(
        &path,
        r#"{"windrawwin":[
            {"home":"A","away":"B","prediction":"1","probability":"75",
             "timestamp":"2025-11-01T09:00:00"},
            {"home":"C","away":"D","prediction":"X"}
        ]}"#,
    )
    .unwrap();

    let store = ResultStore::load(path.clone());
    let records = store.records("windrawwin").unwrap();

    let first = records[0].markets.get(MARKET_1X2).unwrap();
    assert_eq!(first.pred, "1");
    assert_eq!(first.prob, "75");
    let second = records[1].markets.get(MARKET_1X2).unwrap();
    assert_eq!(second.pred, "X");
    assert_eq!(second.prob, "0");

    // Once rewritten, the retired flat fields are gone for good.
    store.persist().unwrap();
    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"markets\""));
    assert!(!raw.contains("\"prediction\""));
    assert!(!raw.contains("\"probability\""));
}
