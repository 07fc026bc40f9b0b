mod common;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use common::FakeBrowser;
use tipfeed::capture::{consume_request_queue, process_events, trigger_live_refresh};
use tipfeed::config::Config;

fn test_config(name: &str) -> Config {
    let data_dir = std::env::temp_dir()
        .join("tipfeed_capture_tests")
        .join(format!("{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&data_dir);
    fs::create_dir_all(&data_dir).expect("temp dir should be creatable");
    Config {
        store_file: data_dir.join("consensus.json"),
        live_file: data_dir.join("live.json"),
        stats_dir: data_dir.join("stats"),
        request_file: data_dir.join("stats_request.json"),
        data_dir,
        webdriver_url: "http://localhost:9515".to_string(),
        api_base: "https://api.example/api/v1".to_string(),
        live_site_url: "https://live.example/".to_string(),
        poll_interval: Duration::from_millis(1),
        live_refresh: Duration::from_secs(60),
        fetch_gap: Duration::from_millis(1),
        source_cooldown: Duration::from_millis(1),
    }
}

fn read(path: &PathBuf) -> String {
    fs::read_to_string(path).expect("capture file should exist")
}

#[test]
fn classified_events_land_in_their_destinations() {
    let cfg = test_config("destinations");
    let mut browser = FakeBrowser::default();
    browser.push_event(
        "r1",
        "https://api.example/api/v1/sport/football/events/live",
        Some(r#"{"events":[{"id":9}]}"#),
    );
    browser.push_event(
        "r2",
        "https://api.example/api/v1/event/123",
        Some(r#"{"event":{"id":123}}"#),
    );
    browser.push_event(
        "r3",
        "https://api.example/api/v1/event/123/statistics",
        Some(r#"{"statistics":[]}"#),
    );

    let captured = process_events(&mut browser, &cfg).unwrap();
    assert_eq!(captured, 3);
    assert_eq!(read(&cfg.live_file), r#"{"events":[{"id":9}]}"#);
    assert_eq!(
        read(&cfg.stats_dir.join("123_detail.json")),
        r#"{"event":{"id":123}}"#
    );
    assert_eq!(
        read(&cfg.stats_dir.join("123_stats.json")),
        r#"{"statistics":[]}"#
    );
}

#[test]
fn recapture_overwrites_without_history() {
    let cfg = test_config("overwrite");
    let mut browser = FakeBrowser::default();
    browser.push_event(
        "r1",
        "https://api.example/api/v1/event/55",
        Some(r#"{"event":{"minute":10}}"#),
    );
    process_events(&mut browser, &cfg).unwrap();

    browser.push_event(
        "r2",
        "https://api.example/api/v1/event/55",
        Some(r#"{"event":{"minute":20}}"#),
    );
    process_events(&mut browser, &cfg).unwrap();

    assert_eq!(
        read(&cfg.stats_dir.join("55_detail.json")),
        r#"{"event":{"minute":20}}"#
    );
}

#[test]
fn api_error_payload_overwrites_as_marker() {
    let cfg = test_config("error_marker");
    let mut browser = FakeBrowser::default();
    browser.push_event(
        "r1",
        "https://api.example/api/v1/event/77/statistics",
        Some(r#"{"statistics":[{"period":"ALL"}]}"#),
    );
    process_events(&mut browser, &cfg).unwrap();

    // The API now reports an error for that entity; the marker must replace
    // the stale payload rather than being dropped.
    browser.push_event(
        "r2",
        "https://api.example/api/v1/event/77/statistics",
        Some(r#"{"error":{"code":404,"message":"Not Found"}}"#),
    );
    let captured = process_events(&mut browser, &cfg).unwrap();
    assert_eq!(captured, 1);

    let raw = read(&cfg.stats_dir.join("77_stats.json"));
    assert!(raw.contains("\"error\""));
    assert!(!raw.contains("period"));
}

#[test]
fn undecodable_and_unclassified_events_are_dropped() {
    let cfg = test_config("dropped");
    let mut browser = FakeBrowser::default();
    // Not an API URL.
    browser.push_event("r1", "https://cdn.example/app.js", Some("var x = 1;"));
    // Non-numeric entity id.
    browser.push_event(
        "r2",
        "https://api.example/api/v1/event/abc",
        Some(r#"{"event":{}}"#),
    );
    // Body never became available.
    browser.push_event("r3", "https://api.example/api/v1/event/5", None);
    // Body is not structured json.
    browser.push_event("r4", "https://api.example/api/v1/event/6", Some("<html>"));
    // Body is empty.
    browser.push_event("r5", "https://api.example/api/v1/event/7", Some("   "));

    let captured = process_events(&mut browser, &cfg).unwrap();
    assert_eq!(captured, 0);
    assert!(!cfg.stats_dir.join("5_detail.json").exists());
    assert!(!cfg.stats_dir.join("6_detail.json").exists());
}

#[test]
fn work_queue_is_consumed_at_most_once() {
    let cfg = test_config("queue");
    fs::write(&cfg.request_file, r#"{"ids": ["555"]}"#).unwrap();

    let mut browser = FakeBrowser::default();
    let issued = consume_request_queue(&mut browser, &cfg).unwrap();

    assert_eq!(issued, 2);
    assert!(!cfg.request_file.exists());
    assert_eq!(browser.scripts.len(), 2);
    assert!(browser.scripts[0].contains("/api/v1/event/555"));
    assert!(browser.scripts[1].contains("/api/v1/event/555/statistics"));
    // The two fetches are separated by the configured gap.
    assert!(!browser.waits.is_empty());

    // Second cycle: nothing left to consume.
    let issued = consume_request_queue(&mut browser, &cfg).unwrap();
    assert_eq!(issued, 0);
    assert_eq!(browser.scripts.len(), 2);
}

#[test]
fn work_queue_accepts_numeric_ids_and_skips_malformed() {
    let cfg = test_config("queue_mixed");
    fs::write(&cfg.request_file, r#"{"ids": [777, "../etc/passwd", "888"]}"#).unwrap();

    let mut browser = FakeBrowser::default();
    let issued = consume_request_queue(&mut browser, &cfg).unwrap();
    assert_eq!(issued, 4);
    assert!(browser.scripts.iter().any(|s| s.contains("/event/777'")));
    assert!(browser.scripts.iter().any(|s| s.contains("/event/888'")));
    assert!(!browser.scripts.iter().any(|s| s.contains("passwd")));
}

#[test]
fn unparseable_request_file_is_deleted_and_ignored() {
    let cfg = test_config("queue_bad");
    fs::write(&cfg.request_file, "not json").unwrap();

    let mut browser = FakeBrowser::default();
    let issued = consume_request_queue(&mut browser, &cfg).unwrap();
    assert_eq!(issued, 0);
    assert!(!cfg.request_file.exists());
    assert!(browser.scripts.is_empty());
}

#[test]
fn live_refresh_injects_the_live_list_fetch() {
    let cfg = test_config("refresh");
    let mut browser = FakeBrowser::default();
    trigger_live_refresh(&mut browser, &cfg).unwrap();
    assert_eq!(browser.scripts.len(), 1);
    assert!(
        browser.scripts[0]
            .contains("https://api.example/api/v1/sport/football/events/live")
    );
}
